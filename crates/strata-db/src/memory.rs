use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::types::{Database, SessionId, TransactionalSession};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event", content = "session", rename_all = "snake_case")]
pub enum SessionEvent {
    Begin(SessionId),
    Commit(SessionId),
    Abort(SessionId),
}

/// Session bookkeeping without a storage engine behind it. Every
/// begin/commit/abort is journaled in call order.
#[derive(Debug, Clone, Default)]
pub struct MemoryDatabase {
    inner: Arc<RwLock<Inner>>,
    fail_begin: Arc<AtomicBool>,
    fail_commit: Arc<AtomicBool>,
    fail_abort: Arc<AtomicBool>,
}

#[derive(Debug, Default)]
struct Inner {
    last_id: SessionId,
    open: BTreeSet<SessionId>,
    journal: Vec<SessionEvent>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent `create_transactional_session` calls fail.
    pub fn set_fail_begin(&self, fail: bool) {
        self.fail_begin.store(fail, Ordering::Relaxed);
    }

    /// Make subsequent commits fail; the session stays open.
    pub fn set_fail_commit(&self, fail: bool) {
        self.fail_commit.store(fail, Ordering::Relaxed);
    }

    /// Make subsequent aborts fail; the session stays open.
    pub fn set_fail_abort(&self, fail: bool) {
        self.fail_abort.store(fail, Ordering::Relaxed);
    }

    pub async fn journal(&self) -> Vec<SessionEvent> {
        self.inner.read().await.journal.clone()
    }

    pub async fn open_sessions(&self) -> Vec<SessionId> {
        self.inner.read().await.open.iter().copied().collect()
    }

    pub async fn commit_count(&self) -> usize {
        self.count(|e| matches!(e, SessionEvent::Commit(_))).await
    }

    pub async fn abort_count(&self) -> usize {
        self.count(|e| matches!(e, SessionEvent::Abort(_))).await
    }

    async fn count(&self, pred: impl Fn(&SessionEvent) -> bool) -> usize {
        self.inner.read().await.journal.iter().filter(|&e| pred(e)).count()
    }

    async fn close(&self, session: &TransactionalSession, event: SessionEvent) -> Result<()> {
        let mut inner = self.inner.write().await;
        if !inner.open.remove(&session.id) {
            bail!("transactional session {} is not open", session.id);
        }
        inner.journal.push(event);
        Ok(())
    }
}

#[async_trait::async_trait]
impl Database for MemoryDatabase {
    async fn create_transactional_session(&self) -> Result<TransactionalSession> {
        if self.fail_begin.load(Ordering::Relaxed) {
            bail!("transactional sessions are unavailable");
        }
        let mut inner = self.inner.write().await;
        inner.last_id = inner.last_id.saturating_add(1);
        let id = inner.last_id;
        inner.open.insert(id);
        inner.journal.push(SessionEvent::Begin(id));
        tracing::debug!(session = id, "transactional session started");
        Ok(TransactionalSession { id })
    }

    async fn commit_transactional_session(&self, session: &TransactionalSession) -> Result<()> {
        if self.fail_commit.load(Ordering::Relaxed) {
            bail!("commit of transactional session {} failed", session.id);
        }
        self.close(session, SessionEvent::Commit(session.id)).await?;
        tracing::debug!(session = session.id, "transactional session committed");
        Ok(())
    }

    async fn abort_transactional_session(&self, session: &TransactionalSession) -> Result<()> {
        if self.fail_abort.load(Ordering::Relaxed) {
            bail!("abort of transactional session {} failed", session.id);
        }
        self.close(session, SessionEvent::Abort(session.id)).await?;
        tracing::debug!(session = session.id, "transactional session aborted");
        Ok(())
    }
}
