use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub type SessionId = u64;

/// Handle to an open transactional session.
///
/// Returned by [`Database::create_transactional_session`] and passed back to
/// commit or abort, so a database that keeps several sessions open at once
/// can tell them apart.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct TransactionalSession {
    pub id: SessionId,
}

#[async_trait]
pub trait Database: Send + Sync {
    async fn create_transactional_session(&self) -> Result<TransactionalSession>;
    async fn commit_transactional_session(&self, session: &TransactionalSession) -> Result<()>;
    async fn abort_transactional_session(&self, session: &TransactionalSession) -> Result<()>;
}
