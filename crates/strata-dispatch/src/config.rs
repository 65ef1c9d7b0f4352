use std::sync::Arc;

use anyhow::{Context, Result};
use dashmap::DashMap;
use http::Uri;
use strata_db::Database;

/// Per-application configuration handed to every dispatched request.
#[derive(Clone)]
pub struct AppConfig {
    pub application_id: String,
    pub server_url: String,
    pub master_key: Option<String>,
    pub database: Arc<dyn Database>,
    server_root: String,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("application_id", &self.application_id)
            .field("server_url", &self.server_url)
            .field("server_root", &self.server_root)
            .field("master_key", &self.master_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl AppConfig {
    /// Fails when `server_url` is not a valid URI.
    pub fn new(
        application_id: impl Into<String>,
        server_url: impl Into<String>,
        database: Arc<dyn Database>,
    ) -> Result<Self> {
        let server_url = server_url.into();
        let uri: Uri = server_url
            .parse()
            .with_context(|| format!("invalid server URL {server_url:?}"))?;
        let server_root = match uri.path() {
            "" => "/".to_string(),
            p => p.to_string(),
        };
        Ok(Self {
            application_id: application_id.into(),
            server_url,
            master_key: None,
            database,
            server_root,
        })
    }

    pub fn with_master_key(mut self, master_key: impl Into<String>) -> Self {
        self.master_key = Some(master_key.into());
        self
    }

    /// Path component of `server_url`, e.g. `/parse`.
    pub fn server_root(&self) -> &str {
        &self.server_root
    }

    pub fn is_master_key(&self, candidate: &str) -> bool {
        self.master_key.as_deref() == Some(candidate)
    }
}

/// Process-wide application id → configuration lookup.
#[derive(Debug, Default)]
pub struct ConfigRegistry {
    configs: DashMap<String, Arc<AppConfig>>,
}

impl ConfigRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Registers (or replaces) the configuration for its application id.
    pub fn register(&self, config: AppConfig) -> Arc<AppConfig> {
        let config = Arc::new(config);
        tracing::info!(
            application_id=%config.application_id,
            server_url=%config.server_url,
            "application config registered"
        );
        self.configs
            .insert(config.application_id.clone(), config.clone());
        config
    }

    pub fn get(&self, application_id: &str) -> Option<Arc<AppConfig>> {
        self.configs.get(application_id).map(|c| c.value().clone())
    }

    pub fn remove(&self, application_id: &str) -> Option<Arc<AppConfig>> {
        self.configs.remove(application_id).map(|(_, c)| c)
    }
}
