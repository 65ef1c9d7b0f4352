use std::collections::HashMap;

use async_trait::async_trait;
use strata_common::{AuthContext, DispatchError, RequestOptions, RestError};

use crate::config::AppConfig;

/// Turns a session token into an authenticated identity.
#[async_trait]
pub trait SessionResolver: Send + Sync {
    /// Fails (typically with [`RestError::INVALID_SESSION_TOKEN`]) for
    /// unknown or expired tokens.
    async fn resolve(
        &self,
        config: &AppConfig,
        session_token: &str,
        installation_id: &str,
    ) -> Result<AuthContext, DispatchError>;
}

/// Auth for one call together with the options the rest of the call should
/// see (the resolved session token cached on them).
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedAuth {
    pub auth: AuthContext,
    pub options: RequestOptions,
}

/// Master key wins over any session token; a string session token goes to
/// the resolver; everything else is anonymous. Resolver failures are
/// returned as-is, never downgraded to anonymous.
pub async fn resolve_auth(
    options: &RequestOptions,
    config: &AppConfig,
    sessions: &dyn SessionResolver,
) -> Result<ResolvedAuth, DispatchError> {
    let installation_id = options.installation_id().to_string();

    if options.use_master_key {
        tracing::debug!(installation_id=%installation_id, "using master key");
        return Ok(ResolvedAuth {
            auth: AuthContext::master(installation_id),
            options: options.clone(),
        });
    }

    let Some(session_token) = options.session_token.as_deref() else {
        return Ok(ResolvedAuth {
            auth: AuthContext::anonymous(installation_id),
            options: options.clone(),
        });
    };

    let auth = match sessions
        .resolve(config, session_token, &installation_id)
        .await
    {
        Ok(auth) => auth,
        Err(e) => {
            tracing::debug!(error=%e, installation_id=%installation_id, "session token rejected");
            return Err(e);
        }
    };

    let options = options.clone().with_session_token(session_token);
    Ok(ResolvedAuth { auth, options })
}

// ── StaticSessionResolver ───────────────────────────────────────────

/// Fixed token → user id table.
#[derive(Debug, Clone, Default)]
pub struct StaticSessionResolver {
    users: HashMap<String, String>,
}

impl StaticSessionResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: impl Into<String>, user_id: impl Into<String>) -> Self {
        self.users.insert(token.into(), user_id.into());
        self
    }

    /// Parses `token:user,token:user`. The user id is everything after the
    /// last `:`, so tokens such as `r:abc` keep their colons. Blank entries
    /// are skipped and malformed ones are logged and skipped.
    pub fn parse(raw: &str) -> Self {
        let mut users = HashMap::new();
        for entry in raw.split(',') {
            let trimmed = entry.trim();
            if trimmed.is_empty() {
                continue;
            }
            let Some((token, user_id)) = trimmed.rsplit_once(':') else {
                tracing::warn!(entry=%trimmed, "invalid session token entry, expected token:user");
                continue;
            };
            let (token, user_id) = (token.trim(), user_id.trim());
            if token.is_empty() || user_id.is_empty() {
                tracing::warn!(entry=%trimmed, "invalid session token entry, empty token or user");
                continue;
            }
            users.insert(token.to_string(), user_id.to_string());
        }
        Self { users }
    }

    /// Reads `STRATA_SESSION_TOKENS`; an unset variable gives an empty table.
    pub fn from_env() -> Self {
        match std::env::var("STRATA_SESSION_TOKENS") {
            Ok(raw) => Self::parse(&raw),
            Err(_) => {
                tracing::warn!("STRATA_SESSION_TOKENS not set, every session token will be rejected");
                Self::default()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl SessionResolver for StaticSessionResolver {
    async fn resolve(
        &self,
        _config: &AppConfig,
        session_token: &str,
        installation_id: &str,
    ) -> Result<AuthContext, DispatchError> {
        let Some(user_id) = self.users.get(session_token) else {
            return Err(RestError::invalid_session_token().into());
        };
        Ok(AuthContext::SessionToken {
            session_token: session_token.to_string(),
            installation_id: installation_id.to_string(),
            user_id: Some(user_id.clone()),
        })
    }
}
