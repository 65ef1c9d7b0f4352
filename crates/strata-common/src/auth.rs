use serde::Serialize;

// ── AuthContext ──────────────────────────────────────────────────────

/// Identity a dispatched request runs under. Every call resolves to
/// exactly one variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuthContext {
    /// Elevated privileges; bypasses per-token checks.
    MasterKey { installation_id: String },
    /// A session token resolved to a user by the session resolver.
    SessionToken {
        session_token: String,
        installation_id: String,
        user_id: Option<String>,
    },
    Anonymous { installation_id: String },
}

impl AuthContext {
    pub fn master(installation_id: impl Into<String>) -> Self {
        AuthContext::MasterKey {
            installation_id: installation_id.into(),
        }
    }

    pub fn anonymous(installation_id: impl Into<String>) -> Self {
        AuthContext::Anonymous {
            installation_id: installation_id.into(),
        }
    }

    pub fn is_master(&self) -> bool {
        matches!(self, AuthContext::MasterKey { .. })
    }

    pub fn installation_id(&self) -> &str {
        match self {
            AuthContext::MasterKey { installation_id }
            | AuthContext::SessionToken {
                installation_id, ..
            }
            | AuthContext::Anonymous { installation_id } => installation_id,
        }
    }

    pub fn session_token(&self) -> Option<&str> {
        match self {
            AuthContext::SessionToken { session_token, .. } => Some(session_token),
            _ => None,
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        match self {
            AuthContext::SessionToken { user_id, .. } => user_id.as_deref(),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AuthContext::MasterKey { .. } => "master_key",
            AuthContext::SessionToken { .. } => "session_token",
            AuthContext::Anonymous { .. } => "anonymous",
        }
    }
}
