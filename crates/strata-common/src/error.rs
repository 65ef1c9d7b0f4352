use http::Method;

use crate::batch::BatchOutcome;

/// Code-carrying error raised by route handlers and the session resolver.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct RestError {
    pub code: i32,
    pub message: String,
}

impl RestError {
    pub const OTHER_CAUSE: i32 = -1;
    pub const INTERNAL_SERVER_ERROR: i32 = 1;
    pub const OBJECT_NOT_FOUND: i32 = 101;
    pub const INVALID_JSON: i32 = 107;
    pub const OPERATION_FORBIDDEN: i32 = 119;
    pub const INVALID_SESSION_TOKEN: i32 = 209;

    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn invalid_session_token() -> Self {
        Self::new(Self::INVALID_SESSION_TOKEN, "Invalid session token")
    }

    pub fn object_not_found(message: impl Into<String>) -> Self {
        Self::new(Self::OBJECT_NOT_FOUND, message)
    }
}

/// Everything a dispatch can fail with.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// Handler, validator or upstream error; forwarded as-is.
    #[error(transparent)]
    Rest(#[from] RestError),

    /// The router has no handler for this exact method and path.
    #[error("cannot route {method} {path}")]
    Unroutable { method: Method, path: String },

    /// A transactional batch had at least one failing sub-request and was
    /// aborted. `results` holds every outcome, successes included.
    #[error("transaction aborted: {} of {} sub-requests failed", failed_count(.results), .results.len())]
    TransactionAborted { results: Vec<BatchOutcome> },

    #[error("invalid batch request: {0}")]
    InvalidBatch(String),

    #[error("no configuration registered for application {0}")]
    MissingConfig(String),

    #[error("database error: {0}")]
    Database(#[source] anyhow::Error),

    #[error("transport error: {0}")]
    Transport(#[source] anyhow::Error),
}

fn failed_count(results: &[BatchOutcome]) -> usize {
    results.iter().filter(|r| r.is_error()).count()
}

impl DispatchError {
    pub fn unroutable(method: Method, path: impl Into<String>) -> Self {
        DispatchError::Unroutable {
            method,
            path: path.into(),
        }
    }

    /// Numeric code reported to clients.
    pub fn code(&self) -> i32 {
        match self {
            DispatchError::Rest(e) => e.code,
            DispatchError::Unroutable { .. } | DispatchError::InvalidBatch(_) => {
                RestError::INVALID_JSON
            }
            DispatchError::TransactionAborted { .. } => RestError::OTHER_CAUSE,
            DispatchError::MissingConfig(_)
            | DispatchError::Database(_)
            | DispatchError::Transport(_) => RestError::INTERNAL_SERVER_ERROR,
        }
    }

    /// True only for the unroutable sentinel naming this exact call.
    pub fn is_unroutable(&self, method: &Method, path: &str) -> bool {
        matches!(
            self,
            DispatchError::Unroutable { method: m, path: p } if m == method && p == path
        )
    }

    pub fn results(&self) -> Option<&[BatchOutcome]> {
        match self {
            DispatchError::TransactionAborted { results } => Some(results),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::BatchItemError;
    use serde_json::json;

    #[test]
    fn test_unroutable_display_and_match() {
        let err = DispatchError::unroutable(Method::GET, "/nonexistent");
        assert_eq!(err.to_string(), "cannot route GET /nonexistent");
        assert_eq!(err.code(), RestError::INVALID_JSON);
        assert!(err.is_unroutable(&Method::GET, "/nonexistent"));
        assert!(!err.is_unroutable(&Method::POST, "/nonexistent"));
        assert!(!err.is_unroutable(&Method::GET, "/nonexistent/1"));
    }

    #[test]
    fn test_rest_error_is_transparent() {
        let err: DispatchError = RestError::invalid_session_token().into();
        assert_eq!(err.to_string(), "Invalid session token");
        assert_eq!(err.code(), 209);
        assert!(!err.is_unroutable(&Method::GET, "/"));
    }

    #[test]
    fn test_transaction_aborted_carries_results() {
        let results = vec![
            BatchOutcome::Success(json!({})),
            BatchOutcome::Error(BatchItemError {
                code: 101,
                message: "nope".to_string(),
            }),
        ];
        let err = DispatchError::TransactionAborted { results };
        assert_eq!(err.to_string(), "transaction aborted: 1 of 2 sub-requests failed");
        assert_eq!(err.results().map(|r| r.len()), Some(2));
    }

    #[test]
    fn test_infrastructure_errors_are_internal() {
        let err = DispatchError::Database(anyhow::anyhow!("connection reset"));
        assert_eq!(err.code(), RestError::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "database error: connection reset");
        assert!(err.results().is_none());
    }
}
