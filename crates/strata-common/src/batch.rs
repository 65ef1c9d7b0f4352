use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Map, Value};

use crate::error::DispatchError;

/// One sub-request of a `/batch` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchItem {
    pub method: String,
    pub path: String,
    #[serde(default = "empty_object", deserialize_with = "object_or_empty")]
    pub body: Value,
}

impl BatchItem {
    pub fn new(method: impl Into<String>, path: impl Into<String>, body: Value) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            body,
        }
    }
}

/// Decoded `/batch` body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRequest {
    pub requests: Vec<BatchItem>,
    /// Only a literal `true` opens a transactional session.
    #[serde(default, deserialize_with = "literal_true")]
    pub transaction: bool,
}

impl BatchRequest {
    pub fn new(requests: Vec<BatchItem>) -> Self {
        Self {
            requests,
            transaction: false,
        }
    }

    pub fn transactional(requests: Vec<BatchItem>) -> Self {
        Self {
            requests,
            transaction: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchItemError {
    pub code: i32,
    pub message: String,
}

impl From<&DispatchError> for BatchItemError {
    fn from(err: &DispatchError) -> Self {
        Self {
            code: err.code(),
            message: err.to_string(),
        }
    }
}

/// Result of one sub-request, serialized as `{"success": ..}` or
/// `{"error": {"code": .., "message": ..}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchOutcome {
    Success(Value),
    Error(BatchItemError),
}

impl BatchOutcome {
    pub fn is_error(&self) -> bool {
        matches!(self, BatchOutcome::Error(_))
    }

    pub fn success(&self) -> Option<&Value> {
        match self {
            BatchOutcome::Success(v) => Some(v),
            BatchOutcome::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&BatchItemError> {
        match self {
            BatchOutcome::Error(e) => Some(e),
            BatchOutcome::Success(_) => None,
        }
    }

    /// Same shape as the serde encoding, without the fallible round trip.
    pub fn into_value(self) -> Value {
        match self {
            BatchOutcome::Success(v) => json!({ "success": v }),
            BatchOutcome::Error(e) => json!({ "error": { "code": e.code, "message": e.message } }),
        }
    }
}

impl From<Result<Value, DispatchError>> for BatchOutcome {
    fn from(res: Result<Value, DispatchError>) -> Self {
        match res {
            Ok(v) => BatchOutcome::Success(v),
            Err(e) => BatchOutcome::Error(BatchItemError::from(&e)),
        }
    }
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

fn object_or_empty<'de, D>(deserializer: D) -> Result<Value, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => empty_object(),
        v => v,
    })
}

fn literal_true<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(matches!(Value::deserialize(deserializer)?, Value::Bool(true)))
}
