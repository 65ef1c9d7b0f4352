use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Installation id attributed to calls that do not name one.
pub const DEFAULT_INSTALLATION_ID: &str = "cloud";

/// Per-call options supplied alongside `(method, path, body)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestOptions {
    /// Only ever holds a string; any other JSON type decodes as `None`.
    #[serde(
        default,
        deserialize_with = "string_only",
        skip_serializing_if = "Option::is_none"
    )]
    pub session_token: Option<String>,

    #[serde(default, deserialize_with = "truthy")]
    pub use_master_key: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installation_id: Option<String>,

    #[serde(default)]
    pub context: Map<String, Value>,
}

impl RequestOptions {
    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }

    pub fn with_master_key(mut self) -> Self {
        self.use_master_key = true;
        self
    }

    pub fn with_installation_id(mut self, installation_id: impl Into<String>) -> Self {
        self.installation_id = Some(installation_id.into());
        self
    }

    /// The caller's installation id, or [`DEFAULT_INSTALLATION_ID`] when it
    /// is absent or empty.
    pub fn installation_id(&self) -> &str {
        self.installation_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .unwrap_or(DEFAULT_INSTALLATION_ID)
    }
}

fn string_only<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

// `useMasterKey` is tested for truthiness by SDK callers, so `1` or `"yes"`
// still count while `0`, `""` and `null` do not.
fn truthy<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => false,
        Value::Bool(b) => b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    })
}
