use std::sync::Arc;

use async_trait::async_trait;
use http::{HeaderMap, Method};
use serde_json::Value;
use strata_common::{DispatchError, RequestOptions};

use crate::config::AppConfig;

#[derive(Debug, Clone)]
pub struct AjaxResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Value,
}

/// REST client used when the in-process router has no handler for a call.
#[async_trait]
pub trait RestTransport: Send + Sync {
    /// Receives the caller's original arguments, path un-normalized and
    /// `config` exactly as passed to the dispatcher.
    async fn send(
        &self,
        method: Method,
        path: String,
        body: Value,
        options: RequestOptions,
        config: Option<Arc<AppConfig>>,
    ) -> Result<Value, DispatchError>;

    /// Raw request against an absolute URL.
    async fn ajax(
        &self,
        method: Method,
        url: String,
        body: Option<Value>,
        headers: HeaderMap,
    ) -> Result<AjaxResponse, DispatchError>;
}

/// Transport for deployments with nothing to fall back to: every call is
/// reported unroutable.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledTransport;

#[async_trait]
impl RestTransport for DisabledTransport {
    async fn send(
        &self,
        method: Method,
        path: String,
        _body: Value,
        _options: RequestOptions,
        _config: Option<Arc<AppConfig>>,
    ) -> Result<Value, DispatchError> {
        Err(DispatchError::unroutable(method, path))
    }

    async fn ajax(
        &self,
        method: Method,
        url: String,
        _body: Option<Value>,
        _headers: HeaderMap,
    ) -> Result<AjaxResponse, DispatchError> {
        Err(DispatchError::unroutable(method, url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_disabled_transport_is_unroutable() {
        let err = DisabledTransport
            .send(Method::GET, "/classes/A".to_string(), json!({}), RequestOptions::default(), None)
            .await
            .unwrap_err();
        assert!(err.is_unroutable(&Method::GET, "/classes/A"));

        let err = DisabledTransport
            .ajax(Method::POST, "https://example.com".to_string(), None, HeaderMap::new())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "cannot route POST https://example.com");
    }
}
