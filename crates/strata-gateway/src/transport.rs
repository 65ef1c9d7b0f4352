use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use http::{HeaderMap, Method, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use strata_dispatch::{
    AjaxResponse, AppConfig, DisabledTransport, DispatchError, RequestOptions, RestError, RestTransport,
};

use crate::args::Args;

/// REST fallback against an upstream server speaking the same API.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: String,
    application_id: String,
    master_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpstreamError {
    code: i32,
    error: String,
}

fn classify_reqwest_error(error: &reqwest::Error) -> &'static str {
    if error.is_timeout() {
        return "timeout";
    }
    if error.is_connect() {
        return "connect";
    }
    "other"
}

fn transport_error(error: reqwest::Error) -> DispatchError {
    tracing::warn!(error=%error, kind = classify_reqwest_error(&error), "upstream request failed");
    DispatchError::Transport(error.into())
}

impl HttpTransport {
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        application_id: impl Into<String>,
        master_key: Option<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            application_id: application_id.into(),
            master_key,
        }
    }

    fn url_for(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }
}

/// `HttpTransport` against `--upstream-url`, or [`DisabledTransport`] when
/// no upstream is configured.
pub fn build_transport(args: &Args) -> anyhow::Result<Arc<dyn RestTransport>> {
    let Some(upstream_url) = args.upstream_url.clone() else {
        tracing::warn!("STRATA_UPSTREAM_URL not set, unroutable calls will be rejected");
        return Ok(Arc::new(DisabledTransport));
    };
    let http = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(3))
        .timeout(Duration::from_secs(60))
        .build()?;
    tracing::info!(upstream_url=%upstream_url, "REST fallback enabled");
    Ok(Arc::new(HttpTransport::new(
        http,
        upstream_url,
        args.application_id.clone(),
        args.master_key.clone(),
    )))
}

/// `base/path` with exactly one slash between them.
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Top-level fields of `body` as a query string. Strings are sent as-is,
/// everything else JSON-encoded.
pub fn encode_query(body: &Value) -> String {
    let Some(fields) = body.as_object() else {
        return String::new();
    };
    fields
        .iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            format!(
                "{}={}",
                urlencoding::encode(key),
                urlencoding::encode(&value)
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Maps an upstream reply to the dispatcher's result.
pub fn decode_response(status: StatusCode, text: &str) -> Result<Value, DispatchError> {
    if status.is_success() {
        if text.trim().is_empty() {
            return Ok(Value::Object(Default::default()));
        }
        return serde_json::from_str(text).map_err(|e| {
            DispatchError::Transport(anyhow!("upstream returned invalid JSON: {e}"))
        });
    }
    match serde_json::from_str::<UpstreamError>(text) {
        Ok(err) => Err(RestError::new(err.code, err.error).into()),
        Err(_) => Err(DispatchError::Transport(anyhow!(
            "upstream returned {status}: {text}"
        ))),
    }
}

#[async_trait]
impl RestTransport for HttpTransport {
    async fn send(
        &self,
        method: Method,
        path: String,
        body: Value,
        options: RequestOptions,
        config: Option<Arc<AppConfig>>,
    ) -> Result<Value, DispatchError> {
        let application_id = config
            .as_ref()
            .map(|c| c.application_id.as_str())
            .unwrap_or(&self.application_id);
        let master_key = config
            .as_ref()
            .and_then(|c| c.master_key.as_deref())
            .or(self.master_key.as_deref());

        let mut url = self.url_for(&path);
        let is_get = method == Method::GET;
        if is_get {
            let query = encode_query(&body);
            if !query.is_empty() {
                url.push('?');
                url.push_str(&query);
            }
        }

        let mut req = self
            .http
            .request(method.clone(), &url)
            .header("X-Parse-Application-Id", application_id)
            .header("X-Parse-Installation-Id", options.installation_id())
            .header("X-Parse-Request-Id", uuid::Uuid::new_v4().to_string());
        if let Some(token) = options.session_token.as_deref() {
            req = req.header("X-Parse-Session-Token", token);
        }
        if options.use_master_key {
            match master_key {
                Some(key) => req = req.header("X-Parse-Master-Key", key),
                None => tracing::warn!(path=%path, "master key requested but none configured"),
            }
        }
        if !is_get {
            req = req.json(&body);
        }

        tracing::debug!(method=%method, url=%url, "forwarding to upstream");
        let resp = req.send().await.map_err(transport_error)?;
        let status = resp.status();
        let text = resp.text().await.map_err(transport_error)?;
        decode_response(status, &text)
    }

    async fn ajax(
        &self,
        method: Method,
        url: String,
        body: Option<Value>,
        headers: HeaderMap,
    ) -> Result<AjaxResponse, DispatchError> {
        let mut req = self.http.request(method, &url).headers(headers);
        if let Some(body) = body.as_ref() {
            req = req.json(body);
        }
        let resp = req.send().await.map_err(transport_error)?;
        let status = resp.status().as_u16();
        let headers = resp.headers().clone();
        let text = resp.text().await.map_err(transport_error)?;
        let body = if text.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };
        Ok(AjaxResponse {
            status,
            headers,
            body,
        })
    }
}
