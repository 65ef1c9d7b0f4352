use std::sync::atomic::Ordering;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use http::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use strata_dispatch::{AppConfig, DispatchError, RequestOptions, RestError};

use crate::state::AppState;

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// Body of `POST /dispatch`.
#[derive(Debug, Deserialize)]
pub struct DispatchRequest {
    pub method: String,
    pub path: String,
    #[serde(default)]
    pub body: Option<Value>,
    #[serde(default)]
    pub options: RequestOptions,
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Fills options the body left out from `X-Parse-*` headers. Master-key
/// access over HTTP always needs a matching `X-Parse-Master-Key`.
pub fn apply_headers(
    mut options: RequestOptions,
    headers: &HeaderMap,
    config: &AppConfig,
) -> Result<RequestOptions, DispatchError> {
    if options.session_token.is_none() {
        options.session_token = header_str(headers, "x-parse-session-token").map(str::to_string);
    }
    if options.installation_id.is_none() {
        options.installation_id =
            header_str(headers, "x-parse-installation-id").map(str::to_string);
    }

    match header_str(headers, "x-parse-master-key") {
        Some(key) if config.is_master_key(key) => options.use_master_key = true,
        Some(_) => {
            tracing::warn!("rejected request with invalid master key");
            return Err(RestError::new(RestError::OPERATION_FORBIDDEN, "Invalid master key").into());
        }
        None if options.use_master_key => {
            return Err(RestError::new(
                RestError::OPERATION_FORBIDDEN,
                "Master key is required",
            )
            .into());
        }
        None => {}
    }
    Ok(options)
}

pub fn error_status(err: &DispatchError) -> StatusCode {
    match err {
        DispatchError::Rest(e) => match e.code {
            RestError::OBJECT_NOT_FOUND => StatusCode::NOT_FOUND,
            RestError::OPERATION_FORBIDDEN => StatusCode::FORBIDDEN,
            RestError::INTERNAL_SERVER_ERROR | RestError::OTHER_CAUSE => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => StatusCode::BAD_REQUEST,
        },
        DispatchError::Transport(_) => StatusCode::BAD_GATEWAY,
        DispatchError::Database(_) | DispatchError::MissingConfig(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        DispatchError::InvalidBatch(_)
        | DispatchError::Unroutable { .. }
        | DispatchError::TransactionAborted { .. } => StatusCode::BAD_REQUEST,
    }
}

pub fn error_response(err: DispatchError) -> Response {
    let status = error_status(&err);
    if status.is_server_error() {
        tracing::warn!(error=%err, code = err.code(), "dispatch failed");
    } else {
        tracing::debug!(error=%err, code = err.code(), "dispatch rejected");
    }

    let body = match err {
        DispatchError::TransactionAborted { results } => {
            Value::Array(results.into_iter().map(|r| r.into_value()).collect())
        }
        other => json!({ "code": other.code(), "error": other.to_string() }),
    };
    (status, Json(body)).into_response()
}

async fn run_dispatch(
    st: &AppState,
    headers: &HeaderMap,
    req: DispatchRequest,
) -> Result<Value, DispatchError> {
    let method = Method::from_bytes(req.method.to_ascii_uppercase().as_bytes()).map_err(|_| {
        RestError::new(RestError::INVALID_JSON, format!("invalid method {:?}", req.method))
    })?;
    let options = apply_headers(req.options, headers, &st.config)?;
    let body = req.body.unwrap_or_else(|| json!({}));
    st.dispatcher
        .handle(method, req.path, body, options, Some(st.config.clone()))
        .await
}

pub async fn dispatch(
    State(st): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<DispatchRequest>,
) -> Response {
    st.metrics.dispatch_total.fetch_add(1, Ordering::Relaxed);
    match run_dispatch(&st, &headers, req).await {
        Ok(value) => (StatusCode::OK, Json(value)).into_response(),
        Err(err) => {
            st.metrics.dispatch_failed.fetch_add(1, Ordering::Relaxed);
            error_response(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::to_bytes;
    use axum::http::HeaderValue;
    use strata_common::BatchOutcome;
    use strata_db::MemoryDatabase;
    use strata_dispatch::{ConfigRegistry, DisabledTransport, RestDispatcher, StaticSessionResolver};

    use super::*;
    use crate::metrics::Metrics;
    use crate::routes::builtin_routes;

    fn config() -> AppConfig {
        AppConfig::new("app", "http://localhost:1337/parse", Arc::new(MemoryDatabase::new()))
            .unwrap()
            .with_master_key("s3cret")
    }

    fn state() -> AppState {
        let configs = ConfigRegistry::new();
        let config = configs.register(config());
        let dispatcher = RestDispatcher::new(
            "app",
            configs,
            Arc::new(builtin_routes()),
            Arc::new(StaticSessionResolver::new().with_token("r:good", "user-1")),
            Arc::new(DisabledTransport),
        );
        AppState {
            dispatcher,
            config,
            metrics: Arc::new(Metrics::default()),
        }
    }

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(*value));
        }
        map
    }

    async fn call(st: &AppState, headers: HeaderMap, body: Value) -> (StatusCode, Value) {
        let req: DispatchRequest = serde_json::from_value(body).unwrap();
        let resp = dispatch(State(st.clone()), headers, Json(req)).await;
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_headers_fill_missing_options() {
        let opts = apply_headers(
            RequestOptions::default(),
            &headers(&[
                ("x-parse-session-token", "r:good"),
                ("x-parse-installation-id", "inst-1"),
            ]),
            &config(),
        )
        .unwrap();
        assert_eq!(opts.session_token.as_deref(), Some("r:good"));
        assert_eq!(opts.installation_id(), "inst-1");
        assert!(!opts.use_master_key);

        let opts = apply_headers(
            RequestOptions::default().with_session_token("r:body"),
            &headers(&[("x-parse-session-token", "r:header")]),
            &config(),
        )
        .unwrap();
        assert_eq!(opts.session_token.as_deref(), Some("r:body"));
    }

    #[test]
    fn test_master_key_header_checked() {
        let opts = apply_headers(
            RequestOptions::default(),
            &headers(&[("x-parse-master-key", "s3cret")]),
            &config(),
        )
        .unwrap();
        assert!(opts.use_master_key);

        let err = apply_headers(
            RequestOptions::default(),
            &headers(&[("x-parse-master-key", "guess")]),
            &config(),
        )
        .unwrap_err();
        assert_eq!(err.code(), RestError::OPERATION_FORBIDDEN);

        let err = apply_headers(RequestOptions::default().with_master_key(), &HeaderMap::new(), &config())
            .unwrap_err();
        assert_eq!(error_status(&err), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (DispatchError::from(RestError::object_not_found("x")), StatusCode::NOT_FOUND),
            (DispatchError::from(RestError::invalid_session_token()), StatusCode::BAD_REQUEST),
            (DispatchError::from(RestError::new(1, "boom")), StatusCode::INTERNAL_SERVER_ERROR),
            (DispatchError::from(RestError::new(-1, "boom")), StatusCode::INTERNAL_SERVER_ERROR),
            (DispatchError::Transport(anyhow::anyhow!("down")), StatusCode::BAD_GATEWAY),
            (DispatchError::MissingConfig("app".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (DispatchError::InvalidBatch("x".into()), StatusCode::BAD_REQUEST),
            (DispatchError::unroutable(Method::GET, "/x"), StatusCode::BAD_REQUEST),
            (
                DispatchError::TransactionAborted { results: vec![] },
                StatusCode::BAD_REQUEST,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(error_status(&err), status, "{err}");
        }
    }

    #[tokio::test]
    async fn test_transaction_abort_renders_results() {
        let resp = error_response(DispatchError::TransactionAborted {
            results: vec![
                BatchOutcome::Success(json!({"ok": true})),
                BatchOutcome::from(Err::<Value, _>(DispatchError::from(RestError::object_not_found("gone")))),
            ],
        });
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            body,
            json!([
                {"success": {"ok": true}},
                {"error": {"code": 101, "message": "gone"}},
            ])
        );
    }

    #[tokio::test]
    async fn test_dispatch_server_info() {
        let st = state();
        let (status, body) = call(
            &st,
            headers(&[("x-parse-session-token", "r:good")]),
            json!({"method": "get", "path": "/parse/serverInfo"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["auth"], "session_token");
        assert_eq!(body["user"], "user-1");
        assert_eq!(st.metrics.dispatch_total.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_dispatch_errors() {
        let st = state();
        let (status, body) = call(
            &st,
            headers(&[("x-parse-session-token", "r:expired")]),
            json!({"method": "GET", "path": "/health"}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"code": 209, "error": "Invalid session token"}));

        let (status, body) = call(&st, HeaderMap::new(), json!({"method": "GET", "path": "/nowhere"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"code": 107, "error": "cannot route GET /nowhere"}));
        assert_eq!(st.metrics.dispatch_failed.load(Ordering::Relaxed), 2);
    }

    #[tokio::test]
    async fn test_dispatch_batch() {
        let st = state();
        let (status, body) = call(
            &st,
            HeaderMap::new(),
            json!({
                "method": "POST",
                "path": "/parse/batch",
                "body": {
                    "requests": [
                        {"method": "GET", "path": "/parse/health"},
                        {"method": "GET", "path": "/missing"},
                    ],
                },
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0], json!({"success": {"status": "ok"}}));
        assert_eq!(body[1]["error"]["code"], 107);
    }
}
