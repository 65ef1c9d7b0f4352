//! Shared fixtures for dispatcher and batch tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use http::{HeaderMap, Method};
use serde_json::{json, Value};
use strata_common::{DispatchError, RequestOptions, RestError};
use strata_db::MemoryDatabase;
use tokio::sync::Barrier;

use crate::auth::StaticSessionResolver;
use crate::config::{AppConfig, ConfigRegistry};
use crate::context::RequestContext;
use crate::dispatcher::RestDispatcher;
use crate::router::{RouteResponse, RouteTable};
use crate::transport::{AjaxResponse, RestTransport};

#[derive(Debug, Clone, PartialEq)]
pub struct SentCall {
    pub method: Method,
    pub path: String,
    pub body: Value,
    pub options: RequestOptions,
    pub had_config: bool,
}

/// Records every fallback call and answers `{"fallback": <path>}`.
#[derive(Default)]
pub struct RecordingTransport {
    pub calls: Mutex<Vec<SentCall>>,
}

impl RecordingTransport {
    pub fn calls(&self) -> Vec<SentCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RestTransport for RecordingTransport {
    async fn send(
        &self,
        method: Method,
        path: String,
        body: Value,
        options: RequestOptions,
        config: Option<Arc<AppConfig>>,
    ) -> Result<Value, DispatchError> {
        let response = json!({ "fallback": path });
        self.calls.lock().unwrap().push(SentCall {
            method,
            path,
            body,
            options,
            had_config: config.is_some(),
        });
        Ok(response)
    }

    async fn ajax(
        &self,
        _method: Method,
        url: String,
        body: Option<Value>,
        headers: HeaderMap,
    ) -> Result<AjaxResponse, DispatchError> {
        Ok(AjaxResponse {
            status: 200,
            headers,
            body: json!({ "url": url, "body": body }),
        })
    }
}

pub struct Harness {
    pub dispatcher: RestDispatcher,
    pub config: Arc<AppConfig>,
    pub database: MemoryDatabase,
    pub transport: Arc<RecordingTransport>,
    pub seen: Arc<Mutex<Vec<RequestContext>>>,
}

/// Routes used across the dispatcher and batch tests:
/// - `GET|POST /classes/A` succeed and echo what they saw
/// - `GET /classes/B` fails with 101
/// - `POST /classes/Slow` sleeps before succeeding
/// - `POST /classes/Barrier` completes only once three of them are in flight
/// - `GET /routes/moved` reports a *different* path as unroutable
pub fn harness() -> Harness {
    let database = MemoryDatabase::new();
    let configs = ConfigRegistry::new();
    let config = configs.register(
        AppConfig::new(
            "app",
            "http://localhost:1337/parse",
            Arc::new(database.clone()),
        )
        .unwrap(),
    );

    let seen: Arc<Mutex<Vec<RequestContext>>> = Arc::default();
    let table = RouteTable::new();
    for method in [Method::GET, Method::POST] {
        let seen = seen.clone();
        table.insert(method, "/classes/A", move |req: RequestContext| {
            seen.lock().unwrap().push(req.clone());
            async move {
                Ok::<_, DispatchError>(RouteResponse::with_status(
                    json!({
                        "class": "A",
                        "auth": req.auth.kind(),
                        "session": req.transaction.map(|s| s.id),
                    }),
                    200,
                ))
            }
        });
    }
    table.insert(Method::GET, "/classes/B", |_req| async move {
        Err::<RouteResponse, _>(DispatchError::from(RestError::object_not_found(
            "Object not found.",
        )))
    });
    table.insert(Method::POST, "/classes/Slow", |req: RequestContext| async move {
        tokio::time::sleep(std::time::Duration::from_millis(30)).await;
        Ok::<_, DispatchError>(RouteResponse::ok(json!({ "slow": req.body })))
    });
    let barrier = Arc::new(Barrier::new(3));
    table.insert(Method::POST, "/classes/Barrier", move |_req: RequestContext| {
        let barrier = barrier.clone();
        async move {
            barrier.wait().await;
            Ok::<_, DispatchError>(RouteResponse::ok(json!({ "barrier": true })))
        }
    });
    table.insert(Method::GET, "/routes/moved", |_req| async move {
        Err::<RouteResponse, _>(DispatchError::unroutable(Method::GET, "/routes/elsewhere"))
    });

    let sessions = StaticSessionResolver::new().with_token("r:good", "user-1");
    let transport = Arc::new(RecordingTransport::default());
    let dispatcher = RestDispatcher::new(
        "app",
        configs,
        Arc::new(table),
        Arc::new(sessions),
        transport.clone(),
    );

    Harness {
        dispatcher,
        config,
        database,
        transport,
        seen,
    }
}
