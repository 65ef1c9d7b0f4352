use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use strata_common::AuthContext;
use strata_db::TransactionalSession;

use crate::config::AppConfig;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestInfo {
    pub application_id: String,
    pub session_token: Option<String>,
    pub context: Map<String, Value>,
}

/// Everything a route handler gets for one dispatched request. Built fresh
/// per call and moved into the router.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub body: Value,
    pub config: Arc<AppConfig>,
    pub auth: AuthContext,
    pub info: RequestInfo,
    /// The body again, for `GET` only.
    pub query: Option<Value>,
    /// Set when the request runs inside a transactional batch.
    pub transaction: Option<TransactionalSession>,
}
