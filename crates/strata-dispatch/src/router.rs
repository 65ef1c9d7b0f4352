use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use futures_util::future::BoxFuture;
use http::Method;
use serde_json::Value;
use strata_common::DispatchError;

use crate::context::RequestContext;

#[derive(Debug, Clone, PartialEq)]
pub struct RouteResponse {
    pub response: Value,
    pub status: Option<u16>,
}

impl RouteResponse {
    pub fn ok(response: Value) -> Self {
        Self {
            response,
            status: None,
        }
    }

    pub fn with_status(response: Value, status: u16) -> Self {
        Self {
            response,
            status: Some(status),
        }
    }
}

/// Matches `(method, path)` to a handler and runs it.
#[async_trait]
pub trait RequestRouter: Send + Sync {
    /// Fails with [`DispatchError::Unroutable`] naming this method and path
    /// when nothing handles it.
    async fn try_route(
        &self,
        method: &Method,
        path: &str,
        request: RequestContext,
    ) -> Result<RouteResponse, DispatchError>;
}

type Handler =
    Arc<dyn Fn(RequestContext) -> BoxFuture<'static, Result<RouteResponse, DispatchError>> + Send + Sync>;

/// Exact-match route table: a handler is found only for the precise method
/// and path it was registered under.
#[derive(Default)]
pub struct RouteTable {
    handlers: DashMap<(Method, String), Handler>,
}

impl std::fmt::Debug for RouteTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteTable")
            .field("routes", &self.handlers.len())
            .finish()
    }
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route<F, Fut>(self, method: Method, path: impl Into<String>, handler: F) -> Self
    where
        F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<RouteResponse, DispatchError>> + Send + 'static,
    {
        self.insert(method, path, handler);
        self
    }

    pub fn insert<F, Fut>(&self, method: Method, path: impl Into<String>, handler: F)
    where
        F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<RouteResponse, DispatchError>> + Send + 'static,
    {
        let handler: Handler = Arc::new(move |req| Box::pin(handler(req)));
        self.handlers.insert((method, path.into()), handler);
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[async_trait]
impl RequestRouter for RouteTable {
    async fn try_route(
        &self,
        method: &Method,
        path: &str,
        request: RequestContext,
    ) -> Result<RouteResponse, DispatchError> {
        // Clone the handler out so no map guard is held across the await.
        let handler = self
            .handlers
            .get(&(method.clone(), path.to_string()))
            .map(|h| h.value().clone());
        let Some(handler) = handler else {
            return Err(DispatchError::unroutable(method.clone(), path));
        };
        handler(request).await
    }
}
