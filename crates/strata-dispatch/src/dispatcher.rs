use std::sync::Arc;

use futures_util::future::BoxFuture;
use http::{HeaderMap, Method};
use serde_json::Value;
use strata_common::{DispatchError, RequestOptions};
use strata_db::TransactionalSession;

use crate::auth::{resolve_auth, ResolvedAuth, SessionResolver};
use crate::config::{AppConfig, ConfigRegistry};
use crate::context::{RequestContext, RequestInfo};
use crate::path::{normalize, BATCH_PATH};
use crate::router::RequestRouter;
use crate::transport::{AjaxResponse, RestTransport};

/// In-process REST entry point for one application.
///
/// Cloning is cheap; batch sub-requests run on clones.
#[derive(Clone)]
pub struct RestDispatcher {
    application_id: Arc<str>,
    configs: Arc<ConfigRegistry>,
    router: Arc<dyn RequestRouter>,
    sessions: Arc<dyn SessionResolver>,
    transport: Arc<dyn RestTransport>,
}

impl std::fmt::Debug for RestDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestDispatcher")
            .field("application_id", &self.application_id)
            .finish()
    }
}

impl RestDispatcher {
    pub fn new(
        application_id: impl Into<String>,
        configs: Arc<ConfigRegistry>,
        router: Arc<dyn RequestRouter>,
        sessions: Arc<dyn SessionResolver>,
        transport: Arc<dyn RestTransport>,
    ) -> Self {
        let application_id: String = application_id.into();
        tracing::info!(application_id=%application_id, "rest dispatcher initialized");
        Self {
            application_id: application_id.into(),
            configs,
            router,
            sessions,
            transport,
        }
    }

    pub fn application_id(&self) -> &str {
        &self.application_id
    }

    /// Dispatch `(method, path, body)` as this application.
    ///
    /// `config` defaults to the registry entry for the dispatcher's
    /// application id. `/batch` (after normalization) runs the batch
    /// executor and resolves to the JSON array of per-item outcomes.
    pub fn handle(
        &self,
        method: Method,
        path: impl Into<String>,
        body: Value,
        options: RequestOptions,
        config: Option<Arc<AppConfig>>,
    ) -> BoxFuture<'static, Result<Value, DispatchError>> {
        self.dispatch_in_session(method, path.into(), body, options, config, None)
    }

    /// Raw request through the fallback transport.
    pub async fn ajax(
        &self,
        method: Method,
        url: impl Into<String>,
        body: Option<Value>,
        headers: HeaderMap,
    ) -> Result<AjaxResponse, DispatchError> {
        self.transport.ajax(method, url.into(), body, headers).await
    }

    pub(crate) fn resolve_config(
        &self,
        config: Option<Arc<AppConfig>>,
    ) -> Result<Arc<AppConfig>, DispatchError> {
        match config {
            Some(config) => Ok(config),
            None => self
                .configs
                .get(&self.application_id)
                .ok_or_else(|| DispatchError::MissingConfig(self.application_id.to_string())),
        }
    }

    // Boxed so batch fan-out can spawn it without an infinitely sized future.
    pub(crate) fn dispatch_in_session(
        &self,
        method: Method,
        path: String,
        body: Value,
        options: RequestOptions,
        config: Option<Arc<AppConfig>>,
        session: Option<TransactionalSession>,
    ) -> BoxFuture<'static, Result<Value, DispatchError>> {
        let this = self.clone();
        Box::pin(async move {
            this.dispatch(method, path, body, options, config, session)
                .await
        })
    }

    async fn dispatch(
        &self,
        method: Method,
        path: String,
        body: Value,
        options: RequestOptions,
        config_arg: Option<Arc<AppConfig>>,
        session: Option<TransactionalSession>,
    ) -> Result<Value, DispatchError> {
        let config = self.resolve_config(config_arg.clone())?;
        let normalized = normalize(&path, config.server_root());

        if normalized == BATCH_PATH {
            let results = self.execute_batch(body, options, config, session).await?;
            return Ok(Value::Array(
                results.into_iter().map(|r| r.into_value()).collect(),
            ));
        }

        let query = (method == Method::GET).then(|| body.clone());

        let ResolvedAuth {
            auth,
            options: resolved,
        } = resolve_auth(&options, &config, self.sessions.as_ref()).await?;

        let request = RequestContext {
            body: body.clone(),
            config: config.clone(),
            auth,
            info: RequestInfo {
                application_id: self.application_id.to_string(),
                session_token: resolved.session_token,
                context: resolved.context,
            },
            query,
            transaction: session,
        };

        match self.router.try_route(&method, &normalized, request).await {
            Ok(routed) => Ok(routed.response),
            Err(err) if err.is_unroutable(&method, &normalized) => {
                tracing::info!(
                    method=%method,
                    path=%normalized,
                    "no internal route, falling back to REST transport"
                );
                self.transport
                    .send(method, path, body, options, config_arg)
                    .await
            }
            Err(err) => {
                tracing::debug!(method=%method, path=%normalized, error=%err, "route failed");
                Err(err)
            }
        }
    }
}
