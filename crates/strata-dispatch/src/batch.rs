use std::sync::Arc;

use futures_util::future::join_all;
use http::Method;
use serde_json::Value;
use strata_common::{
    BatchItem, BatchItemError, BatchOutcome, BatchRequest, DispatchError, RequestOptions, RestError,
};
use strata_db::TransactionalSession;

use crate::config::AppConfig;
use crate::dispatcher::RestDispatcher;

impl RestDispatcher {
    /// Untyped `/batch` entry: decodes the body and runs the batch, inside
    /// `outer` when this batch is itself a sub-request of a transaction.
    pub(crate) async fn execute_batch(
        &self,
        body: Value,
        options: RequestOptions,
        config: Arc<AppConfig>,
        outer: Option<TransactionalSession>,
    ) -> Result<Vec<BatchOutcome>, DispatchError> {
        let request: BatchRequest = serde_json::from_value(body)
            .map_err(|e| DispatchError::InvalidBatch(e.to_string()))?;
        self.batch_in_session(request, options, Some(config), outer)
            .await
    }

    /// Runs every sub-request concurrently and returns one outcome per item,
    /// in input order.
    ///
    /// For a transactional request all sub-requests share one session. Any
    /// failed item aborts it and the call fails with
    /// [`DispatchError::TransactionAborted`] carrying the full outcome list;
    /// otherwise it is committed.
    pub async fn batch(
        &self,
        request: BatchRequest,
        options: RequestOptions,
        config: Option<Arc<AppConfig>>,
    ) -> Result<Vec<BatchOutcome>, DispatchError> {
        self.batch_in_session(request, options, config, None).await
    }

    async fn batch_in_session(
        &self,
        request: BatchRequest,
        options: RequestOptions,
        config: Option<Arc<AppConfig>>,
        outer: Option<TransactionalSession>,
    ) -> Result<Vec<BatchOutcome>, DispatchError> {
        let config = self.resolve_config(config)?;
        let this = self.clone();
        // Own task: a session once begun is committed or aborted even if the
        // caller stops polling.
        let run = tokio::spawn(async move { this.run_batch(request, options, config, outer).await });
        match run.await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(error=%e, "batch task failed");
                Err(RestError::new(RestError::INTERNAL_SERVER_ERROR, "batch did not complete").into())
            }
        }
    }

    async fn run_batch(
        &self,
        request: BatchRequest,
        options: RequestOptions,
        config: Arc<AppConfig>,
        outer: Option<TransactionalSession>,
    ) -> Result<Vec<BatchOutcome>, DispatchError> {
        let BatchRequest {
            requests,
            transaction,
        } = request;
        tracing::debug!(
            size = requests.len(),
            transaction,
            enlisted = outer.is_some(),
            "executing batch"
        );

        // A nested batch joins the enclosing session; the enclosing batch
        // alone commits or aborts it.
        let (session, owned) = match outer {
            Some(session) => (Some(session), false),
            None if transaction => {
                let session = config
                    .database
                    .create_transactional_session()
                    .await
                    .map_err(DispatchError::Database)?;
                (Some(session), true)
            }
            None => (None, false),
        };

        let results = self.fan_out(requests, &options, &config, session).await;

        let Some(session) = session else {
            return Ok(results);
        };

        let failed = results.iter().filter(|r| r.is_error()).count();
        if !owned {
            if failed > 0 {
                return Err(DispatchError::TransactionAborted { results });
            }
            return Ok(results);
        }

        if failed > 0 {
            tracing::warn!(session = session.id, failed, size = results.len(), "aborting batch transaction");
            config
                .database
                .abort_transactional_session(&session)
                .await
                .map_err(DispatchError::Database)?;
            return Err(DispatchError::TransactionAborted { results });
        }

        config
            .database
            .commit_transactional_session(&session)
            .await
            .map_err(DispatchError::Database)?;
        tracing::debug!(session = session.id, size = results.len(), "batch transaction committed");
        Ok(results)
    }

    async fn fan_out(
        &self,
        requests: Vec<BatchItem>,
        options: &RequestOptions,
        config: &Arc<AppConfig>,
        session: Option<TransactionalSession>,
    ) -> Vec<BatchOutcome> {
        let handles: Vec<_> = requests
            .into_iter()
            .map(|item| {
                let this = self.clone();
                let options = options.clone();
                let config = config.clone();
                tokio::spawn(async move {
                    let Ok(method) = Method::from_bytes(item.method.as_bytes()) else {
                        return BatchOutcome::Error(BatchItemError {
                            code: RestError::INVALID_JSON,
                            message: format!("invalid method {:?}", item.method),
                        });
                    };
                    this.dispatch_in_session(method, item.path, item.body, options, Some(config), session)
                        .await
                        .into()
                })
            })
            .collect();

        join_all(handles)
            .await
            .into_iter()
            .enumerate()
            .map(|(index, joined)| match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!(index, error=%e, "batch sub-request task failed");
                    BatchOutcome::Error(BatchItemError {
                        code: RestError::INTERNAL_SERVER_ERROR,
                        message: "sub-request did not complete".to_string(),
                    })
                }
            })
            .collect()
    }
}
