mod args;
mod handlers;
mod metrics;
mod routes;
mod state;
mod transport;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use clap::Parser;
use strata_db::MemoryDatabase;
use strata_dispatch::{AppConfig, ConfigRegistry, RestDispatcher, StaticSessionResolver};

use crate::args::Args;
use crate::handlers::{dispatch, healthz};
use crate::metrics::{metrics_handler, track_requests};
use crate::routes::builtin_routes;
use crate::state::AppState;
use crate::transport::build_transport;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let otel_provider = strata_common::telemetry::init_tracing(
        "strata-gateway",
        args.otlp_endpoint.as_deref(),
        args.otlp_token.as_deref(),
        &args.log_format,
    );

    let mut config = AppConfig::new(
        args.application_id.clone(),
        args.server_url.clone(),
        Arc::new(MemoryDatabase::new()),
    )?;
    if let Some(key) = args.master_key.clone() {
        config = config.with_master_key(key);
    } else {
        tracing::warn!("STRATA_MASTER_KEY not set, master key requests will be rejected");
    }
    let configs = ConfigRegistry::new();
    let config = configs.register(config);

    let sessions = StaticSessionResolver::from_env();
    tracing::info!(tokens = sessions.len(), "session tokens loaded");

    let transport = build_transport(&args)?;

    let dispatcher = RestDispatcher::new(
        args.application_id.clone(),
        configs,
        Arc::new(builtin_routes()),
        Arc::new(sessions),
        transport,
    );

    let st = AppState {
        dispatcher,
        config,
        metrics: Arc::new(metrics::Metrics::default()),
    };

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/health", get(healthz))
        .route("/metrics", get(metrics_handler))
        .route("/dispatch", post(dispatch))
        .layer(middleware::from_fn_with_state(st.clone(), track_requests))
        .with_state(st);

    let listener = tokio::net::TcpListener::bind(&args.listen_addr).await?;
    tracing::info!(addr=%args.listen_addr, "gateway listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(provider) = otel_provider {
        if let Err(e) = provider.shutdown() {
            eprintln!("failed to flush traces: {e}");
        }
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error=%e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
