use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::state::AppState;

#[derive(Debug, Default)]
pub struct Metrics {
    pub requests_total: AtomicU64,
    pub requests_inflight: AtomicU64,
    pub status_2xx: AtomicU64,
    pub status_4xx: AtomicU64,
    pub status_5xx: AtomicU64,
    pub dispatch_total: AtomicU64,
    pub dispatch_failed: AtomicU64,
}

fn push_metric(body: &mut String, name: &str, kind: &str, help: &str, value: &AtomicU64) {
    let _ = write!(
        body,
        "# HELP strata_gateway_{name} {help}\n\
         # TYPE strata_gateway_{name} {kind}\n\
         strata_gateway_{name} {}\n",
        value.load(Ordering::Relaxed),
    );
}

pub fn render_metrics(metrics: &Metrics) -> String {
    let mut body = String::new();
    push_metric(
        &mut body,
        "requests_total",
        "counter",
        "Total requests handled by gateway.",
        &metrics.requests_total,
    );
    push_metric(
        &mut body,
        "requests_inflight",
        "gauge",
        "Currently in-flight requests.",
        &metrics.requests_inflight,
    );
    push_metric(&mut body, "responses_2xx", "counter", "Total 2xx responses.", &metrics.status_2xx);
    push_metric(&mut body, "responses_4xx", "counter", "Total 4xx responses.", &metrics.status_4xx);
    push_metric(&mut body, "responses_5xx", "counter", "Total 5xx responses.", &metrics.status_5xx);
    push_metric(
        &mut body,
        "dispatch_total",
        "counter",
        "Calls handed to the dispatcher.",
        &metrics.dispatch_total,
    );
    push_metric(
        &mut body,
        "dispatch_failed",
        "counter",
        "Dispatcher calls that returned an error.",
        &metrics.dispatch_failed,
    );
    body
}

pub async fn metrics_handler(State(st): State<AppState>) -> impl IntoResponse {
    let body = render_metrics(&st.metrics);
    (
        axum::http::StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
}

pub async fn track_requests(
    State(st): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, std::convert::Infallible> {
    st.metrics.requests_inflight.fetch_add(1, Ordering::Relaxed);
    let resp = next.run(req).await;
    st.metrics.requests_inflight.fetch_sub(1, Ordering::Relaxed);
    st.metrics.requests_total.fetch_add(1, Ordering::Relaxed);

    let status = resp.status().as_u16();
    if status >= 500 {
        st.metrics.status_5xx.fetch_add(1, Ordering::Relaxed);
    } else if status >= 400 {
        st.metrics.status_4xx.fetch_add(1, Ordering::Relaxed);
    } else if status >= 200 {
        st.metrics.status_2xx.fetch_add(1, Ordering::Relaxed);
    }

    Ok(resp)
}
