use std::sync::Arc;

use strata_dispatch::{AppConfig, RestDispatcher};

use crate::metrics::Metrics;

#[derive(Debug, Clone)]
pub struct AppState {
    pub dispatcher: RestDispatcher,
    pub config: Arc<AppConfig>,
    pub metrics: Arc<Metrics>,
}
