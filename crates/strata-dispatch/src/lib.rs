pub mod auth;
mod batch;
pub mod config;
pub mod context;
mod dispatcher;
pub mod path;
pub mod router;
pub mod transport;

#[cfg(test)]
mod testing;

pub use auth::{resolve_auth, ResolvedAuth, SessionResolver, StaticSessionResolver};
pub use config::{AppConfig, ConfigRegistry};
pub use context::{RequestContext, RequestInfo};
pub use dispatcher::RestDispatcher;
pub use path::{normalize, BATCH_PATH};
pub use router::{RequestRouter, RouteResponse, RouteTable};
pub use transport::{AjaxResponse, DisabledTransport, RestTransport};

pub use strata_common::{
    AuthContext, BatchItem, BatchItemError, BatchOutcome, BatchRequest, DispatchError, RequestOptions,
    RestError,
};
