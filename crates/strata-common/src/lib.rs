pub mod auth;
pub mod batch;
pub mod error;
pub mod options;

pub use auth::AuthContext;
pub use batch::{BatchItem, BatchItemError, BatchOutcome, BatchRequest};
pub use error::{DispatchError, RestError};
pub use options::{RequestOptions, DEFAULT_INSTALLATION_ID};

pub mod telemetry;
