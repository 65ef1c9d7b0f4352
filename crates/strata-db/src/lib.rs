pub mod memory;
pub mod types;

pub use memory::{MemoryDatabase, SessionEvent};
pub use types::{Database, SessionId, TransactionalSession};
