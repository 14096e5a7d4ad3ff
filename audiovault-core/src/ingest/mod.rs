//! Validation, id assignment and background persistence of audio artifacts.

pub mod coordinator;
pub mod error;
pub mod pipeline;
pub mod pool;
pub mod request;

pub use coordinator::{Accepted, Coordinator};
pub use error::{IngestError, PoolError, ValidationError};
pub use pipeline::{IngestionReport, IngestionStatus, Pipeline};
pub use pool::{ShutdownReport, WorkerPool};
pub use request::CreateRequest;
