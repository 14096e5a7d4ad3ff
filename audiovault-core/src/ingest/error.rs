use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Every absent or empty required field, in request field order.
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    #[error("Invalid audioBase64 payload: {0}")]
    InvalidPayload(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("ingestion queue is full ({capacity} tasks in flight)")]
    Saturated { capacity: usize },

    #[error("ingestion is shutting down")]
    ShuttingDown,
}

/// Synchronous outcome of a rejected submission. Nothing has been written
/// anywhere when one of these is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IngestError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Rejected(#[from] PoolError),
}
