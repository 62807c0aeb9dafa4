//! Domain error types.

use thiserror::Error;
use uuid::Uuid;

/// Top-level domain error type.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An aggregate was not found.
    #[error("aggregate not found: {0}")]
    AggregateNotFound(Uuid),

    /// Input that cannot be interpreted as a no-op.
    #[error("validation error: {0}")]
    Validation(String),

    /// An infrastructure/persistence error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}
