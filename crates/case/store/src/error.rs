use crate::Precondition;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Store-layer errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("precondition failed: {0}")]
    PreconditionFailed(Precondition),

    /// The operation may succeed if retried from scratch.
    #[error("transient failure: {0}")]
    Transient(String),

    /// An update was based on a revision that is no longer current.
    #[error("stale record: {0}")]
    Stale(String),

    #[error("backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Transient(_) | StoreError::Stale(_))
    }
}
