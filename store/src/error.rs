use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("key not found: {0}")]
    NotFound(String),

    #[error("duplicate key: {0}")]
    Duplicate(String),

    /// Transient connectivity failure. Eligible for exactly one automatic
    /// retry (see [`crate::retry_once`]); a second failure is surfaced to
    /// the caller, which treats it as fatal.
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),

    #[error("database is corrupted: {0}")]
    Corruption(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}
