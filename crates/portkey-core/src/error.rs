use thiserror::Error;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Error taxonomy surfaced by every storage backend.
///
/// `Conflict` is the only error recovered locally by callers (the insert
/// path looks up the existing mapping); everything else is surfaced.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    /// The original URL is already mapped to a short id.
    #[error("original URL already stored: {0}")]
    Conflict(String),
    /// The generated short id is already taken; the caller may retry
    /// with a fresh id.
    #[error("short id already taken: {0}")]
    IdCollision(String),
    /// No link matches the requested short or original.
    #[error("link not found: {0}")]
    NotFound(String),
    /// The request context terminated before the operation completed.
    #[error("storage operation canceled")]
    Canceled,
    /// Transport or persistence failure; retryable at the caller's
    /// discretion.
    #[error("storage i/o failed: {0}")]
    Io(String),
}

impl StorageError {
    /// True when the error signals a duplicate `original`.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StorageError::Conflict(_))
    }

    /// True when the error signals a taken short id.
    pub fn is_id_collision(&self) -> bool {
        matches!(self, StorageError::IdCollision(_))
    }
}
