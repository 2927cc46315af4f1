use std::io;

/// Errors from key-value store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested key was not found.
    #[error("key not found: {key}")]
    NotFound { key: String },

    /// The key is not usable as a file name under the store root.
    #[error("invalid key {key:?}: {reason}")]
    InvalidKey { key: String, reason: &'static str },

    /// I/O error from the underlying storage backend.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl StoreError {
    /// Returns `true` for the not-found failure kind.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
