use thiserror::Error;
use tss_store::StoreError;
use tss_types::BlobKey;

/// Errors produced by the transaction layer.
#[derive(Debug, Error)]
pub enum TxnError {
    /// A handler name that is not in the recovery registry.
    #[error("recovery handler not registered: {name}")]
    UnknownHandler { name: String },

    /// A manifest for this transaction id already exists under the root.
    #[error("transaction already exists: {id}")]
    DuplicateTransaction { id: String },

    /// One or more producer tasks failed; the manifest was not written and
    /// any blobs that did land remain as garbage until swept.
    #[error("{} producer task(s) failed; first: {}", .failures.len(), .failures.first().map(String::as_str).unwrap_or("unknown"))]
    ProducerFailure { failures: Vec<String> },

    /// The stored manifest could not be decoded. Fatal; the manifest is left
    /// in place for operator inspection.
    #[error("corrupt manifest for transaction {id}: {reason}")]
    CorruptManifest { id: String, reason: String },

    /// A manifest references a blob that is not in the store. Fatal; the
    /// blob-before-manifest ordering guarantee was violated externally.
    #[error("incomplete transaction {id}: blob {missing} not found")]
    IncompleteTransaction { id: String, missing: BlobKey },

    /// A recovery handler reported an error. Replay may be retried; the
    /// manifest and blobs stay on disk.
    #[error("recovery handler {name} failed: {reason}")]
    Handler { name: String, reason: String },

    /// Object or manifest serialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Error from the underlying key-value store.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Result alias for transaction operations.
pub type TxnResult<T> = Result<T, TxnError>;
