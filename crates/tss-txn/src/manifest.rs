use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tss_types::BlobKey;

use crate::error::{TxnError, TxnResult};

/// The blob-key to handler-name mapping persisted under a transaction id.
///
/// Encoded as a single JSON object `{ "<hex key>": "<handler name>" }`. The
/// entries live in a `BTreeMap`, so the encoding is deterministic regardless
/// of insertion order and never needs re-encoding during recovery.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    entries: BTreeMap<BlobKey, String>,
}

impl Manifest {
    /// Create an empty manifest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `key` to a recovery handler name. A key staged twice keeps the
    /// last binding (content-addressing already deduplicated the blob).
    pub fn insert(&mut self, key: BlobKey, handler: impl Into<String>) {
        self.entries.insert(key, handler.into());
    }

    /// The handler bound to `key`, if any.
    pub fn handler_for(&self, key: &BlobKey) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Iterate over `(key, handler name)` bindings in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&BlobKey, &str)> {
        self.entries.iter().map(|(k, h)| (k, h.as_str()))
    }

    /// Iterate over the blob keys in key order.
    pub fn keys(&self) -> impl Iterator<Item = &BlobKey> {
        self.entries.keys()
    }

    /// Number of bindings.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the manifest has no bindings.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Encode for storage under the transaction id.
    pub fn encode(&self) -> TxnResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| TxnError::Serialization(e.to_string()))
    }

    /// Decode a stored manifest.
    pub fn decode(bytes: &[u8]) -> TxnResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| TxnError::Serialization(e.to_string()))
    }
}
