use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use serde::Serialize;
use tracing::{debug, warn};
use tss_store::KvStore;
use tss_types::BlobKey;

use crate::error::{TxnError, TxnResult};
use crate::manifest::Manifest;
use crate::registry::{self, Payload};

/// Mutable transaction state shared with producer threads.
#[derive(Default)]
struct TxnState {
    /// Blob key -> handler name; becomes the persisted manifest.
    manifest: Manifest,
    /// Blob key -> original object, for same-process replay.
    mirror: HashMap<BlobKey, Arc<dyn Any + Send + Sync>>,
}

/// A staging transaction: buffers objects to the store under one id.
///
/// Each [`add`](Transaction::add) spawns a producer thread that encodes the
/// object, writes the blob under its content hash, and records the manifest
/// binding. [`end`](Transaction::end) joins every producer (the completion
/// barrier), then publishes the manifest under the transaction id. The
/// manifest write is strictly ordered after every blob write, so a visible
/// manifest implies its blobs are present. Blobs themselves land in no
/// particular order before that point.
///
/// The manifest and mirror sit behind one mutex held only for the O(1)
/// inserts after each blob write; producers never block one another on I/O.
pub struct Transaction {
    id: String,
    db: Arc<dyn KvStore>,
    state: Arc<Mutex<TxnState>>,
    producers: Mutex<Vec<JoinHandle<TxnResult<()>>>>,
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

impl Transaction {
    /// Open a fresh transaction under `id`.
    ///
    /// Fails with [`TxnError::DuplicateTransaction`] if a manifest for `id`
    /// is already stored. The probe is best-effort: it does not exclude a
    /// concurrent `begin` on the same id from another process, so id
    /// uniqueness within a root remains the caller's responsibility.
    pub fn begin(id: impl Into<String>, db: Arc<dyn KvStore>) -> TxnResult<Self> {
        let id = id.into();
        match db.get(&id) {
            Ok(_) => Err(TxnError::DuplicateTransaction { id }),
            Err(e) if e.is_not_found() => Ok(Self {
                id,
                db,
                state: Arc::new(Mutex::new(TxnState::default())),
                producers: Mutex::new(Vec::new()),
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Rebuild a finalized transaction from its decoded manifest, with an
    /// empty mirror. Replay through [`commit`](Transaction::commit) then
    /// takes the cold path for every entry.
    pub(crate) fn from_manifest(
        id: impl Into<String>,
        db: Arc<dyn KvStore>,
        manifest: Manifest,
    ) -> Self {
        Self {
            id: id.into(),
            db,
            state: Arc::new(Mutex::new(TxnState {
                manifest,
                mirror: HashMap::new(),
            })),
            producers: Mutex::new(Vec::new()),
        }
    }

    /// The transaction identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Stage `obj` for durable buffering under `handler`.
    ///
    /// The handler name is validated synchronously; the encode, hash, blob
    /// write, and manifest insert all run on a producer thread that overlaps
    /// other producers and further `add` calls. Producer failures surface at
    /// [`end`](Transaction::end), not here.
    ///
    /// The mirror keeps `obj` alive until the transaction is cleared; callers
    /// must not rely on mutating an object after staging it, since the hot
    /// replay path sees the staged value.
    pub fn add<T>(&self, obj: T, handler: &str) -> TxnResult<()>
    where
        T: Serialize + Send + Sync + 'static,
    {
        if !registry::is_registered(handler) {
            return Err(TxnError::UnknownHandler {
                name: handler.to_string(),
            });
        }

        let db = Arc::clone(&self.db);
        let state = Arc::clone(&self.state);
        let handler = handler.to_string();
        let handle = thread::spawn(move || -> TxnResult<()> {
            let encoded =
                serde_json::to_vec(&obj).map_err(|e| TxnError::Serialization(e.to_string()))?;
            let key = BlobKey::from_bytes(&encoded);
            db.set(&key.to_hex(), &encoded)?;

            let mut state = state.lock().expect("lock poisoned");
            state.manifest.insert(key, handler);
            state.mirror.insert(key, Arc::new(obj));
            Ok(())
        });
        self.producers.lock().expect("lock poisoned").push(handle);
        Ok(())
    }

    /// Wait for every outstanding producer, then publish the manifest.
    ///
    /// If any producer failed, nothing is published and the error reports
    /// every failure; blobs that did land stay behind as garbage until the
    /// transaction is swept.
    pub fn end(&self) -> TxnResult<()> {
        let handles: Vec<_> = {
            let mut producers = self.producers.lock().expect("lock poisoned");
            producers.drain(..).collect()
        };

        let mut failures = Vec::new();
        for handle in handles {
            match handle.join() {
                Ok(Ok(())) => {}
                Ok(Err(e)) => failures.push(e.to_string()),
                Err(_) => failures.push("producer task panicked".to_string()),
            }
        }
        if !failures.is_empty() {
            warn!(
                id = %self.id,
                failed = failures.len(),
                "producers failed; manifest not written"
            );
            return Err(TxnError::ProducerFailure { failures });
        }

        let encoded = {
            let state = self.state.lock().expect("lock poisoned");
            debug!(id = %self.id, entries = state.manifest.len(), "publishing manifest");
            state.manifest.encode()?
        };
        self.db.set(&self.id, &encoded)?;
        Ok(())
    }

    /// Replay every manifest entry through its handler, then clear.
    ///
    /// Entries with a mirror hit replay hot (the original object); the rest
    /// replay cold from the store, where a missing blob is an
    /// [`TxnError::IncompleteTransaction`]. The first handler error stops
    /// the replay and leaves all files in place so it can be retried.
    pub(crate) fn commit(&self) -> TxnResult<()> {
        let (manifest, mirror) = {
            let state = self.state.lock().expect("lock poisoned");
            (state.manifest.clone(), state.mirror.clone())
        };

        for (key, handler_name) in manifest.iter() {
            let handler =
                registry::lookup_recover_fn(handler_name).ok_or_else(|| TxnError::UnknownHandler {
                    name: handler_name.to_string(),
                })?;

            let outcome = match mirror.get(key) {
                Some(obj) => handler(Payload::Object(obj.as_ref())),
                None => {
                    let bytes = match self.db.get(&key.to_hex()) {
                        Ok(bytes) => bytes,
                        Err(e) if e.is_not_found() => {
                            return Err(TxnError::IncompleteTransaction {
                                id: self.id.clone(),
                                missing: *key,
                            });
                        }
                        Err(e) => return Err(e.into()),
                    };
                    handler(Payload::Bytes(&bytes))
                }
            };
            outcome.map_err(|e| TxnError::Handler {
                name: handler_name.to_string(),
                reason: e.to_string(),
            })?;
        }

        debug!(id = %self.id, entries = manifest.len(), "replay complete");
        self.clear()
    }

    /// Delete the manifest and every blob it references.
    ///
    /// Keys that are already gone are tolerated, so a repeated `clear` (or
    /// one racing an earlier partial clear) is a successful no-op.
    pub fn clear(&self) -> TxnResult<()> {
        match self.db.delete(&self.id) {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e.into()),
        }

        let keys: Vec<BlobKey> = {
            let state = self.state.lock().expect("lock poisoned");
            state.manifest.keys().copied().collect()
        };
        for key in keys {
            match self.db.delete(&key.to_hex()) {
                Ok(()) => {}
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}
