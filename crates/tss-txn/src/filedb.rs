use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};
use tss_store::{FileKvStore, KvStore};

use crate::error::{TxnError, TxnResult};
use crate::manifest::Manifest;
use crate::transaction::Transaction;

/// Transactional entry point over one store root.
///
/// Opens transactions against the root's [`FileKvStore`] and replays
/// finalized transactions after a restart. Blobs and manifests share the
/// flat root directory: blob files are named by their 64-char hex content
/// hash, manifest files by the caller-chosen transaction id (which must not
/// collide with a hex digest and must not contain separators).
pub struct TransactionalFileDB {
    root: PathBuf,
    db: Arc<dyn KvStore>,
}

impl TransactionalFileDB {
    /// Open (or create) the store root.
    pub fn open(root: impl Into<PathBuf>) -> TxnResult<Self> {
        let root = root.into();
        let db = FileKvStore::open(&root)?;
        Ok(Self {
            root,
            db: Arc::new(db),
        })
    }

    /// The directory holding blobs and manifests.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Open a fresh transaction under `id`.
    pub fn begin_transaction(&self, id: impl Into<String>) -> TxnResult<Transaction> {
        Transaction::begin(id, Arc::clone(&self.db))
    }

    /// Replay the finalized transaction `id`, if any.
    ///
    /// A missing manifest is success with nothing to do: either the
    /// transaction never finalized or it was already cleared. A manifest
    /// that will not decode is fatal and is left in place. Otherwise every
    /// manifest entry replays cold (from disk) through its handler, and the
    /// files are removed once all handlers succeed.
    pub fn recover(&self, id: &str) -> TxnResult<()> {
        debug!(id, "recovering transaction");
        let bytes = match self.db.get(id) {
            Ok(bytes) => bytes,
            Err(e) if e.is_not_found() => {
                debug!(id, "no manifest found; nothing to recover");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        let manifest = match Manifest::decode(&bytes) {
            Ok(manifest) => manifest,
            Err(e) => {
                warn!(id, error = %e, "manifest failed to decode");
                return Err(TxnError::CorruptManifest {
                    id: id.to_string(),
                    reason: e.to_string(),
                });
            }
        };

        let tx = Transaction::from_manifest(id, Arc::clone(&self.db), manifest);
        tx.commit()
    }
}
