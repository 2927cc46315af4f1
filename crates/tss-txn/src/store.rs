use std::path::PathBuf;

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::TxnResult;
use crate::filedb::TransactionalFileDB;
use crate::transaction::Transaction;

/// Configuration for a [`TransactionalStore`].
#[derive(Clone, Debug)]
pub struct StoreConfig {
    /// Directory holding blob and manifest files.
    pub root: PathBuf,
    /// Write-through mode: `add_staged` becomes a no-op, so nothing is
    /// buffered and crash recovery is disabled for the transaction (`end`
    /// still publishes the then-empty manifest). Intended for measuring the
    /// surrounding pipeline without staging I/O.
    pub recovery_disabled: bool,
}

impl StoreConfig {
    /// Configuration with recovery enabled (the normal mode).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            recovery_disabled: false,
        }
    }
}

/// Request-driven facade that serializes the staging lifecycle.
///
/// At most one transaction is open at a time; lifecycle misuse (`begin`
/// while open, `add`/`end` with nothing open) is a programmer error and
/// panics rather than returning an error.
///
/// The previously finalized transaction is retained and its files are swept
/// only when the next transaction ends. This one-step delayed cleanup keeps
/// the just-finalized transaction replayable across a crash while bounding
/// on-disk garbage to at most one completed transaction's files, and it
/// keeps the finalized mirror available so a same-process `recover` can
/// replay without touching disk.
pub struct TransactionalStore {
    db: TransactionalFileDB,
    current: Option<Transaction>,
    previous: Option<Transaction>,
    recovery_disabled: bool,
}

impl TransactionalStore {
    /// Open a store over `config.root`, creating the directory if needed.
    pub fn open(config: StoreConfig) -> TxnResult<Self> {
        Ok(Self {
            db: TransactionalFileDB::open(config.root)?,
            current: None,
            previous: None,
            recovery_disabled: config.recovery_disabled,
        })
    }

    /// Begin a transaction under `id`.
    ///
    /// # Panics
    ///
    /// Panics if a transaction is already open.
    pub fn begin_transaction(&mut self, id: impl Into<String>) -> TxnResult<()> {
        assert!(
            self.current.is_none(),
            "begin_transaction called while a transaction is open"
        );
        self.current = Some(self.db.begin_transaction(id)?);
        Ok(())
    }

    /// Stage `obj` in the open transaction under `handler`.
    ///
    /// # Panics
    ///
    /// Panics if no transaction is open.
    pub fn add_staged<T>(&self, obj: T, handler: &str) -> TxnResult<()>
    where
        T: Serialize + Send + Sync + 'static,
    {
        let current = self
            .current
            .as_ref()
            .expect("add_staged called with no open transaction");
        if self.recovery_disabled {
            return Ok(());
        }
        current.add(obj, handler)
    }

    /// Finalize the open transaction, then sweep the previous one.
    ///
    /// The manifest is published first (after the completion barrier), then
    /// the previous transaction's manifest and blobs are deleted. A sweep
    /// failure only warns: garbage then persists until the next sweep. Even
    /// an aborted transaction rotates into the previous slot so its partial
    /// blobs are swept on the next cycle.
    ///
    /// # Panics
    ///
    /// Panics if no transaction is open.
    pub fn end_transaction(&mut self) -> TxnResult<()> {
        let current = self
            .current
            .take()
            .expect("end_transaction called with no open transaction");

        let result = current.end();

        if let Some(previous) = self.previous.take() {
            debug!(id = previous.id(), "sweeping previous transaction");
            if let Err(e) = previous.clear() {
                warn!(id = previous.id(), error = %e, "failed to sweep previous transaction");
            }
        }
        self.previous = Some(current);
        result
    }

    /// Replay the finalized transaction `id`, if any.
    ///
    /// When `id` is the retained previous transaction, its handlers replay
    /// hot from the in-memory mirror; otherwise the file DB replays cold
    /// from disk. Either way the transaction's files are removed once every
    /// handler succeeds.
    pub fn recover(&mut self, id: &str) -> TxnResult<()> {
        if self.previous.as_ref().is_some_and(|t| t.id() == id) {
            debug!(id, "replaying retained transaction from its mirror");
            let previous = self.previous.take().expect("previous checked above");
            return previous.commit();
        }
        self.db.recover(id)
    }
}
