//! Transactional durable staging for the Transactional Staging Store (TSS).
//!
//! This crate is the heart of TSS. It buffers a set of in-memory objects to
//! disk under a transaction identifier, commits the set atomically by
//! publishing a manifest, and replays the set after a crash by dispatching
//! each buffered blob to a registered recovery handler. It provides:
//!
//! - Process-wide recovery handler registry with hot/cold [`Payload`] dispatch
//! - [`Transaction`]: concurrent producer writes behind a completion barrier
//! - [`Manifest`]: the persisted blob-key to handler-name mapping
//! - [`TransactionalFileDB`]: per-root entry point and cold recovery
//! - [`TransactionalStore`]: lifecycle facade with one-step delayed cleanup
//!
//! # Durability Model
//!
//! Every blob is written atomically under its content hash before the
//! manifest is written under the transaction id, so a visible manifest
//! implies all of its blobs are present. Recovery replays a manifest's
//! entries through their handlers and removes the files only after every
//! handler succeeds; handlers must therefore be idempotent, since a crash
//! mid-replay leads to a second replay.

pub mod error;
pub mod filedb;
pub mod manifest;
pub mod registry;
pub mod store;
pub mod transaction;

pub use error::{TxnError, TxnResult};
pub use filedb::TransactionalFileDB;
pub use manifest::Manifest;
pub use registry::{
    is_registered, lookup_recover_fn, register_recover_fn, HandlerError, Payload, RecoverFn,
};
pub use store::{StoreConfig, TransactionalStore};
pub use transaction::Transaction;
