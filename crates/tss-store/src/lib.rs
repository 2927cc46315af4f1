//! Atomic key-value storage for the Transactional Staging Store.
//!
//! This crate implements the minimum-surface store the transaction layer
//! builds on: a flat `key -> byte-blob` namespace with atomic single-key
//! replacement. Keys name files directly under one root directory; a `set`
//! is write-to-temp + fsync + rename, so a reader (or a recovery pass after
//! a crash) observes either the previous value or the new one, never a
//! torn write.
//!
//! # Storage Backends
//!
//! All backends implement the [`KvStore`] trait:
//!
//! - [`FileKvStore`] -- durable file-per-key store over one directory
//! - [`InMemoryKvStore`] -- `HashMap`-based store for tests and embedding
//!
//! # Design Rules
//!
//! 1. Atomicity is per key; there is no cross-key ordering guarantee.
//! 2. Missing keys are reported as [`StoreError::NotFound`], for `get` and
//!    `delete` alike.
//! 3. Keys must be plain file names: no separators, no leading dot.
//! 4. No iteration surface -- callers track their own key sets.
//! 5. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod file;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use file::FileKvStore;
pub use memory::InMemoryKvStore;
pub use traits::KvStore;
