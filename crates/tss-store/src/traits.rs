use crate::error::StoreResult;

/// Atomic key-value store over a flat namespace.
///
/// All implementations must satisfy these invariants:
/// - `set` replaces the value under a key atomically: a concurrent reader or
///   a recovery pass after a crash observes either the previous value or the
///   new one, never a partial write.
/// - Atomicity is per key; there is no cross-key ordering guarantee.
/// - Missing keys are a [`StoreError::NotFound`](crate::StoreError::NotFound)
///   failure, for `get` and `delete` alike.
/// - All I/O errors are propagated, never silently ignored.
pub trait KvStore: Send + Sync {
    /// Atomically replace the value under `key`.
    fn set(&self, key: &str, value: &[u8]) -> StoreResult<()>;

    /// Read the current value under `key`.
    fn get(&self, key: &str) -> StoreResult<Vec<u8>>;

    /// Remove `key`. Missing keys yield a not-found failure.
    fn delete(&self, key: &str) -> StoreResult<()>;
}
