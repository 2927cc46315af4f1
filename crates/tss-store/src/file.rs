use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::traits::KvStore;

/// Durable file-per-key store over a single flat directory.
///
/// Each key names one regular file directly under the root. `set` writes the
/// value to a temporary sibling, fsyncs it, and renames it over the key;
/// the rename is atomic on the target filesystem, so a crash at any point
/// leaves either the old value or the new one under the key. On Unix the
/// root directory is fsynced after the rename so the replacement itself
/// survives power loss.
pub struct FileKvStore {
    root: PathBuf,
}

impl FileKvStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// The root directory backing this store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> StoreResult<PathBuf> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }
}

/// Keys must be plain file names: temp siblings live in the dot-prefixed
/// namespace, and anything with a separator would escape the root.
fn validate_key(key: &str) -> StoreResult<()> {
    let invalid = |reason| StoreError::InvalidKey {
        key: key.to_string(),
        reason,
    };
    if key.is_empty() {
        return Err(invalid("key is empty"));
    }
    if key.contains('/') || key.contains('\\') {
        return Err(invalid("key contains a path separator"));
    }
    if key.starts_with('.') {
        return Err(invalid("key starts with '.'"));
    }
    Ok(())
}

/// Flush directory metadata so a completed rename survives power loss.
#[cfg(unix)]
fn sync_dir(dir: &Path) -> std::io::Result<()> {
    fs::File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> std::io::Result<()> {
    Ok(())
}

impl KvStore for FileKvStore {
    fn set(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        let path = self.path_for(key)?;

        let mut tmp = NamedTempFile::new_in(&self.root)?;
        tmp.write_all(value)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| StoreError::Io(e.error))?;
        sync_dir(&self.root)?;

        debug!(key, len = value.len(), "kv set");
        Ok(())
    }

    fn get(&self, key: &str) -> StoreResult<Vec<u8>> {
        let path = self.path_for(key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::NotFound {
                key: key.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(key, "kv delete");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::NotFound {
                key: key.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }
}

impl std::fmt::Debug for FileKvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileKvStore")
            .field("root", &self.root)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    fn open_temp_store() -> (tempfile::TempDir, FileKvStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKvStore::open(dir.path().join("db")).unwrap();
        (dir, store)
    }

    fn file_count(store: &FileKvStore) -> usize {
        fs::read_dir(store.root()).unwrap().count()
    }

    // -----------------------------------------------------------------------
    // Core set / get / delete
    // -----------------------------------------------------------------------

    #[test]
    fn set_and_get_roundtrip() {
        let (_dir, store) = open_temp_store();
        store.set("key", &[1, 2, 3, 4, 5]).unwrap();
        assert_eq!(store.get("key").unwrap(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn get_missing_key_is_not_found() {
        let (_dir, store) = open_temp_store();
        let err = store.get("missing").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn set_replaces_existing_value() {
        let (_dir, store) = open_temp_store();
        store.set("key", b"old").unwrap();
        store.set("key", b"new").unwrap();
        assert_eq!(store.get("key").unwrap(), b"new");
        // Replacement, not accumulation: still one file under the root.
        assert_eq!(file_count(&store), 1);
    }

    #[test]
    fn delete_removes_key() {
        let (_dir, store) = open_temp_store();
        store.set("key", b"value").unwrap();
        store.delete("key").unwrap();
        assert!(store.get("key").unwrap_err().is_not_found());
    }

    #[test]
    fn delete_missing_key_is_not_found() {
        let (_dir, store) = open_temp_store();
        let err = store.delete("never-written").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn empty_value_roundtrips() {
        let (_dir, store) = open_temp_store();
        store.set("empty", b"").unwrap();
        assert_eq!(store.get("empty").unwrap(), Vec::<u8>::new());
    }

    // -----------------------------------------------------------------------
    // Durability across reopen
    // -----------------------------------------------------------------------

    #[test]
    fn values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("db");
        {
            let store = FileKvStore::open(&root).unwrap();
            store.set("persisted", b"still here").unwrap();
        }
        let store = FileKvStore::open(&root).unwrap();
        assert_eq!(store.get("persisted").unwrap(), b"still here");
    }

    #[test]
    fn open_creates_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("a").join("b");
        let store = FileKvStore::open(&root).unwrap();
        assert!(store.root().is_dir());
    }

    // -----------------------------------------------------------------------
    // Key validation
    // -----------------------------------------------------------------------

    #[test]
    fn rejects_invalid_keys() {
        let (_dir, store) = open_temp_store();
        for key in ["", "a/b", "a\\b", ".", "..", ".hidden"] {
            let err = store.set(key, b"x").unwrap_err();
            assert!(
                matches!(err, StoreError::InvalidKey { .. }),
                "key {key:?} should be rejected"
            );
        }
    }

    #[test]
    fn invalid_key_rejected_on_every_operation() {
        let (_dir, store) = open_temp_store();
        assert!(matches!(
            store.get("../escape").unwrap_err(),
            StoreError::InvalidKey { .. }
        ));
        assert!(matches!(
            store.delete("../escape").unwrap_err(),
            StoreError::InvalidKey { .. }
        ));
    }

    // -----------------------------------------------------------------------
    // Atomic replacement leaves no temp droppings
    // -----------------------------------------------------------------------

    #[test]
    fn set_leaves_exactly_one_file_per_key() {
        let (_dir, store) = open_temp_store();
        store.set("a", b"1").unwrap();
        store.set("b", b"2").unwrap();
        store.set("a", b"3").unwrap();
        assert_eq!(file_count(&store), 2);
    }

    // -----------------------------------------------------------------------
    // Concurrent writers
    // -----------------------------------------------------------------------

    #[test]
    fn concurrent_writers_on_distinct_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileKvStore::open(dir.path().join("db")).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    let key = format!("key-{i}");
                    store.set(&key, key.as_bytes()).unwrap();
                })
            })
            .collect();
        for h in handles {
            h.join().expect("writer thread panicked");
        }

        for i in 0..8 {
            let key = format!("key-{i}");
            assert_eq!(store.get(&key).unwrap(), key.as_bytes());
        }
    }

    #[test]
    fn concurrent_writers_on_same_key_leave_a_complete_value() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileKvStore::open(dir.path().join("db")).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    store.set("contended", vec![i as u8; 64].as_slice()).unwrap();
                })
            })
            .collect();
        for h in handles {
            h.join().expect("writer thread panicked");
        }

        // Whichever write won, the value is one writer's complete payload.
        let value = store.get("contended").unwrap();
        assert_eq!(value.len(), 64);
        assert!(value.iter().all(|b| *b == value[0]));
    }
}
