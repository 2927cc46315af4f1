use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock, RwLock};

use serde::de::DeserializeOwned;

use crate::error::{TxnError, TxnResult};

/// The payload handed to a recovery handler. Exactly one shape per call.
///
/// The hot path delivers the original in-memory object when the process
/// that staged the transaction is also replaying it; the cold path delivers
/// the encoded bytes read back from disk after a restart.
pub enum Payload<'a> {
    /// Hot path: the staged object, straight from the transaction mirror.
    Object(&'a (dyn Any + Send + Sync)),
    /// Cold path: the encoded blob bytes read back from the store.
    Bytes(&'a [u8]),
}

impl Payload<'_> {
    /// Decode the payload into `T` regardless of path: downcast-and-clone on
    /// the hot path, codec decode on the cold path. Lets a handler be a
    /// single code path over both shapes.
    pub fn decode<T>(&self) -> TxnResult<T>
    where
        T: Clone + DeserializeOwned + 'static,
    {
        match self {
            Payload::Object(obj) => obj.downcast_ref::<T>().cloned().ok_or_else(|| {
                TxnError::Serialization("staged object has a different type".to_string())
            }),
            Payload::Bytes(bytes) => {
                serde_json::from_slice(bytes).map_err(|e| TxnError::Serialization(e.to_string()))
            }
        }
    }

    /// Returns `true` on the hot (in-memory) path.
    pub fn is_object(&self) -> bool {
        matches!(self, Payload::Object(_))
    }

    /// Returns `true` on the cold (from-disk) path.
    pub fn is_bytes(&self) -> bool {
        matches!(self, Payload::Bytes(_))
    }
}

/// Error type recovery handlers may return.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// A registered recovery handler.
///
/// Handlers must be idempotent: recovery may run more than once for the same
/// transaction if the process crashes between calls.
pub type RecoverFn = Arc<dyn Fn(Payload<'_>) -> Result<(), HandlerError> + Send + Sync>;

static REGISTRY: LazyLock<RwLock<HashMap<String, RecoverFn>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// Register a recovery handler under `name`.
///
/// Registration is startup-time only: the registry must be treated as
/// read-only once the first transaction is opened. Registering a name twice
/// replaces the earlier handler.
pub fn register_recover_fn<F>(name: &str, f: F)
where
    F: Fn(Payload<'_>) -> Result<(), HandlerError> + Send + Sync + 'static,
{
    REGISTRY
        .write()
        .expect("lock poisoned")
        .insert(name.to_string(), Arc::new(f));
}

/// Look up a registered handler by name.
pub fn lookup_recover_fn(name: &str) -> Option<RecoverFn> {
    REGISTRY
        .read()
        .expect("lock poisoned")
        .get(name)
        .cloned()
}

/// Returns `true` if a handler is registered under `name`.
pub fn is_registered(name: &str) -> bool {
    REGISTRY.read().expect("lock poisoned").contains_key(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_lookup() {
        register_recover_fn("registry-basic", |_| Ok(()));
        assert!(is_registered("registry-basic"));
        let f = lookup_recover_fn("registry-basic").expect("should resolve");
        f(Payload::Bytes(b"null")).unwrap();
    }

    #[test]
    fn missing_handler_is_none() {
        assert!(!is_registered("registry-never-registered"));
        assert!(lookup_recover_fn("registry-never-registered").is_none());
    }

    #[test]
    fn reregistration_replaces() {
        register_recover_fn("registry-replaced", |_| Err("first".into()));
        register_recover_fn("registry-replaced", |_| Ok(()));
        let f = lookup_recover_fn("registry-replaced").unwrap();
        assert!(f(Payload::Bytes(b"0")).is_ok());
    }

    #[test]
    fn decode_hot_path_downcasts() {
        let obj: Box<dyn Any + Send + Sync> = Box::new("hello".to_string());
        let payload = Payload::Object(obj.as_ref());
        assert!(payload.is_object());
        let decoded: String = payload.decode().unwrap();
        assert_eq!(decoded, "hello");
    }

    #[test]
    fn decode_hot_path_rejects_wrong_type() {
        let obj: Box<dyn Any + Send + Sync> = Box::new(42u64);
        let payload = Payload::Object(obj.as_ref());
        let err = payload.decode::<String>().unwrap_err();
        assert!(matches!(err, TxnError::Serialization(_)));
    }

    #[test]
    fn decode_cold_path_deserializes() {
        let bytes = serde_json::to_vec(&vec![1u32, 2, 3]).unwrap();
        let payload = Payload::Bytes(&bytes);
        assert!(payload.is_bytes());
        let decoded: Vec<u32> = payload.decode().unwrap();
        assert_eq!(decoded, vec![1, 2, 3]);
    }

    #[test]
    fn decode_cold_path_rejects_garbage() {
        let payload = Payload::Bytes(b"not json at all");
        assert!(payload.decode::<String>().is_err());
    }
}
