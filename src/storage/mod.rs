//! Profile-local key-value storage
//!
//! Every persisted value (user, cart, orders, pending buy-now payload, last
//! order snapshot) is a JSON document under a fixed key. Backends only need
//! string get/set/remove; multi-key updates go through [`KeyValueStore::commit`].

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Storage keys, named as the browser profile stored them.
pub mod keys {
    pub const USER: &str = "user";
    pub const CART: &str = "cart";
    pub const ORDERS: &str = "orders";
    pub const DIRECT_CHECKOUT: &str = "directCheckout";
    pub const LAST_ORDER: &str = "lastOrder";
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("storage quota exceeded writing {key} ({needed} bytes over limit)")]
    QuotaExceeded { key: String, needed: usize },

    #[error("invalid storage key: {0}")]
    InvalidKey(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// One entry of a multi-key update.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Write {
    Set { key: String, value: String },
    Remove { key: String },
}

impl Write {
    pub fn set_json<T: Serialize + ?Sized>(key: &str, value: &T) -> Result<Self, StorageError> {
        Ok(Self::Set { key: key.to_string(), value: serde_json::to_string(value)? })
    }

    pub fn remove(key: &str) -> Self { Self::Remove { key: key.to_string() } }

    pub fn key(&self) -> &str {
        match self { Self::Set { key, .. } | Self::Remove { key } => key }
    }
}

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Applies every write or none of them.
    ///
    /// The default snapshots each touched key, applies the writes in order and
    /// restores the snapshots if one fails. Backends with a native transaction
    /// should override it.
    fn commit(&self, batch: &[Write]) -> Result<(), StorageError> {
        let mut snapshot = Vec::with_capacity(batch.len());
        for write in batch {
            snapshot.push((write.key(), self.get(write.key())?));
        }

        for (applied, write) in batch.iter().enumerate() {
            let result = match write {
                Write::Set { key, value } => self.set(key, value),
                Write::Remove { key } => self.remove(key),
            };
            if let Err(err) = result {
                tracing::warn!(key = write.key(), applied, error = %err, "batch write failed; restoring");
                for (key, previous) in snapshot.iter().take(applied).rev() {
                    let restored = match previous {
                        Some(value) => self.set(key, value),
                        None => self.remove(key),
                    };
                    if let Err(restore_err) = restored {
                        tracing::error!(key, error = %restore_err, "failed to restore key after aborted batch");
                    }
                }
                return Err(err);
            }
        }
        Ok(())
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Arc<S> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> { (**self).get(key) }
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> { (**self).set(key, value) }
    fn remove(&self, key: &str) -> Result<(), StorageError> { (**self).remove(key) }
    fn commit(&self, batch: &[Write]) -> Result<(), StorageError> { (**self).commit(batch) }
}

/// Reads and decodes a JSON value. Undecodable values are logged and treated as absent.
pub fn load_json<T: DeserializeOwned>(store: &(impl KeyValueStore + ?Sized), key: &str) -> Result<Option<T>, StorageError> {
    let Some(raw) = store.get(key)? else { return Ok(None) };
    match serde_json::from_str(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(err) => {
            tracing::warn!(key, error = %err, "ignoring unreadable stored value");
            Ok(None)
        }
    }
}

pub fn save_json<T: Serialize + ?Sized>(store: &(impl KeyValueStore + ?Sized), key: &str, value: &T) -> Result<(), StorageError> {
    store.set(key, &serde_json::to_string(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    /// Fails every write to one key; relies on the default `commit`.
    struct FlakyStore {
        data: Mutex<HashMap<String, String>>,
        broken: &'static str,
    }

    impl KeyValueStore for FlakyStore {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> { Ok(self.data.lock().get(key).cloned()) }
        fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
            if key == self.broken { return Err(StorageError::QuotaExceeded { key: key.into(), needed: 1 }); }
            self.data.lock().insert(key.into(), value.into());
            Ok(())
        }
        fn remove(&self, key: &str) -> Result<(), StorageError> { self.data.lock().remove(key); Ok(()) }
    }

    #[test]
    fn test_default_commit_rolls_back() {
        let store = FlakyStore { data: Mutex::new(HashMap::new()), broken: "c" };
        store.set("a", "1").unwrap();
        store.set("b", "2").unwrap();
        let batch = [
            Write::Set { key: "a".into(), value: "10".into() },
            Write::remove("b"),
            Write::Set { key: "new".into(), value: "x".into() },
            Write::Set { key: "c".into(), value: "boom".into() },
        ];
        assert!(store.commit(&batch).is_err());
        assert_eq!(store.get("a").unwrap().as_deref(), Some("1"));
        assert_eq!(store.get("b").unwrap().as_deref(), Some("2"));
        assert_eq!(store.get("new").unwrap(), None);
    }

    #[test]
    fn test_default_commit_applies_all() {
        let store = FlakyStore { data: Mutex::new(HashMap::new()), broken: "never" };
        store.commit(&[Write::set_json("a", &[1, 2]).unwrap(), Write::remove("b")]).unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("[1,2]"));
    }

    #[test]
    fn test_load_json_ignores_garbage() {
        let store = MemoryStore::new();
        store.set(keys::CART, "{not json").unwrap();
        let loaded: Option<Vec<u32>> = load_json(&store, keys::CART).unwrap();
        assert!(loaded.is_none());
        save_json(&store, keys::CART, &vec![1_u32]).unwrap();
        assert_eq!(load_json::<Vec<u32>>(&store, keys::CART).unwrap(), Some(vec![1]));
    }
}
