//! In-memory backend with an optional byte quota.

use parking_lot::Mutex;
use std::collections::HashMap;

use super::{KeyValueStore, StorageError, Write};

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    data: HashMap<String, String>,
    quota: Option<usize>,
}

impl Inner {
    fn usage(data: &HashMap<String, String>) -> usize {
        data.iter().map(|(k, v)| k.len() + v.len()).sum()
    }

    fn check_quota(&self, data: &HashMap<String, String>, key: &str) -> Result<(), StorageError> {
        let Some(quota) = self.quota else { return Ok(()) };
        let used = Self::usage(data);
        if used > quota {
            return Err(StorageError::QuotaExceeded { key: key.to_string(), needed: used - quota });
        }
        Ok(())
    }
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    /// A store that rejects writes once keys plus values exceed `bytes`,
    /// like a browser profile's storage quota.
    pub fn with_quota(bytes: usize) -> Self {
        let store = Self::new();
        store.set_quota(Some(bytes));
        store
    }

    pub fn set_quota(&self, quota: Option<usize>) { self.inner.lock().quota = quota; }

    /// Bytes currently held (keys plus values).
    pub fn usage(&self) -> usize { Inner::usage(&self.inner.lock().data) }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.inner.lock().data.keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.inner.lock().data.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut inner = self.inner.lock();
        let mut staged = inner.data.clone();
        staged.insert(key.to_string(), value.to_string());
        inner.check_quota(&staged, key)?;
        inner.data = staged;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.inner.lock().data.remove(key);
        Ok(())
    }

    /// Stages the whole batch on a copy and swaps it in under one lock.
    fn commit(&self, batch: &[Write]) -> Result<(), StorageError> {
        let mut inner = self.inner.lock();
        let mut staged = inner.data.clone();
        for write in batch {
            match write {
                Write::Set { key, value } => { staged.insert(key.clone(), value.clone()); }
                Write::Remove { key } => { staged.remove(key); }
            }
        }
        if let Some(last) = batch.last() {
            inner.check_quota(&staged, last.key())?;
        }
        inner.data = staged;
        Ok(())
    }
}
