//! Process-local store

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use super::KeyValueStore;
use crate::error::{StoreError, StoreResult};

/// Keeps records in memory; nothing survives the process
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, String>>,
    read_only: AtomicBool,
    read_only_keys: Mutex<HashSet<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every write with [`StoreError::ReadOnly`] while set
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }

    /// Reject writes to `key` alone while set
    pub fn set_key_read_only(&self, key: &str, read_only: bool) {
        let mut keys = self
            .read_only_keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if read_only {
            keys.insert(key.to_string());
        } else {
            keys.remove(key);
        }
    }

    fn check_writable(&self, key: &str) -> StoreResult<()> {
        let key_locked = self
            .read_only_keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(key);
        if key_locked || self.read_only.load(Ordering::SeqCst) {
            return Err(StoreError::ReadOnly);
        }
        Ok(())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(records.get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> StoreResult<()> {
        self.check_writable(key)?;
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        records.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        self.check_writable(key)?;
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        records.remove(key);
        Ok(())
    }
}
