use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{Result, SyncError};
use crate::store::KeyValueStore;

/// Process-local store; nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.lock().map_err(|_| SyncError::StorePoisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock().map_err(|_| SyncError::StorePoisoned)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
