use super::KeyValueStore;
use crate::{Error, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// In-memory store. Clones share the same entries so tests can keep a probe.
#[derive(Clone)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
    fail: Arc<Mutex<bool>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            fail: Arc::new(Mutex::new(false)),
        }
    }

    pub fn with_entry(self, key: &str, value: &str) -> Self {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        self
    }

    /// Make every operation fail, as a full or blocked disk would.
    pub fn with_failure(self, fail: bool) -> Self {
        *self.fail.lock().unwrap() = fail;
        self
    }

    pub fn get_entries(&self) -> HashMap<String, String> {
        self.entries.lock().unwrap().clone()
    }

    fn check(&self) -> Result<()> {
        if *self.fail.lock().unwrap() {
            Err(Error::Storage("Mock storage failure".to_string()))
        } else {
            Ok(())
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.check()?;
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.check()?;
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.check()?;
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }
}
