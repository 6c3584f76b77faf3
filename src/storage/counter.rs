use super::{KeyValueStore, UPLOAD_COUNT_KEY};
use std::sync::Arc;

/// Persisted count of successful uploads.
///
/// Read-modify-write is not atomic across processes sharing the same store;
/// two concurrent writers can lose an increment.
#[derive(Clone)]
pub struct UploadCounter {
    store: Arc<dyn KeyValueStore>,
}

impl UploadCounter {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Current count. Missing, unreadable or non-numeric values read as zero.
    pub fn get(&self) -> u64 {
        match self.store.get(UPLOAD_COUNT_KEY) {
            Ok(Some(raw)) => raw.trim().parse().unwrap_or_else(|_| {
                tracing::warn!("Ignoring non-numeric upload counter value '{}'", raw);
                0
            }),
            Ok(None) => 0,
            Err(e) => {
                tracing::warn!("Cannot read upload counter: {}", e);
                0
            }
        }
    }

    /// Add one and return the new value. A failed write is logged and the
    /// in-memory result still returned.
    pub fn increment(&self) -> u64 {
        let next = self.get().saturating_add(1);
        if let Err(e) = self.store.set(UPLOAD_COUNT_KEY, &next.to_string()) {
            tracing::warn!("Cannot save upload counter: {}", e);
        }
        next
    }
}
