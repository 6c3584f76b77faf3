use super::ObfuscationCodec;
use crate::storage::{KeyValueStore, TOKEN_KEY};
use std::sync::Arc;

/// Obfuscated token persistence. No method here ever returns an error:
/// storage failures are logged and treated as "nothing stored".
#[derive(Clone)]
pub struct CredentialStore {
    store: Arc<dyn KeyValueStore>,
    codec: ObfuscationCodec,
}

impl CredentialStore {
    pub fn new(store: Arc<dyn KeyValueStore>, codec: ObfuscationCodec) -> Self {
        Self { store, codec }
    }

    /// Empty tokens are ignored.
    pub fn store(&self, token: &str) {
        if token.is_empty() {
            return;
        }
        if let Err(e) = self.store.set(TOKEN_KEY, &self.codec.encode(token)) {
            tracing::warn!("Cannot save token: {}", e);
        }
    }

    pub fn retrieve(&self) -> Option<String> {
        let encoded = match self.store.get(TOKEN_KEY) {
            Ok(Some(encoded)) if !encoded.is_empty() => encoded,
            Ok(_) => return None,
            Err(e) => {
                tracing::warn!("Cannot load token: {}", e);
                return None;
            }
        };

        let token = self.codec.decode(&encoded);
        if token.is_none() {
            tracing::debug!("Stored token could not be decoded, ignoring it");
        }
        token.filter(|t| !t.is_empty())
    }

    pub fn clear(&self) {
        if let Err(e) = self.store.remove(TOKEN_KEY) {
            tracing::warn!("Cannot clear token: {}", e);
        }
    }
}
