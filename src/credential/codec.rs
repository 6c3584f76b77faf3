use crate::{Error, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

/// Repeating-key XOR followed by base64.
///
/// This hides a token from casual inspection of the store and nothing more.
/// Anyone who has the key can reverse it, so it must not be mistaken for
/// encryption. For ASCII tokens the output matches what the browser tool
/// wrote, so existing stored values stay readable.
#[derive(Clone)]
pub struct ObfuscationCodec {
    key: Vec<u8>,
}

impl ObfuscationCodec {
    pub fn new(key: impl AsRef<[u8]>) -> Result<Self> {
        let key = key.as_ref().to_vec();
        if key.is_empty() {
            return Err(Error::Config("Obfuscation key must not be empty".to_string()));
        }
        Ok(Self { key })
    }

    fn apply(&self, data: &[u8]) -> Vec<u8> {
        data.iter()
            .zip(self.key.iter().cycle())
            .map(|(b, k)| b ^ k)
            .collect()
    }

    pub fn encode(&self, plaintext: &str) -> String {
        STANDARD.encode(self.apply(plaintext.as_bytes()))
    }

    /// Returns `None` for anything that is not a value produced by `encode`
    /// with the same key and valid UTF-8 once reversed.
    pub fn decode(&self, ciphertext: &str) -> Option<String> {
        let raw = STANDARD.decode(ciphertext.trim()).ok()?;
        String::from_utf8(self.apply(&raw)).ok()
    }
}

impl std::fmt::Debug for ObfuscationCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObfuscationCodec")
            .field("key", &"<redacted>")
            .finish()
    }
}
