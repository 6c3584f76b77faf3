//! Persistent string key-value storage
//!
//! Holds the obfuscated credential and the upload counter. The file-backed
//! store keeps one flat JSON object on disk; the in-memory store backs tests.

pub mod counter;
pub mod file;
pub mod memory;

pub use counter::UploadCounter;
pub use file::FileStore;
pub use memory::MemoryStore;

use crate::Result;

/// Key for the obfuscated GitHub token.
pub const TOKEN_KEY: &str = "github_token_encrypted";
/// Key for the number of successful uploads.
pub const UPLOAD_COUNT_KEY: &str = "upload_count";

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}
