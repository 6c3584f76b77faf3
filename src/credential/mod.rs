//! Credential handling
//!
//! Reversible obfuscation of the GitHub token and its storage contract over
//! the key-value store.

pub mod codec;
pub mod store;

pub use codec::ObfuscationCodec;
pub use store::CredentialStore;
