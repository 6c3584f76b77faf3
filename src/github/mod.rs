//! GitHub REST API integration
//!
//! Shared HTTP plumbing plus token validation against the `/user` endpoint.

pub mod client;
pub mod mock;
pub mod validator;

pub use client::GitHubHttpClient;
pub use mock::MockTokenValidator;
pub use validator::GitHubTokenValidator;

use async_trait::async_trait;

#[async_trait]
pub trait TokenValidator: Send + Sync {
    /// True when the provider accepts `token`. Every failure reads as `false`.
    async fn validate(&self, token: &str) -> bool;
}
