//! Error handling and custom error types
//!
//! Provides unified error handling across the crate using thiserror.

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Environment variable error: {0}")]
    EnvVar(#[from] dotenvy::Error),

    /// Bad file type or size, missing token or file. Never retried.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The provider rejected the credential.
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("GitHub API error (status {status}): {message}")]
    Provider { status: u16, message: String },

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid workflow state: {0}")]
    InvalidState(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Status code carried by provider errors, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Provider { status, .. } => Some(*status),
            Error::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
