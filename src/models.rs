//! Data models and structures
//!
//! Defines the workflow data (selected file, upload result, states), the
//! GitHub API request/response shapes, and environment configuration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// How an image gets published.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// Embed the image as a data URI inside a new issue.
    #[default]
    Issue,
    /// Attach the image as a binary asset to a new release.
    Release,
}

impl FromStr for StrategyKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "issue" => Ok(StrategyKind::Issue),
            "release" => Ok(StrategyKind::Release),
            other => Err(crate::Error::Config(format!(
                "Unknown upload strategy '{}'. Expected 'issue' or 'release'",
                other
            ))),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyKind::Issue => write!(f, "issue"),
            StrategyKind::Release => write!(f, "release"),
        }
    }
}

/// The image the user picked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            bytes,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn is_image(&self) -> bool {
        self.media_type.starts_with("image/")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadResult {
    pub url: String,
    pub markdown: String,
    pub strategy: StrategyKind,
}

impl UploadResult {
    pub fn new(url: String, file_name: &str, strategy: StrategyKind) -> Self {
        let markdown = format!("![{}]({})", file_name, url);
        Self {
            url,
            markdown,
            strategy,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum WorkflowState {
    Idle,
    PreviewReady,
    Validating,
    Uploading,
    Success,
    Error,
}

impl WorkflowState {
    /// True while a network round trip is pending.
    pub fn is_in_flight(self) -> bool {
        matches!(self, WorkflowState::Validating | WorkflowState::Uploading)
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkflowState::Idle => "idle",
            WorkflowState::PreviewReady => "preview-ready",
            WorkflowState::Validating => "validating",
            WorkflowState::Uploading => "uploading",
            WorkflowState::Success => "success",
            WorkflowState::Error => "error",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum TokenStatus {
    #[default]
    Unknown,
    Valid,
    Invalid,
}

/// Time and unique id for one upload attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadStamp {
    pub at: DateTime<Utc>,
    pub id: String,
}

/// Human readable byte size, e.g. `1.5 KB` or `2 MB`.
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    let mut unit = 0;
    let mut divisor = 1u64;
    while unit < UNITS.len() - 1 && bytes >= divisor * 1024 {
        divisor *= 1024;
        unit += 1;
    }

    let value = (bytes as f64 / divisor as f64 * 100.0).round() / 100.0;
    format!("{} {}", value, UNITS[unit])
}

// GitHub API Request/Response models
#[derive(Debug, Deserialize)]
pub struct GitHubUser {
    pub login: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateIssueRequest {
    pub title: String,
    pub body: String,
    pub labels: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct IssueResponse {
    pub html_url: String,
}

#[derive(Debug, Serialize)]
pub struct CreateReleaseRequest {
    pub tag_name: String,
    pub name: String,
    pub body: String,
    pub draft: bool,
    pub prerelease: bool,
}

#[derive(Debug, Deserialize)]
pub struct ReleaseResponse {
    pub upload_url: String,
}

#[derive(Debug, Deserialize)]
pub struct AssetResponse {
    pub browser_download_url: String,
}

#[derive(Debug, Deserialize)]
pub struct GitHubErrorBody {
    pub message: Option<String>,
}

// Configuration
pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_MAX_FILE_SIZE: usize = 10 * 1024 * 1024;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_STORE_PATH: &str = ".pixelhost/store.json";

#[derive(Debug, Clone)]
pub struct Config {
    pub github_owner: String,
    pub github_repo: String,
    pub api_base_url: String,
    /// Key for the stored-token obfuscation. Never shipped as a literal.
    pub obfuscation_key: String,
    /// Used when nothing is stored yet.
    pub default_token: Option<String>,
    pub strategy: StrategyKind,
    pub max_file_size: usize,
    pub request_timeout: Duration,
    pub store_path: PathBuf,
}

impl Config {
    pub fn from_env() -> crate::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> crate::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| crate::Error::Config(format!("{} not set", key)))
        };

        let strategy = match lookup("UPLOAD_STRATEGY") {
            Some(raw) => raw.parse()?,
            None => StrategyKind::default(),
        };

        let max_file_size = match lookup("MAX_FILE_SIZE") {
            Some(raw) => raw.trim().parse::<usize>().map_err(|_| {
                crate::Error::Config(format!("MAX_FILE_SIZE must be a byte count, got '{}'", raw))
            })?,
            None => DEFAULT_MAX_FILE_SIZE,
        };

        let request_timeout = match lookup("REQUEST_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(raw.trim().parse::<u64>().map_err(|_| {
                crate::Error::Config(format!(
                    "REQUEST_TIMEOUT_SECS must be a number of seconds, got '{}'",
                    raw
                ))
            })?),
            None => DEFAULT_REQUEST_TIMEOUT,
        };

        Ok(Self {
            github_owner: required("GITHUB_OWNER")?,
            github_repo: required("GITHUB_REPO")?,
            obfuscation_key: required("TOKEN_OBFUSCATION_KEY")?,
            api_base_url: lookup("GITHUB_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            default_token: lookup("GITHUB_TOKEN")
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty()),
            strategy,
            max_file_size,
            request_timeout,
            store_path: lookup("PIXELHOST_STORE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_PATH)),
        })
    }
}
