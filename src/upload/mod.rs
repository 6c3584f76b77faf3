//! Image publication strategies
//!
//! Both strategies sit behind [`UploadStrategy`]; [`build_uploader`] picks
//! one from configuration. [`UploadPolicy`] runs before any network call.

pub mod issue;
pub mod mock;
pub mod release;

pub use issue::IssueEmbedUploader;
pub use mock::MockUploader;
pub use release::ReleaseAssetUploader;

use crate::github::GitHubHttpClient;
use crate::models::{
    format_file_size, SelectedFile, StrategyKind, UploadResult, UploadStamp, DEFAULT_MAX_FILE_SIZE,
};
use crate::{Error, Result};
use async_trait::async_trait;

#[async_trait]
pub trait UploadStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Publish `file` and return its public URL. Callers run
    /// [`UploadPolicy::check`] first.
    async fn upload(
        &self,
        token: &str,
        file: &SelectedFile,
        stamp: &UploadStamp,
    ) -> Result<UploadResult>;
}

/// Pre-flight rules shared by every strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadPolicy {
    pub max_file_size: usize,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

impl UploadPolicy {
    pub fn new(max_file_size: usize) -> Self {
        Self { max_file_size }
    }

    pub fn check(&self, file: &SelectedFile) -> Result<()> {
        if !file.is_image() {
            return Err(Error::Validation(format!(
                "Only image files are allowed (JPG, PNG, GIF, WebP), got '{}'",
                file.media_type
            )));
        }

        if file.len() > self.max_file_size {
            return Err(Error::Validation(format!(
                "File is too large ({}). Maximum is {}",
                format_file_size(file.len() as u64),
                format_file_size(self.max_file_size as u64)
            )));
        }

        Ok(())
    }
}

pub fn build_uploader(
    kind: StrategyKind,
    http: GitHubHttpClient,
    owner: &str,
    repo: &str,
) -> Box<dyn UploadStrategy> {
    tracing::info!("Upload strategy: {} ({}/{})", kind, owner, repo);
    match kind {
        StrategyKind::Issue => Box::new(IssueEmbedUploader::new(http, owner, repo)),
        StrategyKind::Release => Box::new(ReleaseAssetUploader::new(http, owner, repo)),
    }
}
