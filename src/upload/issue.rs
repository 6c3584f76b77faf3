use super::UploadStrategy;
use crate::github::GitHubHttpClient;
use crate::models::{
    format_file_size, CreateIssueRequest, IssueResponse, SelectedFile, StrategyKind,
    UploadResult, UploadStamp,
};
use crate::Result;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

const LABELS: [&str; 3] = ["photo", "upload", "automated"];

/// Publishes an image by embedding it as a data URI in a new issue.
///
/// GitHub caps issue bodies at 65 536 characters and base64 inflates the
/// payload by about a third, so large images are refused by the API with a
/// 422. That limit belongs to the provider and is not checked locally.
pub struct IssueEmbedUploader {
    http: GitHubHttpClient,
    owner: String,
    repo: String,
}

impl IssueEmbedUploader {
    pub fn new(http: GitHubHttpClient, owner: &str, repo: &str) -> Self {
        Self {
            http,
            owner: owner.to_string(),
            repo: repo.to_string(),
        }
    }

    pub fn data_uri(file: &SelectedFile) -> String {
        format!("data:{};base64,{}", file.media_type, STANDARD.encode(&file.bytes))
    }

    pub fn issue_title(file: &SelectedFile, stamp: &UploadStamp) -> String {
        format!(
            "📸 Photo - {} - {}",
            file.name,
            stamp.at.format("%Y-%m-%d %H:%M:%S UTC")
        )
    }

    pub fn issue_body(file: &SelectedFile, stamp: &UploadStamp) -> String {
        format!(
            "## 📷 Photo Upload\n\
             \n\
             **File Name:** {name}\n\
             **File Size:** {size}\n\
             **Upload Time:** {time}\n\
             **Uploaded Via:** pixelhost\n\
             \n\
             ![{name}]({uri})\n\
             \n\
             ---\n\
             \n\
             *Automatically uploaded via pixelhost*\n\
             *Timestamp: {iso}*\n",
            name = file.name,
            size = format_file_size(file.len() as u64),
            time = stamp.at.format("%Y-%m-%d %H:%M:%S UTC"),
            uri = Self::data_uri(file),
            iso = stamp.at.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        )
    }
}

#[async_trait]
impl UploadStrategy for IssueEmbedUploader {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Issue
    }

    async fn upload(
        &self,
        token: &str,
        file: &SelectedFile,
        stamp: &UploadStamp,
    ) -> Result<UploadResult> {
        let request = CreateIssueRequest {
            title: Self::issue_title(file, stamp),
            body: Self::issue_body(file, stamp),
            labels: LABELS.iter().map(|l| l.to_string()).collect(),
        };
        tracing::debug!(
            "Creating issue in {}/{} ({} body chars)",
            self.owner,
            self.repo,
            request.body.len()
        );

        let path = format!("/repos/{}/{}/issues", self.owner, self.repo);
        let issue: IssueResponse = self.http.post_json(&path, token, &request).await?;

        tracing::info!("Created issue {}", issue.html_url);
        Ok(UploadResult::new(issue.html_url, &file.name, StrategyKind::Issue))
    }
}
