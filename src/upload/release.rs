use super::UploadStrategy;
use crate::github::GitHubHttpClient;
use crate::models::{
    AssetResponse, CreateReleaseRequest, ReleaseResponse, SelectedFile, StrategyKind,
    UploadResult, UploadStamp,
};
use crate::Result;
use async_trait::async_trait;

/// Publishes an image as a binary asset on a freshly created release.
pub struct ReleaseAssetUploader {
    http: GitHubHttpClient,
    owner: String,
    repo: String,
}

impl ReleaseAssetUploader {
    pub fn new(http: GitHubHttpClient, owner: &str, repo: &str) -> Self {
        Self {
            http,
            owner: owner.to_string(),
            repo: repo.to_string(),
        }
    }

    pub fn tag_name(stamp: &UploadStamp) -> String {
        let short_id: String = stamp
            .id
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .take(8)
            .collect();
        format!("image-{}-{}", stamp.at.format("%Y%m%d%H%M%S"), short_id)
    }

    /// Drop the RFC 6570 `{?name,label}` suffix GitHub appends to `upload_url`.
    pub fn asset_endpoint(upload_url: &str) -> &str {
        upload_url
            .split_once('{')
            .map(|(base, _)| base)
            .unwrap_or(upload_url)
    }
}

#[async_trait]
impl UploadStrategy for ReleaseAssetUploader {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Release
    }

    async fn upload(
        &self,
        token: &str,
        file: &SelectedFile,
        stamp: &UploadStamp,
    ) -> Result<UploadResult> {
        let tag_name = Self::tag_name(stamp);
        let request = CreateReleaseRequest {
            tag_name: tag_name.clone(),
            name: format!("Image {}", file.name),
            body: format!(
                "Uploaded {} at {}",
                file.name,
                stamp.at.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
            ),
            draft: false,
            prerelease: false,
        };

        let path = format!("/repos/{}/{}/releases", self.owner, self.repo);
        let release: ReleaseResponse = self.http.post_json(&path, token, &request).await?;
        tracing::info!("Created release {} in {}/{}", tag_name, self.owner, self.repo);

        let endpoint = Self::asset_endpoint(&release.upload_url);
        let asset: AssetResponse = self
            .http
            .post_bytes(
                endpoint,
                token,
                &[("name", file.name.as_str())],
                &file.media_type,
                file.bytes.clone(),
            )
            .await?;

        tracing::info!("Uploaded asset {}", asset.browser_download_url);
        Ok(UploadResult::new(
            asset.browser_download_url,
            &file.name,
            StrategyKind::Release,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use chrono::{TimeZone, Utc};
    use std::time::Duration;
    use wiremock::matchers::{body_bytes, body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn stamp() -> UploadStamp {
        UploadStamp {
            at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap(),
            id: "6f1c2a9e-0000-4000-8000-000000000000".to_string(),
        }
    }

    fn uploader(uri: String) -> ReleaseAssetUploader {
        ReleaseAssetUploader::new(
            GitHubHttpClient::new(uri, Duration::from_secs(5)).unwrap(),
            "octo",
            "photos",
        )
    }

    #[test]
    fn test_tag_name_from_time_and_id() {
        assert_eq!(
            ReleaseAssetUploader::tag_name(&stamp()),
            "image-20240501123000-6f1c2a9e"
        );
    }

    #[test]
    fn test_asset_endpoint_strips_template() {
        assert_eq!(
            ReleaseAssetUploader::asset_endpoint(
                "https://uploads.github.com/repos/o/r/releases/1/assets{?name,label}"
            ),
            "https://uploads.github.com/repos/o/r/releases/1/assets"
        );
        assert_eq!(
            ReleaseAssetUploader::asset_endpoint("https://x/assets"),
            "https://x/assets"
        );
    }

    #[tokio::test]
    async fn test_upload_creates_release_and_asset() {
        let server = MockServer::start().await;
        let bytes = vec![0xFF, 0xD8, 0xFF, 0xE0, 1, 2, 3];

        Mock::given(method("POST"))
            .and(path("/repos/octo/photos/releases"))
            .and(body_partial_json(serde_json::json!({
                "tag_name": "image-20240501123000-6f1c2a9e",
                "draft": false,
                "prerelease": false
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "upload_url": format!(
                    "{}/repos/octo/photos/releases/1/assets{{?name,label}}",
                    server.uri()
                )
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/repos/octo/photos/releases/1/assets"))
            .and(query_param("name", "photo.jpg"))
            .and(header("Content-Type", "image/jpeg"))
            .and(body_bytes(bytes.clone()))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "browser_download_url":
                    "https://github.com/octo/photos/releases/download/t/photo.jpg"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let file = SelectedFile::new("photo.jpg", "image/jpeg", bytes);
        let result = uploader(server.uri())
            .upload("tok", &file, &stamp())
            .await
            .unwrap();

        assert_eq!(
            result.url,
            "https://github.com/octo/photos/releases/download/t/photo.jpg"
        );
        assert_eq!(result.strategy, StrategyKind::Release);
    }

    #[tokio::test]
    async fn test_release_creation_failure_skips_asset_upload() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/repos/octo/photos/releases"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/repos/octo/photos/releases/1/assets"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let file = SelectedFile::new("photo.jpg", "image/jpeg", vec![1]);
        let err = uploader(server.uri())
            .upload("tok", &file, &stamp())
            .await
            .unwrap_err();

        match err {
            Error::Provider { status, message } => {
                assert_eq!(status, 403);
                assert_eq!(message, "GitHub API returned status 403");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
