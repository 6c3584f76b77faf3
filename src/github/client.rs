use crate::models::GitHubErrorBody;
use crate::{Error, Result};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

const ACCEPT: &str = "application/vnd.github.v3+json";
const API_VERSION: &str = "2022-11-28";
const USER_AGENT: &str = concat!("pixelhost/", env!("CARGO_PKG_VERSION"));

/// Thin GitHub REST client shared by the validator and both uploaders.
#[derive(Clone)]
pub struct GitHubHttpClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl GitHubHttpClient {
    pub fn new(base_url: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authorized(&self, builder: RequestBuilder, token: &str) -> RequestBuilder {
        builder
            .bearer_auth(token)
            .header("Accept", ACCEPT)
            .header("X-GitHub-Api-Version", API_VERSION)
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let response = builder.send().await.map_err(|e| {
            tracing::error!("Failed to send request to GitHub: {}", e);
            if e.is_timeout() {
                Error::Timeout(self.timeout)
            } else {
                Error::Http(e)
            }
        })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response.text().await.unwrap_or_default();
            let message = provider_message(status, &error_text);
            tracing::error!("GitHub API error (status {}): {}", status, message);
            return Err(Error::Provider { status, message });
        }

        Ok(response)
    }

    async fn parse<Resp: DeserializeOwned>(response: Response) -> Result<Resp> {
        let status = response.status().as_u16();
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::error!("Failed to parse GitHub response: {}", e);
            Error::Provider {
                status,
                message: format!("Failed to parse GitHub response: {}", e),
            }
        })
    }

    pub async fn get<Resp: DeserializeOwned>(&self, path: &str, token: &str) -> Result<Resp> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("GET {}", url);

        let response = self
            .send(self.authorized(self.client.get(&url), token))
            .await?;
        Self::parse(response).await
    }

    pub async fn post_json<Req: Serialize, Resp: DeserializeOwned>(
        &self,
        path: &str,
        token: &str,
        request: &Req,
    ) -> Result<Resp> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("POST {}", url);

        let response = self
            .send(self.authorized(self.client.post(&url), token).json(request))
            .await?;
        Self::parse(response).await
    }

    /// Upload raw bytes to an absolute URL, e.g. a release's upload endpoint.
    pub async fn post_bytes<Resp: DeserializeOwned>(
        &self,
        url: &str,
        token: &str,
        query: &[(&str, &str)],
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<Resp> {
        tracing::debug!("POST {} ({} bytes)", url, bytes.len());

        let builder = self
            .authorized(self.client.post(url), token)
            .query(query)
            .header("Content-Type", content_type)
            .body(bytes);
        let response = self.send(builder).await?;
        Self::parse(response).await
    }
}

/// Pick the provider's `message` field out of an error body, falling back to
/// a generic text when the body is not JSON or has no message.
pub(crate) fn provider_message(status: u16, body: &str) -> String {
    serde_json::from_str::<GitHubErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| format!("GitHub API returned status {}", status))
}
