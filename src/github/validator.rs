use super::client::GitHubHttpClient;
use super::TokenValidator;
use crate::models::GitHubUser;
use crate::Error;
use async_trait::async_trait;

pub struct GitHubTokenValidator {
    http: GitHubHttpClient,
}

impl GitHubTokenValidator {
    pub fn new(http: GitHubHttpClient) -> Self {
        Self { http }
    }
}

#[async_trait]
impl TokenValidator for GitHubTokenValidator {
    async fn validate(&self, token: &str) -> bool {
        match self.http.get::<GitHubUser>("/user", token).await {
            Ok(user) => {
                let login = user.login.unwrap_or_default();
                if login.is_empty() {
                    tracing::warn!("GitHub accepted the token but returned no login");
                    return false;
                }
                tracing::info!("Token valid for GitHub user {}", login);
                true
            }
            Err(Error::Provider { status: 401, .. }) => {
                tracing::info!("GitHub rejected the token (401)");
                false
            }
            Err(e) => {
                tracing::warn!("Token validation failed: {}", e);
                false
            }
        }
    }
}
