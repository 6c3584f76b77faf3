use super::UploadStrategy;
use crate::models::{SelectedFile, StrategyKind, UploadResult, UploadStamp};
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Clone)]
pub struct MockUploader {
    base_url: String,
    kind: StrategyKind,
    failure: Arc<Mutex<Option<(u16, String)>>>,
    delay: Option<Duration>,
    uploads: Arc<Mutex<Vec<(String, SelectedFile, UploadStamp)>>>,
}

impl MockUploader {
    pub fn new() -> Self {
        Self {
            base_url: "https://mock-github.example.com/uploads".to_string(),
            kind: StrategyKind::Issue,
            failure: Arc::new(Mutex::new(None)),
            delay: None,
            uploads: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    pub fn with_kind(mut self, kind: StrategyKind) -> Self {
        self.kind = kind;
        self
    }

    /// Fail every upload with a provider error.
    pub fn with_failure(self, status: u16, message: &str) -> Self {
        *self.failure.lock().unwrap() = Some((status, message.to_string()));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn get_upload_count(&self) -> usize {
        self.uploads.lock().unwrap().len()
    }

    /// Token, file and stamp of every upload attempt, oldest first.
    pub fn get_uploads(&self) -> Vec<(String, SelectedFile, UploadStamp)> {
        self.uploads.lock().unwrap().clone()
    }
}

impl Default for MockUploader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UploadStrategy for MockUploader {
    fn kind(&self) -> StrategyKind {
        self.kind
    }

    async fn upload(
        &self,
        token: &str,
        file: &SelectedFile,
        stamp: &UploadStamp,
    ) -> Result<UploadResult> {
        self.uploads
            .lock()
            .unwrap()
            .push((token.to_string(), file.clone(), stamp.clone()));

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some((status, message)) = self.failure.lock().unwrap().clone() {
            return Err(Error::Provider { status, message });
        }

        let count = self.get_upload_count();
        Ok(UploadResult::new(
            format!("{}/{}", self.base_url, count),
            &file.name,
            self.kind,
        ))
    }
}
