//! Upload workflow orchestration.
//!
//! [`Workflow`] owns the selected file, the in-memory credential and the
//! state machine:
//!
//! ```text
//! Idle -> PreviewReady -> Validating -> Uploading -> Success
//!                              |             |
//!                              +--> Error <--+
//! ```
//!
//! Error keeps the selected file so the upload can be retried; `reset`
//! returns to Idle from anywhere except an in-flight attempt.

use crate::clock::{Clock, IdSource, SystemClock, UuidIds};
use crate::credential::{CredentialStore, ObfuscationCodec};
use crate::github::{GitHubHttpClient, GitHubTokenValidator, TokenValidator};
use crate::models::{
    Config, SelectedFile, TokenStatus, UploadResult, UploadStamp, WorkflowState,
};
use crate::storage::{FileStore, KeyValueStore, UploadCounter};
use crate::upload::{build_uploader, UploadPolicy, UploadStrategy};
use crate::{Error, Result};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{info, warn};

const EVENT_CAPACITY: usize = 64;

/// Notifications for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowEvent {
    StateChanged(WorkflowState),
    TokenStatusChanged(TokenStatus),
    Completed(UploadResult),
    Failed(String),
}

/// Point-in-time view of the workflow for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowSnapshot {
    pub state: WorkflowState,
    pub file_name: Option<String>,
    pub has_token: bool,
    pub token_status: TokenStatus,
    pub result: Option<UploadResult>,
    pub error: Option<String>,
}

/// Injectable service bundle used to construct [`Workflow`] in tests/harnesses.
pub struct WorkflowServices {
    pub store: Arc<dyn KeyValueStore>,
    pub validator: Box<dyn TokenValidator>,
    pub uploader: Box<dyn UploadStrategy>,
    pub clock: Box<dyn Clock>,
    pub ids: Box<dyn IdSource>,
}

pub struct WorkflowSettings {
    pub codec: ObfuscationCodec,
    pub policy: UploadPolicy,
    pub default_token: Option<String>,
    /// Upper bound for the validation stage and for the upload stage.
    pub stage_timeout: Duration,
}

struct Session {
    state: WorkflowState,
    file: Option<SelectedFile>,
    token: String,
    token_status: TokenStatus,
    result: Option<UploadResult>,
    error: Option<String>,
}

pub struct Workflow {
    credentials: CredentialStore,
    counter: UploadCounter,
    validator: Box<dyn TokenValidator>,
    uploader: Box<dyn UploadStrategy>,
    clock: Box<dyn Clock>,
    ids: Box<dyn IdSource>,
    policy: UploadPolicy,
    stage_timeout: Duration,
    session: Mutex<Session>,
    events: broadcast::Sender<WorkflowEvent>,
}

impl Workflow {
    /// Build a workflow from concrete service dependencies.
    ///
    /// The stored credential wins over `settings.default_token`.
    pub fn with_services(services: WorkflowServices, settings: WorkflowSettings) -> Self {
        let credentials = CredentialStore::new(services.store.clone(), settings.codec);
        let counter = UploadCounter::new(services.store);

        let token = credentials
            .retrieve()
            .or(settings.default_token)
            .unwrap_or_default();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            credentials,
            counter,
            validator: services.validator,
            uploader: services.uploader,
            clock: services.clock,
            ids: services.ids,
            policy: settings.policy,
            stage_timeout: settings.stage_timeout,
            session: Mutex::new(Session {
                state: WorkflowState::Idle,
                file: None,
                token,
                token_status: TokenStatus::Unknown,
                result: None,
                error: None,
            }),
            events,
        }
    }

    /// Construct a workflow talking to GitHub from environment configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let http = GitHubHttpClient::new(config.api_base_url.clone(), config.request_timeout)?;
        info!("Using GitHub API at {}", http.base_url());
        info!("Credential store: {}", config.store_path.display());

        let services = WorkflowServices {
            store: Arc::new(FileStore::new(config.store_path.clone())),
            validator: Box::new(GitHubTokenValidator::new(http.clone())),
            uploader: build_uploader(
                config.strategy,
                http,
                &config.github_owner,
                &config.github_repo,
            ),
            clock: Box::new(SystemClock),
            ids: Box::new(UuidIds),
        };

        // A release upload makes two requests, each bounded by the client timeout.
        let settings = WorkflowSettings {
            codec: ObfuscationCodec::new(&config.obfuscation_key)?,
            policy: UploadPolicy::new(config.max_file_size),
            default_token: config.default_token.clone(),
            stage_timeout: config.request_timeout * 2,
        };

        Ok(Self::with_services(services, settings))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowEvent> {
        self.events.subscribe()
    }

    pub fn snapshot(&self) -> WorkflowSnapshot {
        let session = self.lock();
        WorkflowSnapshot {
            state: session.state,
            file_name: session.file.as_ref().map(|f| f.name.clone()),
            has_token: !session.token.is_empty(),
            token_status: session.token_status,
            result: session.result.clone(),
            error: session.error.clone(),
        }
    }

    pub fn state(&self) -> WorkflowState {
        self.lock().state
    }

    pub fn upload_count(&self) -> u64 {
        self.counter.get()
    }

    /// Accept a new file. Invalid files are reported and leave state as is.
    pub fn handle_file_selected(&self, file: SelectedFile) -> Result<()> {
        let mut session = self.lock();
        if session.state.is_in_flight() {
            return Err(Error::InvalidState(
                "Cannot change the file while an upload is in progress".to_string(),
            ));
        }

        if let Err(e) = self.policy.check(&file) {
            warn!("Rejected file {}: {}", file.name, e);
            self.emit(WorkflowEvent::Failed(e.to_string()));
            return Err(e);
        }

        info!("Selected {} ({}, {} bytes)", file.name, file.media_type, file.len());
        session.file = Some(file);
        session.result = None;
        session.error = None;
        self.transition(&mut session, WorkflowState::PreviewReady);
        Ok(())
    }

    /// Replace the credential and persist it. An empty token clears storage.
    pub fn set_credential(&self, token: &str) {
        let token = token.trim();
        if token.is_empty() {
            self.credentials.clear();
        } else {
            self.credentials.store(token);
        }

        let mut session = self.lock();
        session.token = token.to_string();
        self.set_token_status(&mut session, TokenStatus::Unknown);
    }

    pub fn clear_credential(&self) {
        self.credentials.clear();

        let mut session = self.lock();
        session.token.clear();
        self.set_token_status(&mut session, TokenStatus::Unknown);
    }

    /// Check the current credential against the provider.
    pub async fn test_credential(&self) -> TokenStatus {
        let token = self.lock().token.clone();

        let status = if token.is_empty() {
            TokenStatus::Invalid
        } else {
            match tokio::time::timeout(self.stage_timeout, self.validator.validate(&token)).await {
                Ok(true) => TokenStatus::Valid,
                Ok(false) => TokenStatus::Invalid,
                Err(_) => {
                    warn!("Token check timed out after {:?}", self.stage_timeout);
                    TokenStatus::Invalid
                }
            }
        };

        let mut session = self.lock();
        self.set_token_status(&mut session, status);
        status
    }

    /// Validate the credential, then publish the selected file.
    ///
    /// Allowed from PreviewReady, or from Error to retry. Rejected with
    /// [`Error::InvalidState`] while another attempt is in flight.
    pub async fn upload(&self) -> Result<UploadResult> {
        let (file, token) = {
            let mut session = self.lock();
            if session.state.is_in_flight() {
                return Err(Error::InvalidState(
                    "An upload is already in progress".to_string(),
                ));
            }

            let file = match (&session.file, session.state) {
                (Some(file), WorkflowState::PreviewReady | WorkflowState::Error) => file.clone(),
                _ => return Err(Error::Validation("Select a file first".to_string())),
            };

            if let Err(e) = self.policy.check(&file) {
                self.fail(&mut session, &e);
                return Err(e);
            }

            if session.token.is_empty() {
                let e = Error::Validation("Enter a GitHub token first".to_string());
                self.fail(&mut session, &e);
                return Err(e);
            }

            session.result = None;
            session.error = None;
            self.transition(&mut session, WorkflowState::Validating);
            (file, session.token.clone())
        };

        let mut guard = AttemptGuard::new(self);
        let outcome = self.run_attempt(&file, &token).await;
        guard.disarm();

        let mut session = self.lock();
        match outcome {
            Ok(result) => {
                let count = self.counter.increment();
                info!("Uploaded {} to {} (upload #{})", file.name, result.url, count);
                session.file = None;
                session.result = Some(result.clone());
                self.transition(&mut session, WorkflowState::Success);
                self.emit(WorkflowEvent::Completed(result.clone()));
                Ok(result)
            }
            Err(e) => {
                self.fail(&mut session, &e);
                Err(e)
            }
        }
    }

    /// Back to Idle with no file. Idempotent.
    pub fn reset(&self) -> Result<()> {
        let mut session = self.lock();
        if session.state.is_in_flight() {
            return Err(Error::InvalidState(
                "Cannot reset while an upload is in progress".to_string(),
            ));
        }

        session.file = None;
        session.result = None;
        session.error = None;
        self.transition(&mut session, WorkflowState::Idle);
        Ok(())
    }

    async fn run_attempt(&self, file: &SelectedFile, token: &str) -> Result<UploadResult> {
        let checked =
            tokio::time::timeout(self.stage_timeout, self.validator.validate(token)).await;
        let Ok(valid) = checked else {
            // An unanswered check reads as Invalid.
            let mut session = self.lock();
            self.set_token_status(&mut session, TokenStatus::Invalid);
            return Err(Error::Timeout(self.stage_timeout));
        };

        {
            let mut session = self.lock();
            if !valid {
                self.set_token_status(&mut session, TokenStatus::Invalid);
                return Err(Error::Auth(
                    "Token is not valid. Check the token and its permissions".to_string(),
                ));
            }
            self.set_token_status(&mut session, TokenStatus::Valid);
            self.transition(&mut session, WorkflowState::Uploading);
        }

        let stamp = UploadStamp {
            at: self.clock.now(),
            id: self.ids.next_id(),
        };

        tokio::time::timeout(
            self.stage_timeout,
            self.uploader.upload(token, file, &stamp),
        )
        .await
        .map_err(|_| Error::Timeout(self.stage_timeout))?
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: WorkflowEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn transition(&self, session: &mut Session, state: WorkflowState) {
        if session.state != state {
            info!("Workflow state: {} -> {}", session.state, state);
        }
        session.state = state;
        self.emit(WorkflowEvent::StateChanged(state));
    }

    fn set_token_status(&self, session: &mut Session, status: TokenStatus) {
        session.token_status = status;
        self.emit(WorkflowEvent::TokenStatusChanged(status));
    }

    fn fail(&self, session: &mut Session, error: &Error) {
        warn!("Upload failed: {}", error);
        session.error = Some(error.to_string());
        self.transition(session, WorkflowState::Error);
        self.emit(WorkflowEvent::Failed(error.to_string()));
    }
}

/// Moves an abandoned attempt to Error if its future is dropped mid-flight.
struct AttemptGuard<'a> {
    workflow: &'a Workflow,
    armed: bool,
}

impl<'a> AttemptGuard<'a> {
    fn new(workflow: &'a Workflow) -> Self {
        Self {
            workflow,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for AttemptGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut session = self.workflow.lock();
        if session.state.is_in_flight() {
            let error = Error::InvalidState("Upload was cancelled".to_string());
            self.workflow.fail(&mut session, &error);
        }
    }
}
