use super::TokenValidator;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Accepts a fixed set of tokens and records every call.
#[derive(Clone)]
pub struct MockTokenValidator {
    accepted: Arc<Mutex<HashSet<String>>>,
    delay: Option<Duration>,
    call_count: Arc<Mutex<usize>>,
}

impl MockTokenValidator {
    pub fn new() -> Self {
        Self {
            accepted: Arc::new(Mutex::new(HashSet::new())),
            delay: None,
            call_count: Arc::new(Mutex::new(0)),
        }
    }

    pub fn accepting(self, token: &str) -> Self {
        self.accepted.lock().unwrap().insert(token.to_string());
        self
    }

    /// Sleep before answering, to exercise timeouts and in-flight guards.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn get_call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }
}

impl Default for MockTokenValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenValidator for MockTokenValidator {
    async fn validate(&self, token: &str) -> bool {
        *self.call_count.lock().unwrap() += 1;

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.accepted.lock().unwrap().contains(token)
    }
}
