use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Model endpoint returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Model returned no completion")]
    EmptyResponse,
    #[error("Model response is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("Model call timed out after {0:?}")]
    Timeout(Duration),
    #[error("{0}")]
    Other(String),
}

/// Why a structured completion could not be used, sending the extractor
/// down the plain-text path instead.
#[derive(Debug, Error)]
pub enum FallbackNeeded {
    #[error("structured output not supported by this model")]
    Unsupported,
    #[error("structured completion failed: {0}")]
    Failed(#[from] ModelError),
    #[error("structured completion did not match the schema: {0}")]
    Schema(String),
}

/// A language model the categorizer can ask.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Schema-constrained completion returning a single JSON value.
    async fn complete_structured(&self, prompt: &str) -> Result<Value, FallbackNeeded>;

    /// Free-text completion.
    async fn complete(&self, prompt: &str) -> Result<String, ModelError>;
}

// ── Mock model (tests and dry runs) ───────────────────────────────────────────

/// Replays canned answers. Structured calls report `Unsupported` unless a
/// structured answer was queued; text calls pop the next queued reply.
#[derive(Default)]
pub struct MockModel {
    structured: Mutex<VecDeque<Result<Value, String>>>,
    text: Mutex<VecDeque<Result<String, String>>>,
    prompts: Mutex<Vec<String>>,
}

impl MockModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(self, reply: impl Into<String>) -> Self {
        lock(&self.text).push_back(Ok(reply.into()));
        self
    }

    pub fn with_text_error(self, message: impl Into<String>) -> Self {
        lock(&self.text).push_back(Err(message.into()));
        self
    }

    pub fn with_structured(self, value: Value) -> Self {
        lock(&self.structured).push_back(Ok(value));
        self
    }

    pub fn with_structured_error(self, message: impl Into<String>) -> Self {
        lock(&self.structured).push_back(Err(message.into()));
        self
    }

    /// Every prompt this model has been sent, in order.
    pub fn prompts(&self) -> Vec<String> {
        lock(&self.prompts).clone()
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl ModelClient for MockModel {
    async fn complete_structured(&self, prompt: &str) -> Result<Value, FallbackNeeded> {
        lock(&self.prompts).push(prompt.to_string());
        match lock(&self.structured).pop_front() {
            Some(Ok(value)) => Ok(value),
            Some(Err(message)) => Err(FallbackNeeded::Failed(ModelError::Other(message))),
            None => Err(FallbackNeeded::Unsupported),
        }
    }

    async fn complete(&self, prompt: &str) -> Result<String, ModelError> {
        lock(&self.prompts).push(prompt.to_string());
        match lock(&self.text).pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(ModelError::Other(message)),
            None => Err(ModelError::EmptyResponse),
        }
    }
}
