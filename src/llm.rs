//! Generative backend abstraction
//!
//! The backend is an opaque text-completion service: one prompt in, one
//! classified outcome out.

mod gemini;
mod outcome;

pub use gemini::{GeminiBackend, DEFAULT_MODEL};
pub use outcome::{CompletionOutcome, RetryDelay};

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Configuration for the generative backend
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    /// Alternate base URL (proxy or gateway) in place of the public API
    pub gateway: Option<String>,
    pub model: String,
    pub timeout: Duration,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            gateway: None,
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl LlmConfig {
    pub fn from_env() -> Self {
        let timeout_secs = std::env::var("LLM_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Self {
            api_key: std::env::var("GEMINI_API_KEY")
                .ok()
                .filter(|k| !k.is_empty()),
            gateway: std::env::var("LLM_GATEWAY").ok().filter(|g| !g.is_empty()),
            model: std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some() || self.gateway.is_some()
    }
}

/// Common interface for completion backends
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Make exactly one completion request. Never retries.
    async fn complete(&self, prompt: &str) -> CompletionOutcome;

    /// Get the model ID
    fn model_id(&self) -> &str;
}

#[async_trait]
impl<T: CompletionBackend + ?Sized> CompletionBackend for Arc<T> {
    async fn complete(&self, prompt: &str) -> CompletionOutcome {
        (**self).complete(prompt).await
    }

    fn model_id(&self) -> &str {
        (**self).model_id()
    }
}

/// Logging wrapper for completion backends
pub struct LoggingBackend {
    inner: Arc<dyn CompletionBackend>,
    model_id: String,
}

impl LoggingBackend {
    pub fn new(inner: Arc<dyn CompletionBackend>) -> Self {
        let model_id = inner.model_id().to_string();
        Self { inner, model_id }
    }
}

#[async_trait]
impl CompletionBackend for LoggingBackend {
    async fn complete(&self, prompt: &str) -> CompletionOutcome {
        let start = std::time::Instant::now();
        let outcome = self.inner.complete(prompt).await;
        let duration = start.elapsed();

        match &outcome {
            CompletionOutcome::Success(reply) => {
                tracing::info!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    prompt_chars = prompt.len(),
                    reply_chars = reply.len(),
                    "LLM request completed"
                );
            }
            CompletionOutcome::QuotaExceeded { retry_after } => {
                tracing::warn!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    retry_after = retry_after.as_ref().map(RetryDelay::as_str),
                    outcome = outcome.kind(),
                    "LLM quota exceeded"
                );
            }
            CompletionOutcome::ProviderError { cause } => {
                tracing::error!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    error = %cause,
                    outcome = outcome.kind(),
                    "LLM request failed"
                );
            }
        }

        outcome
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
