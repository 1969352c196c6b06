//! Mock implementations for testing
//!
//! These mocks enable orchestration tests without real network I/O.

use super::store::{DatabaseTranscriptStore, StoreError, TranscriptStore};
use crate::auth::UserId;
use crate::db::{Database, Message, StoredTranscript};
use crate::llm::{CompletionBackend, CompletionOutcome};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

type CompleteHook = Box<dyn Fn() + Send + Sync>;

// ============================================================================
// Mock Backend
// ============================================================================

/// Mock backend that returns queued outcomes
pub struct MockBackend {
    outcomes: Mutex<VecDeque<CompletionOutcome>>,
    prompts: Mutex<Vec<String>>,
    delay: Mutex<Option<Duration>>,
    hook: Mutex<Option<CompleteHook>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            outcomes: Mutex::new(VecDeque::new()),
            prompts: Mutex::new(Vec::new()),
            delay: Mutex::new(None),
            hook: Mutex::new(None),
        }
    }

    /// Queue an outcome
    pub fn queue(&self, outcome: CompletionOutcome) {
        self.outcomes.lock().unwrap().push_back(outcome);
    }

    /// Queue a successful reply
    pub fn queue_reply(&self, reply: impl Into<String>) {
        self.queue(CompletionOutcome::Success(reply.into()));
    }

    /// Sleep this long before answering
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    /// Run `hook` inside every call, before answering
    pub fn on_complete(&self, hook: impl Fn() + Send + Sync + 'static) {
        *self.hook.lock().unwrap() = Some(Box::new(hook));
    }

    /// Get recorded prompts
    pub fn recorded_prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompletionBackend for MockBackend {
    async fn complete(&self, prompt: &str) -> CompletionOutcome {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let outcome = self
            .outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| CompletionOutcome::provider_error("No mock outcome queued"));

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(hook) = self.hook.lock().unwrap().as_ref() {
            hook();
        }
        outcome
    }

    fn model_id(&self) -> &str {
        "mock-model"
    }
}

// ============================================================================
// Failing Store
// ============================================================================

/// Database-backed store whose commits always fail
pub struct FailingCommitStore {
    inner: DatabaseTranscriptStore,
}

impl FailingCommitStore {
    pub fn new(db: Database) -> Self {
        Self {
            inner: DatabaseTranscriptStore::new(db),
        }
    }
}

#[async_trait]
impl TranscriptStore for FailingCommitStore {
    async fn load(&self, user: &UserId) -> Result<StoredTranscript, StoreError> {
        self.inner.load(user).await
    }

    async fn commit(
        &self,
        _user: &UserId,
        _messages: &[Message],
        _expected_version: i64,
    ) -> Result<StoredTranscript, StoreError> {
        Err(StoreError::Persistence("disk full".to_string()))
    }

    async fn clear(&self, user: &UserId) -> Result<(), StoreError> {
        self.inner.clear(user).await
    }
}
