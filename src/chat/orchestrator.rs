//! End-to-end "send message" orchestration
//!
//! load -> candidate -> prompt -> backend -> commit. The candidate transcript
//! lives only in memory until the backend succeeds; quota and provider
//! failures discard it, so the stored transcript only ever holds completed
//! turns.

use super::phase::{SendAttempt, SendPhase};
use super::prompt::assemble;
use super::store::TranscriptStore;
use super::ChatError;
use crate::auth::UserId;
use crate::db::Message;
use crate::llm::{CompletionBackend, CompletionOutcome};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

const DEFAULT_BACKEND_TIMEOUT: Duration = Duration::from_secs(90);

type IdentityLock = Arc<tokio::sync::Mutex<()>>;

/// Composes transcript storage, prompt assembly, and the backend
pub struct ChatOrchestrator<S, B> {
    store: S,
    backend: B,
    backend_timeout: Duration,
    /// One async mutex per identity with a mutation in flight
    locks: Mutex<HashMap<UserId, IdentityLock>>,
}

impl<S, B> ChatOrchestrator<S, B>
where
    S: TranscriptStore,
    B: CompletionBackend,
{
    pub fn new(store: S, backend: B) -> Self {
        Self {
            store,
            backend,
            backend_timeout: DEFAULT_BACKEND_TIMEOUT,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Upper bound on one backend call, on top of any client-level timeout
    pub fn with_backend_timeout(mut self, timeout: Duration) -> Self {
        self.backend_timeout = timeout;
        self
    }

    #[allow(dead_code)] // Used in tests
    pub fn store(&self) -> &S {
        &self.store
    }

    fn identity_lock(&self, user: &UserId) -> IdentityLock {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // Drop locks nobody else is holding or waiting on
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks.entry(user.clone()).or_default().clone()
    }

    /// Send one user message and commit the resulting turn.
    ///
    /// Returns the committed transcript. Nothing is written unless the
    /// backend reports success.
    pub async fn send_message(
        &self,
        user: &UserId,
        content: &str,
    ) -> Result<Vec<Message>, ChatError> {
        let mut attempt = SendAttempt::new(user);
        let result = self.run_send(&mut attempt, user, content).await;
        if let Err(e) = &result {
            attempt.reject(e);
        }
        result
    }

    async fn run_send(
        &self,
        attempt: &mut SendAttempt<'_>,
        user: &UserId,
        content: &str,
    ) -> Result<Vec<Message>, ChatError> {
        if content.trim().is_empty() {
            return Err(ChatError::InvalidInput(
                "message must not be empty".to_string(),
            ));
        }

        let lock = self.identity_lock(user);
        let _guard = lock.lock().await;

        attempt.advance(SendPhase::Assembling);
        let prior = self.store.load(user).await?;
        let pending = Message::user(content);
        let prompt = assemble(&prior.messages, &pending);

        let mut candidate = prior.messages;
        candidate.push(pending);

        attempt.advance(SendPhase::AwaitingBackend);
        let outcome = tokio::time::timeout(self.backend_timeout, self.backend.complete(&prompt))
            .await
            .unwrap_or_else(|_| {
                CompletionOutcome::provider_error(format!(
                    "Backend timed out after {}ms",
                    self.backend_timeout.as_millis()
                ))
            });

        match outcome {
            CompletionOutcome::Success(reply) => {
                attempt.advance(SendPhase::Completing);
                // An empty reply still commits the user's message
                if !reply.is_empty() {
                    candidate.push(Message::assistant(reply));
                }
                let committed = self.store.commit(user, &candidate, prior.version).await?;
                attempt.advance(SendPhase::Committed);
                Ok(committed.messages)
            }
            CompletionOutcome::QuotaExceeded { retry_after } => {
                Err(ChatError::QuotaExceeded { retry_after })
            }
            CompletionOutcome::ProviderError { cause } => Err(ChatError::ProviderError { cause }),
        }
    }

    /// Read `owner`'s transcript on behalf of `verified`
    pub async fn get_transcript(
        &self,
        verified: &UserId,
        owner: &UserId,
    ) -> Result<Vec<Message>, ChatError> {
        check_owner(verified, owner)?;
        Ok(self.store.load(owner).await?.messages)
    }

    /// Clear `owner`'s transcript on behalf of `verified`
    pub async fn clear_transcript(
        &self,
        verified: &UserId,
        owner: &UserId,
    ) -> Result<(), ChatError> {
        check_owner(verified, owner)?;

        let lock = self.identity_lock(owner);
        let _guard = lock.lock().await;
        self.store.clear(owner).await?;
        tracing::info!(user_id = %owner, "Transcript cleared");
        Ok(())
    }
}

fn check_owner(verified: &UserId, owner: &UserId) -> Result<(), ChatError> {
    if verified == owner {
        Ok(())
    } else {
        tracing::warn!(verified = %verified, owner = %owner, "Transcript owner mismatch");
        Err(ChatError::PermissionMismatch)
    }
}
