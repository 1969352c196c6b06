//! Transcript persistence seam
//!
//! The orchestrator only talks to this trait, so tests can swap in stores
//! that fail on demand.

use crate::auth::UserId;
use crate::db::{Database, DbError, Message, StoredTranscript};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Transcript owner not found")]
    NotFound,
    #[error("Transcript version conflict")]
    Conflict,
    #[error("Storage failure: {0}")]
    Persistence(String),
}

impl From<DbError> for StoreError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::UserNotFound(_) => StoreError::NotFound,
            DbError::VersionConflict { .. } => StoreError::Conflict,
            other => {
                tracing::error!(error = %other, "Transcript storage failure");
                StoreError::Persistence(other.to_string())
            }
        }
    }
}

/// Storage for per-user transcripts
#[async_trait]
pub trait TranscriptStore: Send + Sync {
    /// Load the full transcript and its version token
    async fn load(&self, user: &UserId) -> Result<StoredTranscript, StoreError>;

    /// Atomically replace the stored transcript if its version is still
    /// `expected_version`
    async fn commit(
        &self,
        user: &UserId,
        messages: &[Message],
        expected_version: i64,
    ) -> Result<StoredTranscript, StoreError>;

    /// Reset the transcript to empty
    async fn clear(&self, user: &UserId) -> Result<(), StoreError>;
}

#[async_trait]
impl<T: TranscriptStore + ?Sized> TranscriptStore for Arc<T> {
    async fn load(&self, user: &UserId) -> Result<StoredTranscript, StoreError> {
        (**self).load(user).await
    }

    async fn commit(
        &self,
        user: &UserId,
        messages: &[Message],
        expected_version: i64,
    ) -> Result<StoredTranscript, StoreError> {
        (**self).commit(user, messages, expected_version).await
    }

    async fn clear(&self, user: &UserId) -> Result<(), StoreError> {
        (**self).clear(user).await
    }
}

/// Adapter to use Database as a TranscriptStore
#[derive(Clone)]
pub struct DatabaseTranscriptStore {
    db: Database,
}

impl DatabaseTranscriptStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    #[allow(dead_code)] // Useful for tests
    pub fn inner(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl TranscriptStore for DatabaseTranscriptStore {
    async fn load(&self, user: &UserId) -> Result<StoredTranscript, StoreError> {
        Ok(self.db.get_transcript(user.as_str())?)
    }

    async fn commit(
        &self,
        user: &UserId,
        messages: &[Message],
        expected_version: i64,
    ) -> Result<StoredTranscript, StoreError> {
        let version = self
            .db
            .replace_transcript(user.as_str(), messages, expected_version)?;
        Ok(StoredTranscript {
            messages: messages.to_vec(),
            version,
        })
    }

    async fn clear(&self, user: &UserId) -> Result<(), StoreError> {
        self.db.clear_transcript(user.as_str())?;
        Ok(())
    }
}
