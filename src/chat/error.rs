//! Chat error taxonomy

use super::store::StoreError;
use crate::llm::RetryDelay;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChatError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Not authenticated")]
    Unauthenticated,
    #[error("Permissions didn't match")]
    PermissionMismatch,
    #[error("User not registered")]
    NotFound,
    #[error("Quota exceeded")]
    QuotaExceeded { retry_after: Option<RetryDelay> },
    #[error("Provider error: {cause}")]
    ProviderError { cause: String },
    #[error("Failed to persist transcript")]
    Persistence,
    #[error("Transcript was modified concurrently")]
    Conflict,
}

impl ChatError {
    /// Short label for structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::Unauthenticated => "unauthenticated",
            Self::PermissionMismatch => "permission_mismatch",
            Self::NotFound => "not_found",
            Self::QuotaExceeded { .. } => "quota_exceeded",
            Self::ProviderError { .. } => "provider_error",
            Self::Persistence => "persistence",
            Self::Conflict => "conflict",
        }
    }
}

impl From<StoreError> for ChatError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => ChatError::NotFound,
            StoreError::Conflict => ChatError::Conflict,
            // Storage details stay in the log
            StoreError::Persistence(_) => ChatError::Persistence,
        }
    }
}
