//! Tagged result of a single completion attempt

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Result of one call to a generative backend.
///
/// Backend failures are values, not errors: callers match exhaustively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// Backend answered. The text may be empty ("no reply produced").
    Success(String),
    /// Backend reported a rate or quota limit
    QuotaExceeded { retry_after: Option<RetryDelay> },
    /// Any other backend-side or transport failure
    ProviderError { cause: String },
}

impl CompletionOutcome {
    pub fn provider_error(cause: impl Into<String>) -> Self {
        Self::ProviderError {
            cause: cause.into(),
        }
    }

    /// Short label for structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::QuotaExceeded { .. } => "quota_exceeded",
            Self::ProviderError { .. } => "provider_error",
        }
    }
}

/// Suggested wait before retrying, as reported by the backend (e.g. `"30s"`).
///
/// The raw string is kept so it can be echoed back to clients unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RetryDelay(String);

impl RetryDelay {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse protobuf duration notation (`"30s"`, `"1.5s"`)
    pub fn as_duration(&self) -> Option<Duration> {
        let secs: f64 = self.0.trim().strip_suffix('s')?.parse().ok()?;
        Duration::try_from_secs_f64(secs).ok()
    }
}

impl fmt::Display for RetryDelay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
