//! API request and response types

use crate::db::Message;
use crate::llm::RetryDelay;
use serde::{Deserialize, Serialize};

/// Request to send a chat message
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub message: String,
}

/// Response after a committed chat turn
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatsResponse {
    pub chats: Vec<Message>,
}

/// Response with a user's transcript
#[derive(Debug, Serialize, Deserialize)]
pub struct TranscriptResponse {
    pub message: String,
    pub chats: Vec<Message>,
}

/// Plain acknowledgement
#[derive(Debug, Serialize, Deserialize)]
pub struct OkResponse {
    pub message: String,
}

impl OkResponse {
    pub fn ok() -> Self {
        Self {
            message: "OK".to_string(),
        }
    }
}

/// Response for the version endpoint
#[derive(Debug, Serialize)]
pub struct VersionResponse {
    pub version: &'static str,
}

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
    #[serde(rename = "retryAfter", skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<RetryDelay>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retry_after: None,
            cause: None,
        }
    }

    pub fn with_retry_after(mut self, retry_after: Option<RetryDelay>) -> Self {
        self.retry_after = retry_after;
        self
    }

    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.cause = Some(cause.into());
        self
    }
}
