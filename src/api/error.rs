//! Application error type mapping to HTTP status codes

use super::types::ErrorResponse;
use crate::chat::ChatError;
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

const UNREGISTERED: &str = "User not registered OR Token malfunctioned";

/// Application-level error that maps to HTTP responses
#[derive(Debug)]
pub enum AppError {
    Chat(ChatError),
    Internal(String),
}

impl From<ChatError> for AppError {
    fn from(e: ChatError) -> Self {
        AppError::Chat(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let chat = match self {
            AppError::Chat(e) => e,
            AppError::Internal(detail) => {
                tracing::error!(error = %detail, "Unhandled request failure");
                let body = ErrorResponse::new("Something went wrong");
                return (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response();
            }
        };

        let (status, body) = match chat {
            ChatError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, ErrorResponse::new(msg)),
            ChatError::Unauthenticated | ChatError::NotFound => {
                (StatusCode::UNAUTHORIZED, ErrorResponse::new(UNREGISTERED))
            }
            ChatError::PermissionMismatch => (
                StatusCode::UNAUTHORIZED,
                ErrorResponse::new("Permissions didn't match"),
            ),
            ChatError::QuotaExceeded { retry_after } => {
                let seconds = retry_after
                    .as_ref()
                    .and_then(|delay| delay.as_duration())
                    .map(|d| d.as_secs_f64().ceil().to_string());
                let body = ErrorResponse::new("Quota exceeded, please retry later")
                    .with_retry_after(retry_after);
                let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
                if let Some(value) = seconds.and_then(|s| HeaderValue::from_str(&s).ok()) {
                    response.headers_mut().insert(header::RETRY_AFTER, value);
                }
                return response;
            }
            ChatError::ProviderError { cause } => (
                StatusCode::BAD_GATEWAY,
                ErrorResponse::new("Generative backend failed").with_cause(cause),
            ),
            ChatError::Conflict => (
                StatusCode::CONFLICT,
                ErrorResponse::new("Transcript was modified concurrently, please retry"),
            ),
            ChatError::Persistence => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::new("Something went wrong"),
            ),
        };

        (status, Json(body)).into_response()
    }
}
