//! Bearer token authentication extractor
//!
//! Extracts `Authorization: Bearer <token>` and resolves it to a user through
//! the `users` table.

use super::error::AppError;
use super::AppState;
use crate::auth::{verify_token, UserId};
use crate::chat::ChatError;
use crate::db::DbError;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

/// Identity verified for the current request
#[derive(Debug, Clone)]
pub struct VerifiedIdentity(pub UserId);

#[async_trait]
impl FromRequestParts<AppState> for VerifiedIdentity {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AppError::Chat(ChatError::Unauthenticated))?;

        match verify_token(&state.db, bearer.token()) {
            Ok(user) => Ok(VerifiedIdentity(user)),
            Err(DbError::UserNotFound(_)) => Err(AppError::Chat(ChatError::Unauthenticated)),
            Err(e) => Err(AppError::Internal(format!("Token lookup failed: {e}"))),
        }
    }
}
