//! HTTP request handlers

use super::error::AppError;
use super::identity::VerifiedIdentity;
use super::types::{
    ChatsResponse, OkResponse, SendMessageRequest, TranscriptResponse, VersionResponse,
};
use super::AppState;
use crate::auth::UserId;
use crate::chat::ChatError;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::{delete, get, post},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Caller's own transcript
        .route("/api/chat/new", post(send_chat))
        .route("/api/chat/all-chats", get(list_own_chats))
        .route("/api/chat/delete", delete(delete_own_chats))
        // Explicit owner, checked against the verified identity
        .route(
            "/api/users/:owner/chats",
            get(list_user_chats).delete(delete_user_chats),
        )
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Chat Completion
// ============================================================

async fn send_chat(
    State(state): State<AppState>,
    VerifiedIdentity(user): VerifiedIdentity,
    body: Result<Json<SendMessageRequest>, JsonRejection>,
) -> Result<Json<ChatsResponse>, AppError> {
    let Json(req) = body.map_err(|e| ChatError::InvalidInput(e.body_text()))?;
    let chats = state.chat.send_message(&user, &req.message).await?;
    Ok(Json(ChatsResponse { chats }))
}

// ============================================================
// Transcript Retrieval
// ============================================================

async fn list_own_chats(
    State(state): State<AppState>,
    VerifiedIdentity(user): VerifiedIdentity,
) -> Result<Json<TranscriptResponse>, AppError> {
    transcript_for(&state, &user, &user).await
}

async fn list_user_chats(
    State(state): State<AppState>,
    VerifiedIdentity(user): VerifiedIdentity,
    Path(owner): Path<String>,
) -> Result<Json<TranscriptResponse>, AppError> {
    transcript_for(&state, &user, &UserId::new(owner)).await
}

async fn transcript_for(
    state: &AppState,
    verified: &UserId,
    owner: &UserId,
) -> Result<Json<TranscriptResponse>, AppError> {
    let chats = state.chat.get_transcript(verified, owner).await?;
    Ok(Json(TranscriptResponse {
        message: "OK".to_string(),
        chats,
    }))
}

// ============================================================
// Transcript Clearing
// ============================================================

async fn delete_own_chats(
    State(state): State<AppState>,
    VerifiedIdentity(user): VerifiedIdentity,
) -> Result<Json<OkResponse>, AppError> {
    state.chat.clear_transcript(&user, &user).await?;
    Ok(Json(OkResponse::ok()))
}

async fn delete_user_chats(
    State(state): State<AppState>,
    VerifiedIdentity(user): VerifiedIdentity,
    Path(owner): Path<String>,
) -> Result<Json<OkResponse>, AppError> {
    state
        .chat
        .clear_transcript(&user, &UserId::new(owner))
        .await?;
    Ok(Json(OkResponse::ok()))
}

// ============================================================
// Version
// ============================================================

async fn get_version() -> Json<VersionResponse> {
    Json(VersionResponse {
        version: env!("CARGO_PKG_VERSION"),
    })
}
