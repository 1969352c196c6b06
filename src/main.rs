//! chatline - persisted multi-turn chat over a generative backend
//!
//! A Rust backend that keeps one transcript per user and commits a turn
//! only when the backend produced it.

mod api;
mod auth;
mod chat;
mod db;
mod llm;

use api::{create_router, AppState};
use db::{Database, DbError};
use llm::{CompletionBackend, GeminiBackend, LlmConfig, LoggingBackend};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chatline=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let db_path = std::env::var("CHATLINE_DB_PATH").unwrap_or_else(|_| {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
        format!("{home}/.chatline/chatline.db")
    });

    let port: u16 = std::env::var("CHATLINE_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(5000);

    // Ensure database directory exists
    if let Some(parent) = PathBuf::from(&db_path).parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Initialize database
    tracing::info!(path = %db_path, "Opening database");
    let db = Database::open(&db_path)?;

    if let Ok(name) = std::env::var("CHATLINE_BOOTSTRAP_USER") {
        bootstrap_user(&db, &name)?;
    }

    // Initialize generative backend
    let llm_config = LlmConfig::from_env();
    if !llm_config.is_configured() {
        tracing::warn!("No backend credentials configured. Set GEMINI_API_KEY or LLM_GATEWAY.");
    }
    let gemini: Arc<dyn CompletionBackend> = Arc::new(GeminiBackend::new(&llm_config)?);
    let backend: Arc<dyn CompletionBackend> = Arc::new(LoggingBackend::new(gemini));
    tracing::info!(
        model = %backend.model_id(),
        timeout_secs = llm_config.timeout.as_secs(),
        "Generative backend initialized"
    );

    // Create application state; the outer bound sits just past the client timeout
    let state = AppState::new(db, backend, llm_config.timeout + std::time::Duration::from_secs(5));

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let compression = CompressionLayer::new()
        .gzip(true)
        .br(true)
        .deflate(true)
        .zstd(true);

    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(compression);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("chatline server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the named user on first start and print its token once
fn bootstrap_user(db: &Database, name: &str) -> Result<(), DbError> {
    match db.get_user_by_name(name) {
        Ok(user) => {
            tracing::info!(user_id = %user.id, name = %name, "Bootstrap user already exists");
            Ok(())
        }
        Err(DbError::UserNotFound(_)) => {
            let (user, token) = auth::register_user(db, name)?;
            tracing::warn!(
                user_id = %user.id,
                name = %name,
                token_prefix = %auth::token_prefix(&token),
                "Created bootstrap user; token printed to stderr once"
            );
            eprintln!("Bearer token for {name}: {token}");
            Ok(())
        }
        Err(e) => Err(e),
    }
}
