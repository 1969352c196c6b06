//! HTTP API for chatline

mod error;
mod handlers;
mod identity;
mod types;

pub use handlers::create_router;

use crate::chat::{DatabaseTranscriptStore, ProductionOrchestrator};
use crate::db::Database;
use crate::llm::CompletionBackend;
use std::sync::Arc;
use std::time::Duration;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub chat: Arc<ProductionOrchestrator>,
}

impl AppState {
    pub fn new(
        db: Database,
        backend: Arc<dyn CompletionBackend>,
        backend_timeout: Duration,
    ) -> Self {
        let chat = ProductionOrchestrator::new(DatabaseTranscriptStore::new(db.clone()), backend)
            .with_backend_timeout(backend_timeout);
        Self {
            db,
            chat: Arc::new(chat),
        }
    }
}
