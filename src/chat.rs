//! Chat-completion orchestration
//!
//! Turns a user's message into a committed transcript turn.

mod error;
mod orchestrator;
mod phase;
mod prompt;
mod store;

#[cfg(test)]
mod proptests;
#[cfg(test)]
pub mod testing;

pub use error::ChatError;
pub use orchestrator::ChatOrchestrator;
pub use prompt::assemble;
pub use store::DatabaseTranscriptStore;

use crate::llm::CompletionBackend;
use std::sync::Arc;

/// Orchestrator wired to SQLite and a type-erased backend
pub type ProductionOrchestrator =
    ChatOrchestrator<DatabaseTranscriptStore, Arc<dyn CompletionBackend>>;
