//! Property-based tests for chat orchestration
//!
//! These tests verify that, for arbitrary histories and messages:
//! - A successful turn grows the transcript by exactly 2 (or 1 on empty reply)
//! - Quota and provider failures never change the stored transcript
//! - Clearing always leaves an empty transcript
//! - Prompt assembly is deterministic

use super::store::DatabaseTranscriptStore;
use super::testing::MockBackend;
use super::{assemble, ChatError, ChatOrchestrator};
use crate::auth::UserId;
use crate::db::{Database, Message, Role};
use crate::llm::{CompletionOutcome, RetryDelay};
use proptest::prelude::*;
use std::sync::Arc;

// ============================================================================
// Strategies
// ============================================================================

fn arb_role() -> impl Strategy<Value = Role> {
    prop_oneof![Just(Role::User), Just(Role::Assistant)]
}

fn arb_message() -> impl Strategy<Value = Message> {
    (arb_role(), "[a-zA-Z0-9 _.!?,\n]{0,60}")
        .prop_map(|(role, content)| Message { role, content })
}

fn arb_history() -> impl Strategy<Value = Vec<Message>> {
    prop::collection::vec(arb_message(), 0..12)
}

/// Non-blank user input
fn arb_content() -> impl Strategy<Value = String> {
    "[ ]{0,3}[a-zA-Z0-9_.!?,]{1,40}[ \n]{0,3}"
}

fn arb_failure() -> impl Strategy<Value = CompletionOutcome> {
    prop_oneof![
        prop::option::of("[0-9]{1,3}s").prop_map(|delay| CompletionOutcome::QuotaExceeded {
            retry_after: delay.map(RetryDelay::new),
        }),
        "[a-zA-Z ]{1,30}".prop_map(|cause| CompletionOutcome::ProviderError { cause }),
    ]
}

// ============================================================================
// Harness
// ============================================================================

struct Harness {
    db: Database,
    backend: Arc<MockBackend>,
    orchestrator: ChatOrchestrator<DatabaseTranscriptStore, Arc<MockBackend>>,
    user: UserId,
}

fn harness(history: &[Message]) -> Harness {
    let db = Database::open_in_memory().unwrap();
    db.create_user("alice", "alice", "alice-hash").unwrap();
    db.replace_transcript("alice", history, 0).unwrap();
    let backend = Arc::new(MockBackend::new());
    let orchestrator =
        ChatOrchestrator::new(DatabaseTranscriptStore::new(db.clone()), backend.clone());
    Harness {
        db,
        backend,
        orchestrator,
        user: UserId::new("alice"),
    }
}

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(future)
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn success_appends_user_then_reply_verbatim(
        history in arb_history(),
        content in arb_content(),
        reply in "[a-zA-Z0-9 .!?]{0,40}",
    ) {
        let h = harness(&history);
        h.backend.queue_reply(reply.clone());

        let chats = block_on(h.orchestrator.send_message(&h.user, &content)).unwrap();
        let stored = h.db.get_transcript("alice").unwrap().messages;

        let expected_growth = if reply.is_empty() { 1 } else { 2 };
        prop_assert_eq!(stored.len(), history.len() + expected_growth);
        prop_assert_eq!(&stored[..history.len()], &history[..]);
        prop_assert_eq!(&stored[history.len()], &Message::user(content));
        if !reply.is_empty() {
            prop_assert_eq!(&stored[history.len() + 1], &Message::assistant(reply));
        }
        prop_assert_eq!(chats, stored);
    }

    #[test]
    fn failures_never_change_stored_transcript(
        history in arb_history(),
        content in arb_content(),
        failure in arb_failure(),
    ) {
        let h = harness(&history);
        h.backend.queue(failure.clone());
        let before = h.db.get_transcript("alice").unwrap();

        let err = block_on(h.orchestrator.send_message(&h.user, &content)).unwrap_err();
        let after = h.db.get_transcript("alice").unwrap();

        prop_assert_eq!(after, before);
        match failure {
            CompletionOutcome::QuotaExceeded { retry_after } => {
                prop_assert_eq!(err, ChatError::QuotaExceeded { retry_after });
            }
            CompletionOutcome::ProviderError { cause } => {
                prop_assert_eq!(err, ChatError::ProviderError { cause });
            }
            CompletionOutcome::Success(_) => unreachable!(),
        }
    }

    #[test]
    fn clear_always_empties(history in arb_history()) {
        let h = harness(&history);

        block_on(h.orchestrator.clear_transcript(&h.user, &h.user)).unwrap();

        let chats = block_on(h.orchestrator.get_transcript(&h.user, &h.user)).unwrap();
        prop_assert!(chats.is_empty());
    }

    #[test]
    fn assemble_is_deterministic(history in arb_history(), pending in arb_message()) {
        let first = assemble(&history, &pending);
        prop_assert_eq!(&first, &assemble(&history.clone(), &pending.clone()));
        let segments = history_lines(&history)
            + pending.content.split('\n').count()
            + usize::from(history.is_empty());
        prop_assert_eq!(first.split('\n').count(), segments);
    }
}

/// Line count contributed by rendered history
fn history_lines(history: &[Message]) -> usize {
    history.iter().map(|m| m.content.split('\n').count()).sum()
}
