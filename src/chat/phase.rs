//! Phases of a single send-message attempt

use super::ChatError;
use crate::auth::UserId;
use std::fmt;
use std::time::Instant;

/// Where a send attempt is. `Committed` and `Rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendPhase {
    Idle,
    Assembling,
    AwaitingBackend,
    Completing,
    Committed,
    Rejected,
}

impl SendPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Committed | Self::Rejected)
    }

    /// Forward-only transitions; any live phase may be rejected
    pub fn can_advance_to(self, next: SendPhase) -> bool {
        match (self, next) {
            (from, Self::Rejected) => !from.is_terminal(),
            (Self::Idle, Self::Assembling)
            | (Self::Assembling, Self::AwaitingBackend)
            | (Self::AwaitingBackend, Self::Completing)
            | (Self::Completing, Self::Committed) => true,
            _ => false,
        }
    }
}

impl fmt::Display for SendPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Assembling => "assembling",
            Self::AwaitingBackend => "awaiting_backend",
            Self::Completing => "completing",
            Self::Committed => "committed",
            Self::Rejected => "rejected",
        };
        f.write_str(name)
    }
}

/// Tracks one attempt through its phases and logs the terminal result
pub struct SendAttempt<'a> {
    user: &'a UserId,
    phase: SendPhase,
    started: Instant,
}

impl<'a> SendAttempt<'a> {
    pub fn new(user: &'a UserId) -> Self {
        Self {
            user,
            phase: SendPhase::Idle,
            started: Instant::now(),
        }
    }

    pub fn phase(&self) -> SendPhase {
        self.phase
    }

    pub fn advance(&mut self, next: SendPhase) {
        debug_assert!(
            self.phase.can_advance_to(next),
            "invalid send transition {} -> {}",
            self.phase,
            next
        );
        tracing::debug!(user_id = %self.user, from = %self.phase, to = %next, "Send phase");
        self.phase = next;
        if next == SendPhase::Committed {
            tracing::info!(
                user_id = %self.user,
                duration_ms = %self.started.elapsed().as_millis(),
                "Chat turn committed"
            );
        }
    }

    pub fn reject(&mut self, error: &ChatError) {
        let failed_in = self.phase;
        self.advance(SendPhase::Rejected);
        tracing::warn!(
            user_id = %self.user,
            phase = %failed_in,
            outcome = error.kind(),
            error = %error,
            duration_ms = %self.started.elapsed().as_millis(),
            "Chat turn rejected"
        );
    }
}
