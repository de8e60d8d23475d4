//! Lifecycle of one scenario run and cooperative cancellation

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// State machine of a scenario run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    NotStarted,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl RunState {
    /// Move to `next`; only forward transitions are allowed
    pub fn advance(self, next: RunState) -> RunState {
        let allowed = matches!(
            (self, next),
            (RunState::NotStarted, RunState::Running)
                | (RunState::NotStarted, RunState::Cancelled)
                | (RunState::Running, RunState::Completed)
                | (RunState::Running, RunState::Failed)
                | (RunState::Running, RunState::Cancelled)
        );
        debug_assert!(allowed, "illegal run state transition {:?} -> {:?}", self, next);
        if allowed {
            next
        } else {
            self
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Completed | RunState::Failed | RunState::Cancelled)
    }
}

/// Shared flag checked between periods; cancelling drops in-flight results
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_transitions() {
        let state = RunState::NotStarted.advance(RunState::Running);
        assert_eq!(state, RunState::Running);
        assert!(!state.is_terminal());
        let state = state.advance(RunState::Completed);
        assert!(state.is_terminal());
    }

    #[test]
    fn test_token_is_shared_between_clones() {
        let token = CancellationToken::new();
        let seen_by_worker = token.clone();
        assert!(!seen_by_worker.is_cancelled());
        token.cancel();
        assert!(seen_by_worker.is_cancelled());
    }
}
