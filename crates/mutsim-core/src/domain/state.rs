//! Session and loop states.

use serde::{Deserialize, Serialize};

/// Host-side session state.
///
/// State transitions (one `step`):
/// - Idle -> AwaitingResponse -> Delivered -> Idle
/// - Idle -> AwaitingResponse -> TimedOut -> Idle
/// - Idle -> AwaitingResponse -> Malformed -> Idle
/// - Idle -> AwaitingResponse -> Crashed (terminal)
///
/// The resolution states are transient: `step` passes through them and
/// returns with the session back in `Idle`. Only `Crashed` sticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    AwaitingResponse,
    Delivered,
    TimedOut,
    Malformed,
    Crashed,
}

impl SessionState {
    /// No further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Crashed)
    }

    /// Eligible for a new `step`.
    pub fn accepts_step(self) -> bool {
        matches!(
            self,
            SessionState::Idle
                | SessionState::Delivered
                | SessionState::TimedOut
                | SessionState::Malformed
        )
    }
}

/// Agent-side loop state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    ReadingInput,
    Deciding,
    Writing,
    Finished,
}
