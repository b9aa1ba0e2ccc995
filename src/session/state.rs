use serde::{Deserialize, Serialize};

/// Capture session lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
    Idle,
    Acquiring,
    Streaming,
    Captured,
    Error,
}

impl SessionState {
    /// Whether moving from `self` to `next` is a legal transition
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;

        match (self, next) {
            // teardown is valid from anywhere
            (_, Idle) => true,
            (Idle, Acquiring) | (Error, Acquiring) | (Captured, Acquiring) => true,
            (Acquiring, Streaming) | (Acquiring, Error) => true,
            (Streaming, Captured) | (Streaming, Error) => true,
            _ => false,
        }
    }
}
