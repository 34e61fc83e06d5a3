//! Session lifecycle states
//!
//! Defines the states one connection moves through and which moves are legal.

use std::fmt;

use crate::error::SessionError;

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Authenticating,
    Authenticated,
    MessageLoop,
    Closed,
}

impl SessionState {
    /// Returns whether `next` may follow `self`.
    ///
    /// Any non-terminal state may drop to `Closed`; otherwise states only
    /// move forward one step.
    pub fn can_advance_to(self, next: SessionState) -> bool {
        use SessionState::*;

        matches!(
            (self, next),
            (Connecting, Authenticating)
                | (Authenticating, Authenticated)
                | (Authenticated, MessageLoop)
                | (Connecting | Authenticating | Authenticated | MessageLoop, Closed)
        )
    }

    pub fn advance(&mut self, next: SessionState) -> Result<(), SessionError> {
        if !self.can_advance_to(next) {
            return Err(SessionError::InvalidTransition {
                from: *self,
                to: next,
            });
        }
        *self = next;
        Ok(())
    }

    pub fn is_closed(self) -> bool {
        self == SessionState::Closed
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Connecting => "connecting",
            SessionState::Authenticating => "authenticating",
            SessionState::Authenticated => "authenticated",
            SessionState::MessageLoop => "message-loop",
            SessionState::Closed => "closed",
        };
        f.write_str(name)
    }
}
