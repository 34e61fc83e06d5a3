//! Error handlers
//!
//! Maps session errors to client replies and log levels.

use log::{debug, info, warn};

use crate::error::types::SessionError;
use crate::protocol::ServerMessage;
use crate::registry::ConnectionId;

/// Log a session error at a level matching its severity.
///
/// Disconnects are the normal way a session ends and only show up at `debug`.
pub fn log_session_error(conn: ConnectionId, err: &SessionError) {
    match err {
        SessionError::Disconnected | SessionError::Shutdown => {
            debug!("Session {} closed: {}", conn, err);
        }
        SessionError::AuthFailed(username) => {
            info!("User '{}' failed to authenticate on {}", username, conn);
        }
        SessionError::CapacityExceeded => {
            info!("Session {} refused: {}", conn, err);
        }
        _ => warn!("Session {} ended: {}", conn, err),
    }
}

/// Convert an error to the structured reply the client receives before close, if any.
pub fn error_reply(err: &SessionError) -> Option<ServerMessage> {
    match err {
        SessionError::AuthFailed(_) => Some(ServerMessage::auth_failed()),
        SessionError::CapacityExceeded => Some(ServerMessage::too_many_connections()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_failure_gets_error_reply() {
        let reply = error_reply(&SessionError::AuthFailed("bob".into()));
        assert_eq!(reply, Some(ServerMessage::auth_failed()));
    }

    #[test]
    fn capacity_gets_error_reply() {
        let reply = error_reply(&SessionError::CapacityExceeded);
        assert_eq!(reply, Some(ServerMessage::too_many_connections()));
    }

    #[test]
    fn malformed_and_disconnect_close_silently() {
        assert!(error_reply(&SessionError::MalformedMessage("eof".into())).is_none());
        assert!(error_reply(&SessionError::Disconnected).is_none());
        assert!(error_reply(&SessionError::AuthTimeout).is_none());
    }
}
