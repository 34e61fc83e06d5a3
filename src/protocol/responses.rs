//! Server responses
//!
//! Structured messages the server sends to clients.

use serde::{Deserialize, Serialize};
use tokio_tungstenite::tungstenite::Message;

pub const WELCOME: &str = "Welcome to the chat!";
pub const AUTH_FAILED: &str = "Authentication failed";
pub const TOO_MANY_CONNECTIONS: &str = "Too many connections";

/// A server-to-client message.
///
/// Serialized without a tag, so a welcome is `{"message": ...}` and an error
/// is `{"error": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServerMessage {
    Welcome { message: String },
    Error { error: String },
}

impl ServerMessage {
    pub fn welcome() -> Self {
        ServerMessage::Welcome {
            message: WELCOME.to_string(),
        }
    }

    pub fn auth_failed() -> Self {
        ServerMessage::Error {
            error: AUTH_FAILED.to_string(),
        }
    }

    pub fn too_many_connections() -> Self {
        ServerMessage::Error {
            error: TOO_MANY_CONNECTIONS.to_string(),
        }
    }

    /// Encode as a JSON text frame.
    pub fn to_frame(&self) -> Result<Message, serde_json::Error> {
        Ok(Message::text(serde_json::to_string(self)?))
    }
}
