//! Error types
//!
//! Defines domain-specific error types for each module of the chat relay.

use std::fmt;
use std::io;

use tokio_tungstenite::tungstenite;

use crate::registry::ConnectionId;
use crate::session::SessionState;

/// Authentication wiring errors
#[derive(Debug)]
pub enum AuthError {
    /// The always-accept authenticator was requested outside development mode.
    InsecureMode(String),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::InsecureMode(msg) => write!(f, "Insecure authentication mode: {}", msg),
        }
    }
}

impl std::error::Error for AuthError {}

/// Connection registry errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    AlreadyRegistered(ConnectionId),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::AlreadyRegistered(conn) => {
                write!(f, "Connection already registered: {}", conn)
            }
        }
    }
}

impl std::error::Error for RegistryError {}

/// Errors that end a single session
#[derive(Debug)]
pub enum SessionError {
    /// The WebSocket handshake did not complete.
    Upgrade(tungstenite::Error),
    /// The handshake did not complete within the configured timeout.
    UpgradeTimeout,
    /// A payload could not be parsed into the expected structure.
    MalformedMessage(String),
    /// Credentials were rejected for the given username.
    AuthFailed(String),
    /// No credentials arrived within the configured timeout.
    AuthTimeout,
    /// All connection slots are in use.
    CapacityExceeded,
    /// The peer went away.
    Disconnected,
    /// The server is shutting down.
    Shutdown,
    Registry(RegistryError),
    Transport(tungstenite::Error),
    Encode(serde_json::Error),
    InvalidTransition {
        from: SessionState,
        to: SessionState,
    },
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Upgrade(e) => write!(f, "WebSocket upgrade failed: {}", e),
            SessionError::UpgradeTimeout => write!(f, "WebSocket upgrade timed out"),
            SessionError::MalformedMessage(msg) => write!(f, "Malformed message: {}", msg),
            SessionError::AuthFailed(user) => write!(f, "Authentication failed for user: {}", user),
            SessionError::AuthTimeout => write!(f, "Timed out waiting for credentials"),
            SessionError::CapacityExceeded => write!(f, "Too many connections"),
            SessionError::Disconnected => write!(f, "Peer disconnected"),
            SessionError::Shutdown => write!(f, "Server shutting down"),
            SessionError::Registry(e) => write!(f, "Registry error: {}", e),
            SessionError::Transport(e) => write!(f, "Transport error: {}", e),
            SessionError::Encode(e) => write!(f, "Failed to encode message: {}", e),
            SessionError::InvalidTransition { from, to } => {
                write!(f, "Invalid session transition: {} -> {}", from, to)
            }
        }
    }
}

impl std::error::Error for SessionError {}

impl From<RegistryError> for SessionError {
    fn from(error: RegistryError) -> Self {
        SessionError::Registry(error)
    }
}

impl From<tungstenite::Error> for SessionError {
    fn from(error: tungstenite::Error) -> Self {
        SessionError::Transport(error)
    }
}

impl From<serde_json::Error> for SessionError {
    fn from(error: serde_json::Error) -> Self {
        SessionError::Encode(error)
    }
}

/// General server error that encompasses startup failures
#[derive(Debug)]
pub enum ChatServerError {
    Config(config::ConfigError),
    Auth(AuthError),
    Bind { addr: String, source: io::Error },
    Io(io::Error),
}

impl fmt::Display for ChatServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatServerError::Config(e) => write!(f, "Configuration error: {}", e),
            ChatServerError::Auth(e) => write!(f, "Authentication error: {}", e),
            ChatServerError::Bind { addr, source } => {
                write!(f, "Failed to bind to {}: {}", addr, source)
            }
            ChatServerError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for ChatServerError {}

impl From<config::ConfigError> for ChatServerError {
    fn from(error: config::ConfigError) -> Self {
        ChatServerError::Config(error)
    }
}

impl From<AuthError> for ChatServerError {
    fn from(error: AuthError) -> Self {
        ChatServerError::Auth(error)
    }
}

impl From<io::Error> for ChatServerError {
    fn from(error: io::Error) -> Self {
        ChatServerError::Io(error)
    }
}
