//! Logging middleware
//!
//! Log lines shared by the accept loop and the message dispatcher.

use std::net::SocketAddr;

use log::info;

use crate::protocol::InboundMessage;
use crate::registry::{ConnectionId, Identity};

/// Log an accepted TCP connection
pub fn log_connection(peer: &SocketAddr) {
    info!("Client connected: {}", peer);
}

/// Log a message received from an authenticated user
pub fn log_inbound(conn: ConnectionId, identity: &Identity, message: &InboundMessage) {
    info!(
        "User '{}' sent a message on {}: {}",
        identity,
        conn,
        serde_json::to_string(message).unwrap_or_default()
    );
}
