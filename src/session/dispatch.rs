//! Inbound message dispatch
//!
//! Where the message loop hands off each parsed message. The relay itself
//! attaches no chat semantics; the default dispatcher only logs.

use crate::middleware::logging::log_inbound;
use crate::protocol::InboundMessage;
use crate::registry::{ConnectionId, Identity};

pub trait MessageDispatcher: Send + Sync {
    fn dispatch(&self, conn: ConnectionId, identity: &Identity, message: InboundMessage);
}

/// Logs every message and does nothing else.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingDispatcher;

impl MessageDispatcher for LoggingDispatcher {
    fn dispatch(&self, conn: ConnectionId, identity: &Identity, message: InboundMessage) {
        log_inbound(conn, identity, &message);
    }
}
