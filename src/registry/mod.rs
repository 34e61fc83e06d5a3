//! Connection registry
//!
//! Shared record of which connections are authenticated, and by whom.

pub mod connection;
pub mod core;

pub use connection::{ConnectionId, Identity};
pub use self::core::ConnectionRegistry;
