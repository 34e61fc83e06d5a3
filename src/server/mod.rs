//! Server core functionality
//!
//! The accept loop, per-connection task accounting and graceful shutdown.

pub mod core;

pub use self::core::Server;
