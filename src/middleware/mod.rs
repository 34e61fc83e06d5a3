//! Server middleware
//!
//! Provides logging and connection limiting.

pub mod connection_limit;
pub mod logging;

pub use connection_limit::ConnectionLimiter;
