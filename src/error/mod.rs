//! Error handling
//!
//! Defines error types and handling for the chat relay.

pub mod handlers;
pub mod types;

pub use handlers::{error_reply, log_session_error};
pub use types::*;
