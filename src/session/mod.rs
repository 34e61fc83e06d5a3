//! Session management
//!
//! Handles the lifecycle of one connection: upgrade, authentication,
//! registration, the message loop and cleanup.

pub mod dispatch;
pub mod handler;
pub mod message_loop;
pub mod state;

pub use dispatch::{LoggingDispatcher, MessageDispatcher};
pub use handler::{SessionContext, handle_session};
pub use message_loop::{LoopExit, MessageLoop};
pub use state::SessionState;
