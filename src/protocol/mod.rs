//! Chat wire protocol
//!
//! JSON messages carried over WebSocket frames.

pub mod parser;
pub mod responses;

pub use parser::{Decoded, InboundMessage, decode_frame};
pub use responses::ServerMessage;
