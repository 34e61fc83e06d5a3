pub mod auth;
pub mod config;
pub mod error;
pub mod middleware;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod session;
pub mod utils;

pub use server::Server;
