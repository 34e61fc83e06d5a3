//! Chat relay - Entry Point
//!
//! A WebSocket chat relay that authenticates clients and tracks who is connected.

use log::{error, info};

use chat_relay::Server;
use chat_relay::config::ServerConfig;
use chat_relay::error::ChatServerError;
use chat_relay::utils::setup_logging;

#[tokio::main]
async fn main() {
    // Initialize the logger (env_logger picks up RUST_LOG environment variable)
    setup_logging();

    info!("Launching chat relay...");

    if let Err(e) = run().await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), ChatServerError> {
    let config = ServerConfig::load()?;
    let server = Server::bind(config).await?;

    tokio::select! {
        _ = server.run() => {}
        signal = tokio::signal::ctrl_c() => {
            match signal {
                Ok(()) => info!("Received Ctrl-C"),
                Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
            }
        }
    }

    server.shutdown().await;
    Ok(())
}
