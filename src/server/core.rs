use log::{error, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::auth::{Authenticator, build_authenticator};
use crate::config::{ServerConfig, StartupConfig};
use crate::error::ChatServerError;
use crate::middleware::ConnectionLimiter;
use crate::middleware::logging::log_connection;
use crate::registry::ConnectionRegistry;
use crate::session::{LoggingDispatcher, MessageDispatcher, SessionContext, handle_session};

/// Pause after a failed `accept` so a persistent error (e.g. EMFILE) does not spin.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
    context: Arc<SessionContext>,
    limiter: ConnectionLimiter,
    tracker: TaskTracker,
    shutdown: CancellationToken,
}

impl Server {
    /// Binds the listener with the authenticator selected by `config`.
    pub async fn bind(config: ServerConfig) -> Result<Self, ChatServerError> {
        let authenticator = build_authenticator(&config)?;
        Self::bind_with(config.server, authenticator, Arc::new(LoggingDispatcher)).await
    }

    /// Binds the listener with explicit collaborators.
    pub async fn bind_with(
        config: StartupConfig,
        authenticator: Arc<dyn Authenticator>,
        dispatcher: Arc<dyn MessageDispatcher>,
    ) -> Result<Self, ChatServerError> {
        let addr = config.listen_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ChatServerError::Bind {
                addr: addr.clone(),
                source,
            })?;
        let local_addr = listener.local_addr()?;
        info!("Server bound to {}", local_addr);

        let shutdown = CancellationToken::new();
        let limiter = ConnectionLimiter::new(config.max_connections);
        let context = Arc::new(SessionContext {
            registry: Arc::new(ConnectionRegistry::new()),
            authenticator,
            dispatcher,
            config: Arc::new(config),
            shutdown: shutdown.clone(),
        });

        Ok(Self {
            listener,
            local_addr,
            context,
            limiter,
            tracker: TaskTracker::new(),
            shutdown,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn registry(&self) -> Arc<ConnectionRegistry> {
        Arc::clone(&self.context.registry)
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Number of session tasks still running, including ones not yet authenticated.
    pub fn active_sessions(&self) -> usize {
        self.tracker.len()
    }

    /// Accepts connections until shutdown is requested.
    pub async fn run(&self) {
        info!(
            "Starting chat relay on ws://{}{} (max {} connections)",
            self.local_addr,
            self.context.config.ws_path,
            self.limiter.max_connections()
        );

        loop {
            let accepted = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                accepted = self.listener.accept() => accepted,
            };

            match accepted {
                Ok((stream, peer)) => {
                    log_connection(&peer);
                    if let Err(e) = stream.set_nodelay(true) {
                        warn!("Failed to set TCP_NODELAY for {}: {}", peer, e);
                    }

                    let permit = self.limiter.try_acquire();
                    if permit.is_none() {
                        warn!(
                            "Connection limit reached ({}/{}), refusing {}",
                            self.limiter.in_use(),
                            self.limiter.max_connections(),
                            peer
                        );
                    }

                    // Each session runs on its own task so the accept loop never blocks
                    let context = Arc::clone(&self.context);
                    self.tracker
                        .spawn(handle_session(stream, peer, permit, context));
                }
                Err(e) => {
                    error!("Error accepting connection: {}", e);
                    if !pause_after_accept_error(&self.shutdown).await {
                        break;
                    }
                }
            }
        }

        info!("Accept loop stopped on {}", self.local_addr);
    }

    /// Stops accepting, ends every session and waits for their tasks.
    pub async fn shutdown(&self) {
        info!(
            "Shutting down; {} active sessions, {} users",
            self.tracker.len(),
            self.context.registry.count().await
        );
        self.shutdown.cancel();
        self.tracker.close();
        self.tracker.wait().await;
        info!("All sessions closed");
    }
}

/// Waits out `ACCEPT_BACKOFF`; returns false if shutdown arrived first.
async fn pause_after_accept_error(shutdown: &CancellationToken) -> bool {
    tokio::select! {
        _ = shutdown.cancelled() => false,
        _ = tokio::time::sleep(ACCEPT_BACKOFF) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[tokio::test]
    async fn accept_error_backs_off() {
        let started = Instant::now();
        assert!(pause_after_accept_error(&CancellationToken::new()).await);
        assert!(started.elapsed() >= ACCEPT_BACKOFF);
    }

    #[tokio::test]
    async fn shutdown_cuts_backoff_short() {
        let token = CancellationToken::new();
        token.cancel();
        let started = Instant::now();
        assert!(!pause_after_accept_error(&token).await);
        assert!(started.elapsed() < ACCEPT_BACKOFF);
    }
}
