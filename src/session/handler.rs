use log::{debug, error, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::OwnedSemaphorePermit;
use tokio::time::Instant;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_util::sync::CancellationToken;

use crate::auth::{Authenticator, Credentials};
use crate::config::StartupConfig;
use crate::error::{SessionError, error_reply, log_session_error};
use crate::protocol::{Decoded, ServerMessage, decode_frame};
use crate::registry::{ConnectionId, ConnectionRegistry};
use crate::session::dispatch::MessageDispatcher;
use crate::session::message_loop::{LoopExit, MessageLoop};
use crate::session::state::SessionState;

/// Shared collaborators every session needs.
pub struct SessionContext {
    pub registry: Arc<ConnectionRegistry>,
    pub authenticator: Arc<dyn Authenticator>,
    pub dispatcher: Arc<dyn MessageDispatcher>,
    pub config: Arc<StartupConfig>,
    pub shutdown: CancellationToken,
}

/// Drives one connection from upgrade to close.
///
/// - Upgrades the stream on the configured path.
/// - Reads and checks the credentials message.
/// - Registers the connection, sends the welcome and runs the message loop
///   on its own task.
/// - Unregisters on every exit path once the connection has registered.
///
/// `permit` is the connection slot; `None` means the server is full and the
/// client is told so right after the upgrade.
pub async fn handle_session<S>(
    stream: S,
    peer: SocketAddr,
    permit: Option<OwnedSemaphorePermit>,
    ctx: Arc<SessionContext>,
) where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let conn = ConnectionId::next();
    let mut state = SessionState::Connecting;

    if let Err(err) = run_session(stream, conn, peer, permit, &ctx, &mut state).await {
        let failed_in = close_after_error(&mut state);
        log_session_error(conn, &err);
        if ctx.registry.unregister(conn).await.is_some() {
            debug!("Removed {} from registry after error in state {}", conn, failed_in);
        }
    }
}

/// Moves a failed session to `Closed` and returns the state it failed in.
fn close_after_error(state: &mut SessionState) -> SessionState {
    let failed_in = *state;
    if !state.is_closed() {
        *state = SessionState::Closed;
    }
    failed_in
}

async fn run_session<S>(
    stream: S,
    conn: ConnectionId,
    peer: SocketAddr,
    permit: Option<OwnedSemaphorePermit>,
    ctx: &SessionContext,
    state: &mut SessionState,
) -> Result<(), SessionError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let ws = upgrade(stream, &ctx.config, &ctx.shutdown).await?;
    debug!("Upgraded {} from {}", conn, peer);
    let (mut sink, mut source) = ws.split();

    let Some(_permit) = permit else {
        return Err(reject(&mut sink, SessionError::CapacityExceeded).await);
    };

    state.advance(SessionState::Authenticating)?;
    let credentials =
        match read_credentials(&mut source, ctx.config.auth_timeout(), &ctx.shutdown).await {
            Ok(credentials) => credentials,
            Err(e) => return Err(reject(&mut sink, e).await),
        };

    if !ctx
        .authenticator
        .authenticate(credentials.username(), credentials.password())
    {
        let username = credentials.username().to_string();
        return Err(reject(&mut sink, SessionError::AuthFailed(username)).await);
    }
    let identity = credentials.into_identity();

    let welcome = ServerMessage::welcome().to_frame()?;
    let total = ctx.registry.register(conn, identity.clone()).await?;
    state.advance(SessionState::Authenticated)?;
    info!(
        "User '{}' authenticated on {} from {}. Total users: {}",
        identity, conn, peer, total
    );

    sink.send(welcome).await?;

    state.advance(SessionState::MessageLoop)?;
    let message_loop = MessageLoop {
        conn,
        identity: identity.clone(),
        dispatcher: Arc::clone(&ctx.dispatcher),
        idle_timeout: ctx.config.idle_timeout(),
        shutdown: ctx.shutdown.clone(),
    };

    let exit = match tokio::spawn(message_loop.run(source)).await {
        Ok(exit) => exit,
        Err(e) => {
            error!("Message loop for {} failed: {}", conn, e);
            LoopExit::Aborted
        }
    };

    ctx.registry.unregister(conn).await;
    let remaining = ctx.registry.count().await;
    if exit.is_graceful() {
        info!(
            "User '{}' disconnected ({}). Total users: {}",
            identity, exit, remaining
        );
    } else {
        warn!(
            "User '{}' dropped on {} ({}). Total users: {}",
            identity, conn, exit, remaining
        );
    }

    state.advance(SessionState::Closed)?;
    release(&mut sink, conn, &exit).await;
    Ok(())
}

/// Closes the write half after the loop ends, unless the transport is already gone.
async fn release<Si>(sink: &mut Si, conn: ConnectionId, exit: &LoopExit)
where
    Si: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    if !exit.transport_alive() {
        debug!("Dropping {} without close handshake ({})", conn, exit);
        return;
    }
    if let Err(e) = sink.close().await {
        debug!("Closing {} after loop exit: {}", conn, e);
    }
}

/// Performs the WebSocket handshake, refusing any path but the configured one.
async fn upgrade<S>(
    stream: S,
    config: &StartupConfig,
    shutdown: &CancellationToken,
) -> Result<WebSocketStream<S>, SessionError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let ws_path = config.ws_path.clone();
    let callback = move |request: &Request, response: Response| {
        if request.uri().path() == ws_path {
            Ok(response)
        } else {
            let mut rejection = ErrorResponse::new(Some("Not Found".to_string()));
            *rejection.status_mut() = StatusCode::NOT_FOUND;
            Err(rejection)
        }
    };
    let mut ws_config = WebSocketConfig::default();
    ws_config.max_message_size = Some(config.max_message_size);
    ws_config.max_frame_size = Some(config.max_message_size);

    let handshake = tokio_tungstenite::accept_hdr_async_with_config(stream, callback, Some(ws_config));

    tokio::select! {
        _ = shutdown.cancelled() => Err(SessionError::Shutdown),
        result = tokio::time::timeout(config.auth_timeout(), handshake) => match result {
            Ok(Ok(ws)) => Ok(ws),
            Ok(Err(e)) => Err(SessionError::Upgrade(e)),
            Err(_) => Err(SessionError::UpgradeTimeout),
        },
    }
}

/// Reads the single credentials message that opens every session.
///
/// Control frames are skipped; anything else that is not valid credentials
/// ends the session.
pub(crate) async fn read_credentials<St>(
    source: &mut St,
    timeout: Duration,
    shutdown: &CancellationToken,
) -> Result<Credentials, SessionError>
where
    St: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    let deadline = Instant::now() + timeout;

    loop {
        let next = tokio::select! {
            biased;
            _ = shutdown.cancelled() => return Err(SessionError::Shutdown),
            next = tokio::time::timeout_at(deadline, source.next()) => {
                next.map_err(|_| SessionError::AuthTimeout)?
            }
        };

        let frame = match next {
            Some(frame) => frame?,
            None => return Err(SessionError::Disconnected),
        };

        match decode_frame::<Credentials>(frame)? {
            Decoded::Payload(credentials) => return Ok(credentials),
            Decoded::Control => continue,
            Decoded::Close => return Err(SessionError::Disconnected),
        }
    }
}

/// Sends the error reply for `err`, if it has one, closes the sink and hands `err` back.
async fn reject<Si>(sink: &mut Si, err: SessionError) -> SessionError
where
    Si: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    if let Some(reply) = error_reply(&err) {
        match reply.to_frame() {
            Ok(frame) => {
                if let Err(e) = sink.send(frame).await {
                    debug!("Failed to send error reply: {}", e);
                }
            }
            Err(e) => warn!("Failed to encode error reply: {}", e),
        }
    }

    if let Err(e) = sink.close().await {
        debug!("Failed to close rejected connection: {}", e);
    }
    err
}
