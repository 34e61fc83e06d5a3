//! Per-connection message loop
//!
//! Reads one message at a time and hands it to the dispatcher until a read
//! fails. Every read failure counts as a disconnect; the exit reason is only
//! reported so it can be logged.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{Stream, StreamExt};
use log::{debug, trace};
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_util::sync::CancellationToken;

use crate::protocol::{Decoded, InboundMessage, decode_frame};
use crate::registry::{ConnectionId, Identity};
use crate::session::dispatch::MessageDispatcher;

/// Why a message loop stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopExit {
    /// Close frame or end of stream.
    PeerClosed,
    ReadError(String),
    Malformed(String),
    IdleTimeout,
    Shutdown,
    /// The loop task panicked or was cancelled.
    Aborted,
}

impl LoopExit {
    /// Graceful exits are the ones the peer or the server asked for.
    pub fn is_graceful(&self) -> bool {
        matches!(self, LoopExit::PeerClosed | LoopExit::Shutdown)
    }

    /// Whether the write half can still take a close frame.
    pub fn transport_alive(&self) -> bool {
        !matches!(self, LoopExit::ReadError(_) | LoopExit::Aborted)
    }
}

impl fmt::Display for LoopExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoopExit::PeerClosed => write!(f, "closed by peer"),
            LoopExit::ReadError(e) => write!(f, "read error: {}", e),
            LoopExit::Malformed(e) => write!(f, "malformed message: {}", e),
            LoopExit::IdleTimeout => write!(f, "idle timeout"),
            LoopExit::Shutdown => write!(f, "server shutdown"),
            LoopExit::Aborted => write!(f, "loop aborted"),
        }
    }
}

/// Everything the loop needs besides the read half of the connection.
pub struct MessageLoop {
    pub conn: ConnectionId,
    pub identity: Identity,
    pub dispatcher: Arc<dyn MessageDispatcher>,
    pub idle_timeout: Option<Duration>,
    pub shutdown: CancellationToken,
}

impl MessageLoop {
    /// Runs until the first read failure and reports why it stopped.
    pub async fn run<St>(self, mut source: St) -> LoopExit
    where
        St: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
    {
        debug!("Message loop started for '{}' on {}", self.identity, self.conn);

        loop {
            let next = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => return LoopExit::Shutdown,
                next = read_next(&mut source, self.idle_timeout) => next,
            };

            let frame = match next {
                Ok(Some(Ok(frame))) => frame,
                Ok(Some(Err(e))) => return LoopExit::ReadError(e.to_string()),
                Ok(None) => return LoopExit::PeerClosed,
                Err(_elapsed) => return LoopExit::IdleTimeout,
            };

            match decode_frame::<InboundMessage>(frame) {
                Ok(Decoded::Payload(message)) => {
                    self.dispatcher.dispatch(self.conn, &self.identity, message);
                }
                Ok(Decoded::Control) => trace!("Control frame on {}", self.conn),
                Ok(Decoded::Close) => return LoopExit::PeerClosed,
                Err(e) => return LoopExit::Malformed(e.to_string()),
            }
        }
    }
}

async fn read_next<St>(
    source: &mut St,
    idle_timeout: Option<Duration>,
) -> Result<Option<St::Item>, tokio::time::error::Elapsed>
where
    St: Stream + Unpin,
{
    match idle_timeout {
        Some(idle) => tokio::time::timeout(idle, source.next()).await,
        None => Ok(source.next().await),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::dispatch::LoggingDispatcher;
    use futures_util::stream;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<(ConnectionId, String, InboundMessage)>>,
    }

    impl MessageDispatcher for Recorder {
        fn dispatch(&self, conn: ConnectionId, identity: &Identity, message: InboundMessage) {
            self.seen
                .lock()
                .unwrap()
                .push((conn, identity.username().to_string(), message));
        }
    }

    fn message_loop(dispatcher: Arc<dyn MessageDispatcher>) -> MessageLoop {
        MessageLoop {
            conn: ConnectionId::next(),
            identity: Identity::new("alice"),
            dispatcher,
            idle_timeout: None,
            shutdown: CancellationToken::new(),
        }
    }

    #[tokio::test]
    async fn dispatches_until_stream_ends() {
        let recorder = Arc::new(Recorder::default());
        let ml = message_loop(recorder.clone());
        let conn = ml.conn;

        let frames = stream::iter(vec![
            Ok(Message::text(r#"{"text":"hello"}"#)),
            Ok(Message::Ping(Vec::<u8>::new().into())),
            Ok(Message::binary(br#"{"text":"again"}"#.to_vec())),
        ]);

        assert_eq!(ml.run(frames).await, LoopExit::PeerClosed);

        let seen = recorder.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].0, conn);
        assert_eq!(seen[0].1, "alice");
        assert_eq!(seen[0].2.get("text"), Some(&json!("hello")));
        assert_eq!(seen[1].2.get("text"), Some(&json!("again")));
    }

    #[tokio::test]
    async fn close_frame_ends_loop() {
        let recorder = Arc::new(Recorder::default());
        let frames = stream::iter(vec![
            Ok(Message::Close(None)),
            Ok(Message::text(r#"{"never":"seen"}"#)),
        ]);

        let exit = message_loop(recorder.clone()).run(frames).await;

        assert_eq!(exit, LoopExit::PeerClosed);
        assert!(exit.is_graceful());
        assert!(recorder.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_payload_ends_loop() {
        let recorder = Arc::new(Recorder::default());
        let frames = stream::iter(vec![
            Ok(Message::text(r#"{"ok":true}"#)),
            Ok(Message::text("garbage")),
            Ok(Message::text(r#"{"never":"seen"}"#)),
        ]);

        let exit = message_loop(recorder.clone()).run(frames).await;

        assert!(matches!(exit, LoopExit::Malformed(_)));
        assert!(!exit.is_graceful());
        assert_eq!(recorder.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn read_error_ends_loop() {
        let frames = stream::iter(vec![Err(tungstenite::Error::ConnectionClosed)]);
        let exit = message_loop(Arc::new(LoggingDispatcher)).run(frames).await;
        assert!(matches!(exit, LoopExit::ReadError(_)));
    }

    #[tokio::test]
    async fn shutdown_interrupts_blocked_read() {
        let ml = message_loop(Arc::new(LoggingDispatcher));
        let token = ml.shutdown.clone();
        let frames = stream::pending::<Result<Message, tungstenite::Error>>().boxed();

        let handle = tokio::spawn(ml.run(frames));
        token.cancel();

        assert_eq!(handle.await.unwrap(), LoopExit::Shutdown);
    }

    #[tokio::test]
    async fn idle_timeout_ends_loop() {
        let mut ml = message_loop(Arc::new(LoggingDispatcher));
        ml.idle_timeout = Some(Duration::from_millis(20));
        let frames = stream::pending::<Result<Message, tungstenite::Error>>().boxed();

        assert_eq!(ml.run(frames).await, LoopExit::IdleTimeout);
    }
}
