//! Session - one accepted client connection.
//!
//! Each session runs in its own Tokio task: a framed line-read loop that
//! resolves and invokes one command at a time, strictly in arrival order,
//! writing each outcome back on the wire and emitting a command-received
//! event per non-empty line. The lifecycle is a three-state machine:
//!
//! ```text
//! Open ──(peer EOF | read error | shutdown)──▶ Closing ──▶ Closed
//! ```
//!
//! A failed command never terminates the session; only connection-level
//! errors, end-of-stream, or the listener's shutdown signal do.

use crate::events::{CommandOutcome, ServerEvent, SessionId};
use crate::invoke::CommandInvoker;
use crate::registry::CommandRegistry;
use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio_util::codec::{FramedRead, LinesCodec};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Lifecycle state of one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Accepting and processing lines.
    Open,
    /// Shutdown requested or end-of-stream observed; finishing up.
    Closing,
    /// Connection released; the session has left the live set.
    Closed,
}

/// Listener-side record of a live session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    /// Opaque unique session identifier.
    pub id: SessionId,
    /// Peer address of the connection.
    pub addr: SocketAddr,
    /// When the connection was accepted.
    pub created_at: DateTime<Utc>,
}

/// Why the read loop ended; drives the Closing transition log line.
enum CloseReason {
    PeerDisconnected,
    ReadError,
    WriteError,
    Shutdown,
}

impl CloseReason {
    fn as_str(&self) -> &'static str {
        match self {
            Self::PeerDisconnected => "peer_disconnected",
            Self::ReadError => "read_error",
            Self::WriteError => "write_error",
            Self::Shutdown => "shutdown",
        }
    }
}

/// A session owning one client connection.
pub(crate) struct Session {
    id: SessionId,
    addr: SocketAddr,
    stream: TcpStream,
    registry: Arc<CommandRegistry>,
    events: broadcast::Sender<ServerEvent>,
    cancel: CancellationToken,
    max_line_length: usize,
}

impl Session {
    pub(crate) fn new(
        id: SessionId,
        stream: TcpStream,
        addr: SocketAddr,
        registry: Arc<CommandRegistry>,
        events: broadcast::Sender<ServerEvent>,
        cancel: CancellationToken,
        max_line_length: usize,
    ) -> Self {
        Self {
            id,
            addr,
            stream,
            registry,
            events,
            cancel,
            max_line_length,
        }
    }

    /// Run the session read loop until the connection ends or shutdown.
    #[instrument(skip(self), fields(session = %self.id, addr = %self.addr), name = "session")]
    pub(crate) async fn run(self) {
        let Session {
            id,
            addr: _,
            stream,
            registry,
            events,
            cancel,
            max_line_length,
        } = self;

        let mut state = SessionState::Open;
        let (read_half, write_half) = stream.into_split();
        let mut lines = FramedRead::new(
            read_half,
            LinesCodec::new_with_max_length(max_line_length),
        );
        let mut writer = BufWriter::new(write_half);

        info!(state = ?state, "Session open");

        let reason = loop {
            // Cancellation is observed between lines, never mid-command, so an
            // in-flight handler always completes before shutdown proceeds.
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Shutdown requested");
                    break CloseReason::Shutdown;
                }
                next = lines.next() => match next {
                    Some(Ok(line)) => {
                        match process_line(id, &line, &registry, &events, &mut writer).await {
                            Ok(()) => {}
                            Err(e) => {
                                warn!(error = %e, "Write error");
                                break CloseReason::WriteError;
                            }
                        }
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "Read error");
                        break CloseReason::ReadError;
                    }
                    None => {
                        debug!("Peer disconnected");
                        break CloseReason::PeerDisconnected;
                    }
                }
            }
        };

        state = SessionState::Closing;
        debug!(state = ?state, reason = reason.as_str(), "Session closing");

        // Release the connection: flush whatever was queued, then drop it.
        let _ = writer.flush().await;
        let _ = writer.shutdown().await;

        state = SessionState::Closed;
        info!(state = ?state, reason = reason.as_str(), "Session closed");
    }
}

/// Process one framed line: dispatch, emit the event, write the reply.
///
/// Returns `Err` only for connection-level write failures; dispatch failures
/// are folded into the outcome.
async fn process_line<W>(
    id: SessionId,
    line: &str,
    registry: &CommandRegistry,
    events: &broadcast::Sender<ServerEvent>,
    writer: &mut W,
) -> std::io::Result<()>
where
    W: AsyncWriteExt + Unpin,
{
    let line = line.trim_end();
    if line.is_empty() {
        // Ignored: no event, no error.
        return Ok(());
    }

    let (name, remainder) = split_command(line);
    let outcome = match registry.resolve(name) {
        Ok(descriptor) => CommandInvoker::invoke(descriptor, remainder).await,
        Err(e) => CommandOutcome::Failure(e),
    };

    match &outcome {
        CommandOutcome::Success(_) => debug!(command = name, "Command succeeded"),
        CommandOutcome::Failure(e) => {
            debug!(command = name, code = e.error_code(), "Command failed");
        }
    }

    let reply = outcome.wire_reply();

    // Observability contract: one event per non-empty line, success or not.
    let _ = events.send(ServerEvent::CommandReceived {
        session_id: id,
        command: line.to_string(),
        outcome,
    });

    writer.write_all(reply.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await
}

/// Split a trimmed line into the command name and the raw argument text.
fn split_command(line: &str) -> (&str, &str) {
    match line.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest),
        None => (line, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{CommandContainer, CommandSpec};

    struct LineContainer;

    impl CommandContainer for LineContainer {
        fn name(&self) -> &str {
            "line"
        }

        fn commands(&self) -> Vec<CommandSpec> {
            vec![CommandSpec::from_fn("echo", 1, |args| {
                Ok(Some(args[0].clone()))
            })]
        }
    }

    fn setup() -> (Arc<CommandRegistry>, broadcast::Sender<ServerEvent>) {
        let mut registry = CommandRegistry::new();
        registry.register(&LineContainer).unwrap();
        let (events, _) = broadcast::channel(16);
        (Arc::new(registry), events)
    }

    #[test]
    fn test_split_command() {
        assert_eq!(split_command("echo hello world"), ("echo", "hello world"));
        assert_eq!(split_command("time"), ("time", ""));
        assert_eq!(split_command("echo\tTabbed rest"), ("echo", "Tabbed rest"));
    }

    #[tokio::test]
    async fn test_empty_line_emits_nothing() {
        let (registry, events) = setup();
        let mut rx = events.subscribe();
        let mut out = Vec::new();

        let id = SessionId::new_v4();
        process_line(id, "   ", &registry, &events, &mut out)
            .await
            .unwrap();

        assert!(out.is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unknown_command_is_failure_outcome() {
        // Scenario B: the session reports the failure and keeps going.
        let (registry, events) = setup();
        let mut rx = events.subscribe();
        let mut out = Vec::new();

        let id = SessionId::new_v4();
        process_line(id, "frobnicate", &registry, &events, &mut out)
            .await
            .unwrap();

        let reply = String::from_utf8(out).unwrap();
        assert!(reply.starts_with("ERR command_not_found"), "reply: {reply}");

        match rx.try_recv().unwrap() {
            ServerEvent::CommandReceived {
                session_id,
                command,
                outcome,
            } => {
                assert_eq!(session_id, id);
                assert_eq!(command, "frobnicate");
                assert!(!outcome.is_success());
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_successful_command_writes_value() {
        let (registry, events) = setup();
        let mut rx = events.subscribe();
        let mut out = Vec::new();

        let id = SessionId::new_v4();
        process_line(id, r#"echo "hello world""#, &registry, &events, &mut out)
            .await
            .unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "hello world\n");
        match rx.try_recv().unwrap() {
            ServerEvent::CommandReceived { outcome, .. } => {
                assert_eq!(outcome, CommandOutcome::Success(Some("hello world".into())));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
}
