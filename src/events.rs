//! Observer boundary: server events and per-command outcomes.
//!
//! Events are fanned out over a `tokio::sync::broadcast` channel. Zero
//! subscribers is legal; each subscriber sees every event in emission order.

use crate::error::DispatchError;
use uuid::Uuid;

/// Opaque identifier for one accepted client connection.
pub type SessionId = Uuid;

/// Result of one command invocation. Transient, produced per line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// The handler ran; `None` for handlers that return no value.
    Success(Option<String>),
    /// Resolution or invocation failed; the session keeps running.
    Failure(DispatchError),
}

impl CommandOutcome {
    /// Whether this outcome is a success.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The single-line wire reply for this outcome.
    pub(crate) fn wire_reply(&self) -> String {
        match self {
            Self::Success(Some(value)) => value.clone(),
            Self::Success(None) => "OK".to_string(),
            Self::Failure(err) => format!("ERR {} {}", err.error_code(), err),
        }
    }
}

/// Notifications emitted by the listener and its sessions.
#[derive(Debug, Clone)]
pub enum ServerEvent {
    /// The accept socket is bound; carries the actual bound port.
    ListeningStarted { port: u16 },
    /// A connection was accepted; emitted before the session's read loop runs.
    SessionStarted { session_id: SessionId },
    /// A session reached its terminal state and left the live set.
    SessionEnded { session_id: SessionId },
    /// One non-empty command line was processed, successfully or not.
    CommandReceived {
        session_id: SessionId,
        command: String,
        outcome: CommandOutcome,
    },
}
