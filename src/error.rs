//! Unified error handling for cmdlined.
//!
//! This module provides the error hierarchy for the command server, split by
//! concern: registration-time failures, listener lifecycle misuse, per-command
//! dispatch failures, and help lookup failures. Each enum exposes a static
//! `error_code()` label used in wire replies and tracing fields.

use thiserror::Error;

// ============================================================================
// Registration Errors (setup time)
// ============================================================================

/// Errors raised while registering a command container.
///
/// Registration is atomic: when any command of a container fails validation,
/// none of the container's commands become visible in the registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    #[error("container {0:?} is already registered")]
    DuplicateContainer(String),

    #[error("command {name:?} from container {container:?} collides with an existing command")]
    DuplicateName { name: String, container: String },

    #[error("unsupported command {name:?}: {reason}")]
    UnsupportedSpec { name: String, reason: String },

    #[error("duplicate help culture {culture:?} on command {name:?}")]
    DuplicateHelpCulture { name: String, culture: String },
}

impl RegistrationError {
    /// Get a static error code string for logging and metrics labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::DuplicateContainer(_) => "duplicate_container",
            Self::DuplicateName { .. } => "duplicate_name",
            Self::UnsupportedSpec { .. } => "unsupported_spec",
            Self::DuplicateHelpCulture { .. } => "duplicate_help_culture",
        }
    }
}

// ============================================================================
// Listener Errors (lifecycle)
// ============================================================================

/// Errors raised by the listener lifecycle API.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// `start()` was called when the listener was not in `NotStarted`.
    #[error("listener already started")]
    AlreadyStarted,

    /// A lifecycle method was called in a state that does not permit it.
    #[error("invalid listener state: {0}")]
    InvalidState(&'static str),

    /// Binding or accepting failed at the socket level.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Registration(#[from] RegistrationError),
}

impl ListenerError {
    /// Get a static error code string for logging and metrics labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::AlreadyStarted => "already_started",
            Self::InvalidState(_) => "invalid_state",
            Self::Io(_) => "io_error",
            Self::Registration(e) => e.error_code(),
        }
    }
}

// ============================================================================
// Dispatch Errors (per command line, session-recoverable)
// ============================================================================

/// Errors produced while dispatching a single command line.
///
/// All variants are recoverable at the session level: they are reported as a
/// failure outcome in the command-received event and on the wire, and the
/// session keeps processing subsequent lines.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("unknown command: {0}")]
    CommandNotFound(String),

    #[error("command {name} expects {expected} argument(s), got {actual}")]
    ArgumentCount {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("command {name} failed: {message}")]
    HandlerExecution { name: String, message: String },
}

impl DispatchError {
    /// Get a static error code string for wire replies and tracing fields.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::CommandNotFound(_) => "command_not_found",
            Self::ArgumentCount { .. } => "argument_count",
            Self::HandlerExecution { .. } => "handler_execution",
        }
    }
}

// ============================================================================
// Help Errors (lookup only)
// ============================================================================

/// Errors raised by help lookups. Reported to the caller of the lookup only;
/// they never affect a running session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HelpError {
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// Neither an exact culture match nor a default entry exists.
    #[error("no help registered for command {name} (culture {culture:?})")]
    NotFound { name: String, culture: String },
}

impl HelpError {
    /// Get a static error code string for logging.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownCommand(_) => "unknown_command",
            Self::NotFound { .. } => "help_not_found",
        }
    }
}
