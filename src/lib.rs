//! cmdlined - a newline-delimited text command server.
//!
//! Accepts TCP connections, tracks each one as an independent session, reads
//! one UTF-8 command per line, resolves the first token against a registry of
//! named handlers, invokes the handler with the tokenized remainder, writes
//! the outcome back, and broadcasts every lifecycle and command occurrence to
//! event subscribers.
//!
//! ```no_run
//! use cmdlined::{
//!     CommandContainer, CommandSpec, Config, NetworkCommandListener,
//! };
//!
//! struct Greeter;
//!
//! impl CommandContainer for Greeter {
//!     fn name(&self) -> &str {
//!         "greeter"
//!     }
//!
//!     fn commands(&self) -> Vec<CommandSpec> {
//!         vec![
//!             CommandSpec::from_fn("hello", 1, |args| {
//!                 Ok(Some(format!("hello, {}", args[0])))
//!             })
//!             .help("HELLO <name> - greets by name"),
//!         ]
//!     }
//! }
//!
//! # async fn run() -> anyhow::Result<()> {
//! let mut listener =
//!     NetworkCommandListener::new(Config::for_address("127.0.0.1:42000".parse()?));
//! listener.register_commands(&Greeter)?;
//! let port = listener.start().await?;
//! println!("serving on port {port}");
//! listener.stop().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod help;
pub mod invoke;
pub mod listener;
pub mod registry;
mod session;

pub use config::{Config, ConfigError, LimitsConfig, ListenConfig};
pub use error::{DispatchError, HelpError, ListenerError, RegistrationError};
pub use events::{CommandOutcome, ServerEvent, SessionId};
pub use help::HelpCatalog;
pub use invoke::CommandInvoker;
pub use listener::{ListenerState, NetworkCommandListener};
pub use registry::{
    CommandContainer, CommandDescriptor, CommandHandler, CommandRegistry, CommandSpec,
};
pub use session::{SessionHandle, SessionState};
