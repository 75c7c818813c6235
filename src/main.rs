//! cmdlined - newline-delimited text command server.
//!
//! Demo binary: loads the config, registers a sample command container, and
//! logs every server event until interrupted.

use anyhow::Context as _;
use chrono::Utc;
use cmdlined::{
    CommandContainer, CommandSpec, Config, NetworkCommandListener, ServerEvent,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Sample commands mirroring a typical operator console.
struct DemoCommands;

impl CommandContainer for DemoCommands {
    fn name(&self) -> &str {
        "demo"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::from_fn("echo", 1, |args| Ok(Some(args[0].clone())))
                .help("ECHO <text> - returns the text unchanged")
                .help_for("pt", "ECHO <texto> - devolve o texto sem alteracao"),
            CommandSpec::from_fn("time", 0, |_| Ok(Some(Utc::now().to_rfc3339())))
                .help("TIME - returns the current server time (UTC)"),
            CommandSpec::from_fn("add", 2, |args| {
                let a: f64 = args[0].parse().context("first operand is not a number")?;
                let b: f64 = args[1].parse().context("second operand is not a number")?;
                Ok(Some((a + b).to_string()))
            })
            .help("ADD <a> <b> - adds two numbers"),
        ]
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "Failed to load config");
        e
    })?;

    let mut listener = NetworkCommandListener::new(config);
    listener.register_commands(&DemoCommands)?;

    // Log every server event, the way the original console demo printed them.
    let mut events = listener.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(ServerEvent::ListeningStarted { port }) => {
                    info!(port, "Listening started");
                }
                Ok(ServerEvent::SessionStarted { session_id }) => {
                    info!(session = %session_id, "Session started");
                }
                Ok(ServerEvent::SessionEnded { session_id }) => {
                    info!(session = %session_id, "Session ended");
                }
                Ok(ServerEvent::CommandReceived {
                    session_id,
                    command,
                    outcome,
                }) => {
                    info!(
                        session = %session_id,
                        command = %command,
                        success = outcome.is_success(),
                        "Command received"
                    );
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "Event subscriber lagged");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let port = listener.start().await?;
    info!(port, "cmdlined serving; press Ctrl-C to stop");

    tokio::signal::ctrl_c().await?;
    info!("Interrupt received, shutting down");
    listener.stop().await;

    Ok(())
}
