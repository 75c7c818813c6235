//! Test server management.
//!
//! Spawns in-process cmdlined listeners for integration testing, with a
//! fixed set of test commands registered.

use cmdlined::{
    CommandContainer, CommandSpec, Config, NetworkCommandListener, ServerEvent,
};
use std::time::Duration;
use tokio::sync::broadcast;

/// Commands available on every test server.
pub struct TestCommands;

impl CommandContainer for TestCommands {
    fn name(&self) -> &str {
        "test"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::from_fn("echo", 1, |args| Ok(Some(args[0].clone())))
                .help("ECHO <text> - returns the text unchanged")
                .help_for("pt", "ECHO <texto>"),
            CommandSpec::from_fn("join", 2, |args| {
                Ok(Some(format!("{}+{}", args[0], args[1])))
            }),
            CommandSpec::from_fn("noop", 0, |_| Ok(None)),
            CommandSpec::from_fn("fail", 0, |_| Err(anyhow::anyhow!("boom"))),
            CommandSpec::new(
                "slow",
                0,
                std::sync::Arc::new(SlowHandler),
            ),
        ]
    }
}

/// Handler that takes a while, for shutdown-ordering tests.
struct SlowHandler;

#[async_trait::async_trait]
impl cmdlined::CommandHandler for SlowHandler {
    async fn call(&self, _args: &[String]) -> anyhow::Result<Option<String>> {
        tokio::time::sleep(Duration::from_millis(200)).await;
        Ok(Some("done".to_string()))
    }
}

/// An in-process test server instance.
pub struct TestServer {
    listener: NetworkCommandListener,
    port: u16,
}

impl TestServer {
    /// Spawn a new test server on an ephemeral loopback port.
    pub async fn spawn() -> anyhow::Result<Self> {
        let config = Config::for_address("127.0.0.1:0".parse()?);
        let mut listener = NetworkCommandListener::new(config);
        listener.register_commands(&TestCommands)?;
        let port = listener.start().await?;
        Ok(Self { listener, port })
    }

    /// Get the server address.
    pub fn address(&self) -> String {
        format!("127.0.0.1:{}", self.port)
    }

    /// Subscribe to the server's event stream.
    #[allow(dead_code)]
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.listener.subscribe()
    }

    /// Access the listener for lifecycle assertions.
    #[allow(dead_code)]
    pub fn listener_mut(&mut self) -> &mut NetworkCommandListener {
        &mut self.listener
    }

    /// Number of live sessions.
    #[allow(dead_code)]
    pub fn session_count(&self) -> usize {
        self.listener.session_count()
    }

    /// Gracefully stop the server.
    pub async fn stop(&mut self) {
        self.listener.stop().await;
    }

    /// Create a new test client connected to this server.
    #[allow(dead_code)]
    pub async fn connect(&self) -> anyhow::Result<super::client::TestClient> {
        super::client::TestClient::connect(&self.address()).await
    }
}
