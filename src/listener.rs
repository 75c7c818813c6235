//! NetworkCommandListener - server lifecycle and accept loop.
//!
//! The listener binds a TCP socket, spawns one session task per accepted
//! connection, tracks the live sessions in a concurrent map, and fans
//! lifecycle and command events out to broadcast subscribers. Its lifecycle
//! is a four-state machine:
//!
//! ```text
//! NotStarted ──start()──▶ Listening ──stop()──▶ Stopping ──▶ Stopped
//! ```
//!
//! Command containers may be registered only while `NotStarted`; the registry
//! is shared read-only with every session once serving begins. Shutdown is
//! cooperative: `stop()` cancels the shared token, stops accepting, and waits
//! for every live session to finish its in-flight command and close.

use crate::config::Config;
use crate::error::{HelpError, ListenerError};
use crate::events::{ServerEvent, SessionId};
use crate::registry::{CommandContainer, CommandRegistry};
use crate::session::{Session, SessionHandle};
use chrono::Utc;
use dashmap::DashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, Notify};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

/// Lifecycle state of the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    NotStarted,
    Listening,
    Stopping,
    Stopped,
}

/// Shared pieces handed to the accept loop and to every session task.
struct Shared {
    registry: Arc<CommandRegistry>,
    sessions: Arc<DashMap<SessionId, SessionHandle>>,
    events: broadcast::Sender<ServerEvent>,
    cancel: CancellationToken,
    drained: Arc<Notify>,
    max_line_length: usize,
}

/// A TCP command listener multiplexing many concurrent client sessions.
pub struct NetworkCommandListener {
    config: Config,
    state: ListenerState,
    registry: Arc<CommandRegistry>,
    sessions: Arc<DashMap<SessionId, SessionHandle>>,
    events: broadcast::Sender<ServerEvent>,
    cancel: CancellationToken,
    drained: Arc<Notify>,
    accept_task: Option<JoinHandle<()>>,
    local_addr: Option<SocketAddr>,
}

impl NetworkCommandListener {
    /// Create a listener for the given configuration. Nothing is bound until
    /// [`start`](Self::start).
    pub fn new(config: Config) -> Self {
        let (events, _) = broadcast::channel(config.limits.event_capacity);
        Self {
            config,
            state: ListenerState::NotStarted,
            registry: Arc::new(CommandRegistry::new()),
            sessions: Arc::new(DashMap::new()),
            events,
            cancel: CancellationToken::new(),
            drained: Arc::new(Notify::new()),
            accept_task: None,
            local_addr: None,
        }
    }

    /// Subscribe to lifecycle and command events.
    ///
    /// Every subscriber sees every event emitted after it subscribed, in
    /// emission order.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.events.subscribe()
    }

    /// Register a command container. Valid only while `NotStarted`.
    pub fn register_commands(
        &mut self,
        container: &dyn CommandContainer,
    ) -> Result<(), ListenerError> {
        if self.state != ListenerState::NotStarted {
            return Err(ListenerError::InvalidState(
                "commands must be registered before start",
            ));
        }
        // Before start() no session holds a clone of the registry Arc, so
        // get_mut cannot fail. A panic here indicates a state machine bug.
        let registry = Arc::get_mut(&mut self.registry)
            .expect("registry must be exclusively owned before start");
        registry.register(container)?;
        debug!(container = container.name(), "Container registered");
        Ok(())
    }

    /// Bind the configured address and begin accepting connections.
    ///
    /// Emits `ListeningStarted` with the actual bound port (relevant when
    /// configured with port 0) and returns that port.
    pub async fn start(&mut self) -> Result<u16, ListenerError> {
        if self.state != ListenerState::NotStarted {
            return Err(ListenerError::AlreadyStarted);
        }

        let socket = TcpListener::bind(self.config.listen.address).await?;
        let addr = socket.local_addr()?;
        self.local_addr = Some(addr);
        self.state = ListenerState::Listening;
        info!(%addr, commands = self.registry.len(), "Listener bound");

        let _ = self.events.send(ServerEvent::ListeningStarted { port: addr.port() });

        let shared = Shared {
            registry: Arc::clone(&self.registry),
            sessions: Arc::clone(&self.sessions),
            events: self.events.clone(),
            cancel: self.cancel.clone(),
            drained: Arc::clone(&self.drained),
            max_line_length: self.config.limits.max_line_length,
        };
        self.accept_task = Some(tokio::spawn(accept_loop(socket, shared)));

        Ok(addr.port())
    }

    /// Stop accepting connections and wait for every session to close.
    ///
    /// Cooperative: sessions observe the shutdown signal at their next
    /// suspension point, so an in-flight handler runs to completion first.
    /// Idempotent; a no-op in any state other than `Listening`.
    pub async fn stop(&mut self) {
        if self.state != ListenerState::Listening {
            debug!(state = ?self.state, "stop() ignored");
            return;
        }
        self.state = ListenerState::Stopping;
        info!("Listener stopping");

        self.cancel.cancel();
        if let Some(task) = self.accept_task.take() {
            let _ = task.await;
        }

        // Wait for the live-session set to drain. The Notify future is
        // created before the emptiness check to avoid a missed wakeup.
        loop {
            let notified = self.drained.notified();
            if self.sessions.is_empty() {
                break;
            }
            notified.await;
        }

        self.state = ListenerState::Stopped;
        info!("Listener stopped");
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ListenerState {
        self.state
    }

    /// The bound address, once `start()` has succeeded.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Number of live sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Ids of the live sessions, unordered.
    pub fn session_ids(&self) -> Vec<SessionId> {
        self.sessions.iter().map(|entry| *entry.key()).collect()
    }

    /// Look up help text for a registered command. Usable in every state.
    pub fn help_for(&self, name: &str, culture: &str) -> Result<String, HelpError> {
        self.registry.help_for(name, culture).map(str::to_string)
    }
}

/// Accept connections until cancelled, spawning one session task each.
#[instrument(skip_all, name = "accept")]
async fn accept_loop(socket: TcpListener, shared: Shared) {
    loop {
        tokio::select! {
            _ = shared.cancel.cancelled() => {
                info!("Accept loop stopping");
                break;
            }
            accepted = socket.accept() => match accepted {
                Ok((stream, addr)) => spawn_session(stream, addr, &shared),
                Err(e) => {
                    // Transient accept failures must not kill the loop.
                    error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }
}

fn spawn_session(stream: tokio::net::TcpStream, addr: SocketAddr, shared: &Shared) {
    let id = Uuid::new_v4();
    let handle = SessionHandle {
        id,
        addr,
        created_at: Utc::now(),
    };

    // Insert into the live set and announce before the read loop begins.
    shared.sessions.insert(id, handle);
    info!(session = %id, %addr, "Connection accepted");
    let _ = shared.events.send(ServerEvent::SessionStarted { session_id: id });

    let session = Session::new(
        id,
        stream,
        addr,
        Arc::clone(&shared.registry),
        shared.events.clone(),
        shared.cancel.clone(),
        shared.max_line_length,
    );

    let sessions = Arc::clone(&shared.sessions);
    let events = shared.events.clone();
    let drained = Arc::clone(&shared.drained);
    tokio::spawn(async move {
        session.run().await;

        // Terminal transition: only the session itself removes its entry.
        sessions.remove(&id);
        let _ = events.send(ServerEvent::SessionEnded { session_id: id });
        drained.notify_waiters();
    });
}
