//! `TalkwireServer` builder and accept loop.
//!
//! This is the entry point for running a Talkwire relay. It ties
//! together all the layers: transport → protocol → registry → room.

use std::sync::Arc;

use serde::Serialize;
use talkwire_protocol::now_iso8601;
use talkwire_registry::{ConnectionRegistry, CredentialStore};
use talkwire_room::RoomBroadcaster;
use talkwire_transport::{Transport, WebSocketTransport};
use tokio::sync::Mutex;

use crate::handler::handle_connection;
use crate::TalkwireError;

/// The combined mutable relay state.
///
/// The registry and the room table live behind ONE mutex so that every
/// membership-affecting operation (join, leave, disconnect teardown)
/// mutates the record's room pointer and the room's member set as a
/// single atomic unit. No reader can observe a record pointing at a
/// room that doesn't list it.
pub(crate) struct RelayState {
    pub(crate) registry: ConnectionRegistry,
    pub(crate) rooms: RoomBroadcaster,
}

impl RelayState {
    fn new() -> Self {
        Self {
            registry: ConnectionRegistry::new(),
            rooms: RoomBroadcaster::new(),
        }
    }
}

/// Shared server state passed to each connection handler task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks.
pub(crate) struct ServerState<A: CredentialStore> {
    pub(crate) relay: Arc<Mutex<RelayState>>,
    pub(crate) auth: A,
}

/// Point-in-time health snapshot of a running relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerStatus {
    /// Always `"healthy"` while the process is serving.
    pub status: &'static str,
    /// Number of live connections.
    pub clients: usize,
    /// Number of live rooms.
    pub rooms: usize,
    /// ISO-8601 timestamp of the snapshot.
    pub timestamp: String,
}

/// Cloneable handle for reading the relay's health snapshot.
///
/// Hand this to whatever health surface you run (an HTTP endpoint, a
/// periodic stats logger); the relay itself exposes no HTTP.
#[derive(Clone)]
pub struct StatusHandle {
    relay: Arc<Mutex<RelayState>>,
}

impl StatusHandle {
    /// Takes a fresh snapshot of connection and room counts.
    pub async fn snapshot(&self) -> ServerStatus {
        let relay = self.relay.lock().await;
        ServerStatus {
            status: "healthy",
            clients: relay.registry.len(),
            rooms: relay.rooms.room_count(),
            timestamp: now_iso8601(),
        }
    }
}

/// Builder for configuring and starting a Talkwire relay.
///
/// # Example
///
/// ```rust,ignore
/// use talkwire::{DevCredentials, TalkwireServer};
///
/// let server = TalkwireServer::builder()
///     .bind("0.0.0.0:8080")
///     .build(DevCredentials)
///     .await?;
/// server.run().await
/// ```
pub struct TalkwireServerBuilder {
    bind_addr: String,
}

impl TalkwireServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Builds and starts the server with the given credential store.
    pub async fn build<A: CredentialStore>(
        self,
        auth: A,
    ) -> Result<TalkwireServer<A>, TalkwireError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let state = Arc::new(ServerState {
            relay: Arc::new(Mutex::new(RelayState::new())),
            auth,
        });

        Ok(TalkwireServer { transport, state })
    }
}

impl Default for TalkwireServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running Talkwire relay.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct TalkwireServer<A: CredentialStore> {
    transport: WebSocketTransport,
    state: Arc<ServerState<A>>,
}

impl<A: CredentialStore> TalkwireServer<A> {
    /// Creates a new builder.
    pub fn builder() -> TalkwireServerBuilder {
        TalkwireServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Returns a handle for reading health snapshots.
    pub fn status_handle(&self) -> StatusHandle {
        StatusHandle {
            relay: Arc::clone(&self.state.relay),
        }
    }

    /// Runs the server accept loop.
    ///
    /// Accepts incoming connections and spawns a handler task for each.
    /// Runs until the process is terminated.
    pub async fn run(mut self) -> Result<(), TalkwireError> {
        tracing::info!("Talkwire relay running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(
                                error = %e,
                                "connection ended with error"
                            );
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
