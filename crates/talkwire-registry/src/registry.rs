//! The connection registry: tracks every live connection.
//!
//! Pure bookkeeping — no method here broadcasts anything, and the
//! registry knows nothing about room member sets. Membership lives in
//! the room layer; [`set_room`](ConnectionRegistry::set_room) exists so
//! the two structures can be updated as one logical transaction under a
//! shared lock.

use std::collections::HashMap;

use talkwire_protocol::{Identity, RoomId};
use talkwire_transport::ConnectionId;

use crate::{AuthState, ConnectionRecord, ConnectionSender, RegistryError};

/// Source of truth for every live connection.
///
/// ## Lifecycle of a record
///
/// ```text
/// register() ──→ authenticate() ──→ set_room(Some) ──→ remove()
///   [Unauthenticated]   [Authenticated]   [in room]     [gone]
/// ```
///
/// Any step may be skipped on the way to `remove()` — a client can
/// disconnect before ever authenticating.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    /// All live connections, keyed by transport-assigned id.
    connections: HashMap<ConnectionId, ConnectionRecord>,
}

impl ConnectionRegistry {
    /// Creates a new, empty registry.
    pub fn new() -> Self {
        Self {
            connections: HashMap::new(),
        }
    }

    /// Inserts a new connection in `Unauthenticated` state with no
    /// identity and no room.
    ///
    /// # Errors
    /// Returns [`RegistryError::DuplicateConnection`] if the id is
    /// already registered. Ids come from the transport's monotonic
    /// counter, so hitting this means a caller bug, not a race.
    pub fn register(
        &mut self,
        id: ConnectionId,
        sender: ConnectionSender,
    ) -> Result<(), RegistryError> {
        if self.connections.contains_key(&id) {
            return Err(RegistryError::DuplicateConnection(id));
        }
        self.connections
            .insert(id, ConnectionRecord::new(id, sender));
        tracing::debug!(%id, "connection registered");
        Ok(())
    }

    /// Attaches a verified identity and flips the record to
    /// `Authenticated`.
    ///
    /// # Errors
    /// Returns [`RegistryError::UnknownConnection`] if the record was
    /// already removed (disconnect raced the auth reply). Callers treat
    /// that as a no-op.
    pub fn authenticate(
        &mut self,
        id: ConnectionId,
        identity: Identity,
    ) -> Result<(), RegistryError> {
        let record = self
            .connections
            .get_mut(&id)
            .ok_or(RegistryError::UnknownConnection(id))?;

        tracing::info!(%id, user_id = %identity.user_id, "connection authenticated");
        record.identity = Some(identity);
        record.auth = AuthState::Authenticated;
        Ok(())
    }

    /// Updates the connection's room pointer.
    ///
    /// Does not touch any member set — that is the room layer's job.
    /// The two are mutated back-to-back under one lock so readers never
    /// observe a record pointing at a room that doesn't list it.
    ///
    /// # Errors
    /// Returns [`RegistryError::UnknownConnection`] if the record is
    /// gone.
    pub fn set_room(
        &mut self,
        id: ConnectionId,
        room: Option<RoomId>,
    ) -> Result<(), RegistryError> {
        let record = self
            .connections
            .get_mut(&id)
            .ok_or(RegistryError::UnknownConnection(id))?;
        record.room = room;
        Ok(())
    }

    /// Read-only lookup. Absence is a normal outcome (e.g. an event
    /// arriving after its connection's disconnect raced ahead).
    pub fn get(&self, id: ConnectionId) -> Option<&ConnectionRecord> {
        self.connections.get(&id)
    }

    /// Atomically detaches and returns the record, or `None` if it was
    /// already removed. Idempotent: the second call for the same id is
    /// a no-op. The caller uses the returned record's `room` to drive
    /// room cleanup.
    pub fn remove(&mut self, id: ConnectionId) -> Option<ConnectionRecord> {
        let record = self.connections.remove(&id);
        if record.is_some() {
            tracing::debug!(%id, "connection removed");
        }
        record
    }

    /// Number of live connections (health reporting).
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Returns `true` if no connections are registered.
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

// =========================================================================
// Tests
// =========================================================================
