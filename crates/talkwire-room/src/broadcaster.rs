//! Room broadcaster: member sets, join/leave, and best-effort fan-out.

use std::collections::{BTreeSet, HashMap};

use talkwire_protocol::{RoomId, UserSummary};
use talkwire_registry::ConnectionRegistry;
use talkwire_transport::ConnectionId;

use crate::RoomError;

/// Maintains which connections are in which room and fans frames out to
/// room members.
///
/// Invariants upheld here (together with the registry's room pointer):
/// - a connection is a member of at most one room;
/// - a room entry exists iff its member set is non-empty;
/// - a connection appears in a member set iff its registry record
///   points at that room.
#[derive(Debug, Default)]
pub struct RoomBroadcaster {
    /// Member sets, keyed by room id. `BTreeSet` keeps snapshots and
    /// fan-out order deterministic (connection ids are monotonic).
    rooms: HashMap<RoomId, BTreeSet<ConnectionId>>,
}

impl RoomBroadcaster {
    /// Creates a new broadcaster with no rooms.
    pub fn new() -> Self {
        Self {
            rooms: HashMap::new(),
        }
    }

    /// Adds a connection to a room, creating the room on first join,
    /// and points the registry record at it.
    ///
    /// Join never implicitly leaves: if the connection is already in a
    /// different room the caller must have invoked [`leave`](Self::leave)
    /// first.
    ///
    /// # Errors
    /// - [`RoomError::UnknownConnection`] — no registry record (the
    ///   connection disconnected under us); caller drops the event.
    /// - [`RoomError::AlreadyInRoom`] — the precondition above was
    ///   violated; no state is mutated.
    pub fn join(
        &mut self,
        registry: &mut ConnectionRegistry,
        conn_id: ConnectionId,
        room_id: RoomId,
    ) -> Result<(), RoomError> {
        let current = registry
            .get(conn_id)
            .ok_or(RoomError::UnknownConnection(conn_id))?
            .room
            .clone();
        if let Some(existing) = current {
            return Err(RoomError::AlreadyInRoom(conn_id, existing));
        }

        self.rooms
            .entry(room_id.clone())
            .or_default()
            .insert(conn_id);
        registry
            .set_room(conn_id, Some(room_id.clone()))
            .map_err(|_| RoomError::UnknownConnection(conn_id))?;

        tracing::info!(
            %conn_id,
            %room_id,
            members = self.room_size(&room_id),
            "joined room"
        );
        Ok(())
    }

    /// Removes a connection from its current room, clears the record's
    /// room pointer, and deletes the room if it is now empty.
    ///
    /// Idempotent: returns `None` without touching anything if the
    /// connection has no record or no room. On success returns the room
    /// that was left.
    pub fn leave(
        &mut self,
        registry: &mut ConnectionRegistry,
        conn_id: ConnectionId,
    ) -> Option<RoomId> {
        let room_id = registry.get(conn_id)?.room.clone()?;

        // Clear the pointer first, then the member set; both happen
        // under the caller's lock, so no reader sees them split.
        let _ = registry.set_room(conn_id, None);
        self.evict(conn_id, &room_id);

        tracing::info!(%conn_id, %room_id, "left room");
        Some(room_id)
    }

    /// Removes a connection from the given room's member set, deleting
    /// the room if the set empties. Returns `true` if the room was
    /// deleted.
    ///
    /// This is the teardown path: it takes the room id explicitly so it
    /// stays safe after the registry record has already been removed —
    /// the caller passes the `room` found on the removed record.
    pub fn evict(&mut self, conn_id: ConnectionId, room_id: &RoomId) -> bool {
        let Some(members) = self.rooms.get_mut(room_id) else {
            return false;
        };
        members.remove(&conn_id);
        if members.is_empty() {
            self.rooms.remove(room_id);
            tracing::info!(%room_id, "room deleted (last member left)");
            return true;
        }
        false
    }

    /// Sends `payload` to every member of `room_id` except `exclude`,
    /// skipping members whose writer is gone. Returns the number of
    /// successful sends.
    ///
    /// Best-effort by design: delivery failures are counted out, never
    /// retried, and never evict the member — its own disconnect event
    /// does the cleanup. No send blocks on a slow peer.
    pub fn broadcast(
        &self,
        registry: &ConnectionRegistry,
        room_id: &RoomId,
        payload: &[u8],
        exclude: Option<ConnectionId>,
    ) -> usize {
        let Some(members) = self.rooms.get(room_id) else {
            return 0;
        };

        let mut delivered = 0;
        for member in members {
            if Some(*member) == exclude {
                continue;
            }
            // A vanished record or a closed channel is the same race:
            // the member is on its way out.
            let Some(record) = registry.get(*member) else {
                continue;
            };
            if record.sender.send(payload.to_vec()).is_ok() {
                delivered += 1;
            } else {
                tracing::debug!(
                    conn_id = %member,
                    %room_id,
                    "skipping member with closed writer"
                );
            }
        }
        delivered
    }

    /// Materializes the current member list of a room by resolving each
    /// member through the registry. Members whose record vanished (or
    /// never authenticated) are skipped, not errors.
    pub fn snapshot_users(
        &self,
        registry: &ConnectionRegistry,
        room_id: &RoomId,
    ) -> Vec<UserSummary> {
        let Some(members) = self.rooms.get(room_id) else {
            return Vec::new();
        };
        members
            .iter()
            .filter_map(|id| registry.get(*id))
            .filter_map(|record| record.user_summary())
            .collect()
    }

    /// Number of members in a room (0 if the room doesn't exist).
    pub fn room_size(&self, room_id: &RoomId) -> usize {
        self.rooms.get(room_id).map_or(0, BTreeSet::len)
    }

    /// Number of live rooms (health reporting).
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Returns `true` if the connection is in the room's member set.
    pub fn is_member(&self, room_id: &RoomId, conn_id: ConnectionId) -> bool {
        self.rooms
            .get(room_id)
            .is_some_and(|members| members.contains(&conn_id))
    }
}
