//! Connection record types: what the registry knows about one session.

use talkwire_protocol::{Identity, RoomId, UserSummary};
use talkwire_transport::ConnectionId;
use tokio::sync::mpsc;

/// Handle used to push encoded frames to one connection's writer task.
///
/// The registry references the sender; the transport side owns the
/// receiving half. Unbounded so a fan-out never blocks on a slow peer —
/// a send either queues instantly or fails because the peer's writer is
/// gone, and a failed send is simply skipped (the peer's own disconnect
/// event does the cleanup).
pub type ConnectionSender = mpsc::UnboundedSender<Vec<u8>>;

/// Whether a connection has presented a valid token yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    /// Fresh connection; may only `auth` and `ping`.
    Unauthenticated,
    /// Token verified; identity is attached.
    Authenticated,
}

/// One live connection as tracked by the registry.
///
/// Lifecycle: created on transport connect, identity attached on
/// successful authentication, room pointer set on join, whole record
/// removed on disconnect. Exclusively owned by the
/// [`ConnectionRegistry`](crate::ConnectionRegistry); the room layer
/// only ever holds [`ConnectionId`]s into it.
#[derive(Debug, Clone)]
pub struct ConnectionRecord {
    /// The transport-assigned connection id.
    pub id: ConnectionId,

    /// Sender half of the connection's outbound frame channel.
    pub sender: ConnectionSender,

    /// Verified identity; `None` until authentication succeeds.
    pub identity: Option<Identity>,

    /// The room this connection is in; `None` until a join succeeds.
    /// At most one room per connection — the room layer keeps this in
    /// sync with its member sets.
    pub room: Option<RoomId>,

    /// Authentication gate consulted by every mutating event.
    pub auth: AuthState,
}

impl ConnectionRecord {
    /// Creates a fresh, unauthenticated record.
    pub fn new(id: ConnectionId, sender: ConnectionSender) -> Self {
        Self {
            id,
            sender,
            identity: None,
            room: None,
            auth: AuthState::Unauthenticated,
        }
    }

    /// Returns `true` once authentication has succeeded.
    pub fn is_authenticated(&self) -> bool {
        matches!(self.auth, AuthState::Authenticated)
    }

    /// The wire-safe view of this connection's user, if authenticated.
    pub fn user_summary(&self) -> Option<UserSummary> {
        self.identity.as_ref().map(Identity::summary)
    }
}
