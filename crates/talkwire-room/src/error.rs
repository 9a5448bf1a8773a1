//! Error types for the room layer.

use talkwire_protocol::RoomId;
use talkwire_transport::ConnectionId;

/// Errors that can occur during room operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The connection has no registry record. A disconnect raced this
    /// join; callers log and drop the event.
    #[error("unknown connection {0}")]
    UnknownConnection(ConnectionId),

    /// The connection is already in a room. Join never implicitly
    /// leaves — the caller must leave the old room first, so membership
    /// changes stay auditable as single-purpose operations.
    #[error("connection {0} is already in room {1}")]
    AlreadyInRoom(ConnectionId, RoomId),
}
