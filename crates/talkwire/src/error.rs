//! Unified error type for the Talkwire relay.

use talkwire_protocol::ProtocolError;
use talkwire_registry::RegistryError;
use talkwire_room::RoomError;
use talkwire_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `talkwire` meta-crate, you deal with this single
/// error type instead of importing errors from each sub-crate.
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum TalkwireError {
    /// A transport-level error (connection, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A registry-level error (auth, duplicate or unknown connection).
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// A room-level error (unknown connection, already in a room).
    #[error(transparent)]
    Room(#[from] RoomError),
}
