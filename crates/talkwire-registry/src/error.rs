//! Error types for the registry layer.

use talkwire_transport::ConnectionId;

/// Errors that can occur during connection bookkeeping or authentication.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Authentication failed — the token was invalid, expired, or the
    /// user behind it no longer exists. Reported to the client as an
    /// `auth_error` event; the connection stays open and may retry.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// A connection with this id is already registered. Connection ids
    /// are generated by the transport and never reused, so this is a
    /// programmer error, not a runtime condition.
    #[error("connection {0} already registered")]
    DuplicateConnection(ConnectionId),

    /// No record exists for this connection. Usually a disconnect racing
    /// an in-flight event; callers treat it as a no-op, never a crash.
    #[error("unknown connection {0}")]
    UnknownConnection(ConnectionId),
}
