//! Error types for the transport layer.
//!
//! A clean peer close is not an error — `recv` reports it as `Ok(None)`.
//! These variants cover the failure cases: writing to a connection that
//! is already gone, and I/O faults underneath a send, receive, or accept.

/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The connection is closed; no more frames can be written to it.
    /// The writer task treats this as "peer gone" and stops.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Sending a frame failed mid-write.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving a frame failed (reset, protocol violation).
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// Binding the listener or accepting a connection failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),
}
