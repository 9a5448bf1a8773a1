//! Error types for the protocol layer.
//!
//! Each crate in Talkwire defines its own error enum. When you see a
//! `ProtocolError` you know the problem is a malformed or unencodable
//! frame, not networking or room bookkeeping.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning an outbound event into bytes).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: the inbound frame was not well-formed
    /// `{type, data}` JSON, or a recognized type carried a payload of
    /// the wrong shape. The relay answers these with an `error` event
    /// and leaves all state untouched.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),
}
