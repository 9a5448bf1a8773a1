//! Frame codec: `{type, data}` JSON to and from event types.
//!
//! Decoding is two-stage on purpose. The outer frame is parsed first so
//! the relay can tell apart three cases the state machine treats very
//! differently:
//!
//! 1. well-formed frame, recognized type → [`InboundFrame::Event`]
//! 2. well-formed frame, unrecognized type → [`InboundFrame::Unknown`]
//!    (ignored and logged, never answered — new client versions may emit
//!    types an older relay doesn't know)
//! 3. not a well-formed frame, or a recognized type with a bad payload →
//!    [`ProtocolError::Decode`] (answered with an `error` event)

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::{ClientEvent, ProtocolError, RoomId, ServerEvent};

/// The result of decoding one inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    /// A recognized client event, ready for dispatch.
    Event(ClientEvent),
    /// A structurally valid frame whose `type` the relay doesn't know.
    Unknown(String),
}

/// The outer shape every inbound frame must have.
#[derive(Deserialize)]
struct RawFrame {
    #[serde(rename = "type")]
    kind: String,
    /// Payload; `null` when absent so `ping` may omit it.
    #[serde(default)]
    data: Value,
}

// Payload shapes for each recognized type. camelCase field names match
// what clients send.

#[derive(Deserialize)]
struct AuthData {
    token: String,
}

#[derive(Deserialize)]
struct JoinData {
    #[serde(rename = "roomId")]
    room_id: RoomId,
}

#[derive(Deserialize)]
struct MessageData {
    text: String,
}

#[derive(Deserialize)]
struct TypingData {
    #[serde(rename = "isTyping")]
    is_typing: bool,
}

fn payload<T: DeserializeOwned>(data: Value) -> Result<T, ProtocolError> {
    serde_json::from_value(data).map_err(ProtocolError::Decode)
}

/// Decodes one inbound frame.
///
/// # Errors
/// Returns [`ProtocolError::Decode`] if the bytes are not a `{type, data}`
/// JSON object, or if a recognized `type` carries a payload of the wrong
/// shape. An unrecognized `type` is not an error.
pub fn decode_frame(bytes: &[u8]) -> Result<InboundFrame, ProtocolError> {
    let raw: RawFrame =
        serde_json::from_slice(bytes).map_err(ProtocolError::Decode)?;

    let event = match raw.kind.as_str() {
        "auth" => {
            let AuthData { token } = payload(raw.data)?;
            ClientEvent::Auth { token }
        }
        "join" => {
            let JoinData { room_id } = payload(raw.data)?;
            ClientEvent::Join { room_id }
        }
        "message" => {
            let MessageData { text } = payload(raw.data)?;
            ClientEvent::Message { text }
        }
        "typing" => {
            let TypingData { is_typing } = payload(raw.data)?;
            ClientEvent::Typing { is_typing }
        }
        // Heartbeats carry no meaningful payload; accept `{}` or none.
        "ping" => ClientEvent::Ping,
        _ => return Ok(InboundFrame::Unknown(raw.kind)),
    };

    Ok(InboundFrame::Event(event))
}

/// Encodes an outbound event to its wire bytes.
///
/// # Errors
/// Returns [`ProtocolError::Encode`] if serialization fails.
pub fn encode_event(event: &ServerEvent) -> Result<Vec<u8>, ProtocolError> {
    serde_json::to_vec(event).map_err(ProtocolError::Encode)
}

// =========================================================================
// Tests
// =========================================================================
