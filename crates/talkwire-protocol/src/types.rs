//! Core protocol types for Talkwire's wire format.
//!
//! Every frame on the wire is a JSON object of the shape
//! `{ "type": "...", "data": { ... } }`. Inbound frames decode into
//! [`ClientEvent`]; outbound frames are built from [`ServerEvent`].
//! Field names inside `data` are camelCase (`roomId`, `isTyping`) to
//! match what browser clients send.

use std::fmt;

use chrono::{SecondsFormat, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a room.
///
/// Room ids are caller-supplied opaque strings — any string names a valid
/// room, and rooms spring into existence on first join. Newtype wrapper so
/// a room id can't be confused with other strings in signatures.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl RoomId {
    /// Creates a `RoomId` from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the room id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A unique identifier for a user, as issued by the credential store.
///
/// Opaque to the relay — it only ever compares and forwards these.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    /// Creates a `UserId` from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The verified identity the credential store returns for a valid token.
///
/// Attached to a connection when authentication succeeds. `email` stays
/// server-side; only the [`UserSummary`] projection goes on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Stable user id from the credential store.
    pub user_id: UserId,
    /// Name shown to other room members.
    pub display_name: String,
    /// Optional avatar URL.
    pub avatar: Option<String>,
    /// Account email (never broadcast).
    pub email: String,
    /// Whether the account passed verification.
    pub verified: bool,
}

impl Identity {
    /// Projects the wire-safe subset of this identity.
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.user_id.clone(),
            name: self.display_name.clone(),
            avatar: self.avatar.clone(),
        }
    }
}

/// The public view of a user as broadcast to room members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    /// The user's id.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Optional avatar URL. Omitted from the wire when absent, so
    /// clients see no `avatar` key rather than `"avatar": null`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

// ---------------------------------------------------------------------------
// Inbound events
// ---------------------------------------------------------------------------

/// An event received from a client, one per inbound frame.
///
/// This is a closed enum: the dispatcher matches it exhaustively, so a new
/// event kind is a compile-time-visible decision, not a forgotten string
/// branch. Decoding lives in [`decode_frame`](crate::decode_frame), which
/// also distinguishes "unknown type" (ignored) from "malformed payload"
/// (answered with an error).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// Present a bearer token for verification.
    Auth { token: String },
    /// Join the named room (auth required).
    Join { room_id: RoomId },
    /// Send a chat message to the current room (auth + room required).
    Message { text: String },
    /// Typing indicator for the current room.
    Typing { is_typing: bool },
    /// Client-driven heartbeat; answered with `pong` immediately.
    Ping,
}

// ---------------------------------------------------------------------------
// Outbound events
// ---------------------------------------------------------------------------

/// An event sent to a client.
///
/// Serializes to the `{type, data}` wire shape via serde's adjacent
/// tagging; tags are snake_case (`auth_success`, `room_users`) and payload
/// fields camelCase, matching the client SDK.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Token accepted; the connection is now authenticated as `user`.
    AuthSuccess { user: UserSummary },

    /// Token rejected. The connection stays open and may retry `auth`.
    AuthError { message: String },

    /// Reply to a successful join.
    #[serde(rename_all = "camelCase")]
    Welcome { message: String, room_id: RoomId },

    /// Someone else joined the room.
    UserJoined { user: UserSummary, timestamp: String },

    /// A member left the room (or disconnected).
    UserLeft { user: UserSummary, timestamp: String },

    /// Fresh snapshot of everyone currently in the room.
    RoomUsers { users: Vec<UserSummary> },

    /// A chat message, fanned out to the whole room (sender included).
    #[serde(rename_all = "camelCase")]
    Message {
        id: String,
        text: String,
        user: UserSummary,
        timestamp: String,
        room_id: RoomId,
    },

    /// Typing indicator, fanned out to everyone but the typist.
    #[serde(rename_all = "camelCase")]
    Typing {
        user_id: UserId,
        user_name: String,
        is_typing: bool,
    },

    /// Heartbeat reply.
    Pong {},

    /// Protocol violation or malformed frame, reported to the sender.
    Error { message: String },
}

// ---------------------------------------------------------------------------
// Envelope helpers
// ---------------------------------------------------------------------------

/// Generates a fresh message id: 32 hex chars (128 bits of randomness).
///
/// Message ids only need to be unique, not guessable, but 128 bits makes
/// collisions a non-concern without any coordination.
pub fn new_message_id() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 16] = rng.random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Returns the current UTC time as an ISO-8601 string with millisecond
/// precision (e.g. `2026-08-29T12:00:00.000Z`), the format clients expect
/// in `timestamp` fields.
pub fn now_iso8601() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

// =========================================================================
// Tests
// =========================================================================
