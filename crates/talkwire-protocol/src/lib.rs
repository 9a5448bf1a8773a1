//! Wire protocol for Talkwire.
//!
//! This crate defines the "language" that chat clients and the relay
//! speak:
//!
//! - **Types** ([`ClientEvent`], [`ServerEvent`], [`RoomId`], [`UserId`],
//!   [`Identity`], [`UserSummary`]) — the structures that travel on the
//!   wire, plus the verified identity attached to a connection.
//! - **Codec** ([`decode_frame`], [`encode_event`]) — conversion between
//!   `{type, data}` JSON frames and those types.
//! - **Errors** ([`ProtocolError`]) — what can go wrong while encoding
//!   or decoding.
//!
//! The protocol layer sits between transport (raw frames) and the relay
//! core (registry + rooms). It doesn't know about connections or rooms —
//! it only knows frame shapes.

mod codec;
mod error;
mod types;

pub use codec::{decode_frame, encode_event, InboundFrame};
pub use error::ProtocolError;
pub use types::{
    new_message_id, now_iso8601, ClientEvent, Identity, RoomId,
    ServerEvent, UserId, UserSummary,
};
