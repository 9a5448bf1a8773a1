//! Connection bookkeeping for Talkwire.
//!
//! This crate is the source of truth for "who is connected, who are they,
//! what room are they in":
//!
//! 1. **Registry** — the [`ConnectionRegistry`] maps connection ids to
//!    [`ConnectionRecord`]s (transport handle, auth state, identity,
//!    room pointer).
//! 2. **Authentication seam** — the [`CredentialStore`] trait, the
//!    black-box call that turns a bearer token into a verified
//!    [`Identity`](talkwire_protocol::Identity).
//!
//! # How it fits in the stack
//!
//! ```text
//! Room layer (above)   ← reads records to resolve members, fan out bytes
//!     ↕
//! Registry (this crate) ← owns connection state, connect → disconnect
//!     ↕
//! Protocol layer (below) ← provides Identity, RoomId, UserSummary
//! ```
//!
//! # Concurrency note
//!
//! `ConnectionRegistry` is NOT thread-safe by itself — it uses a plain
//! `HashMap`, not a concurrent one. This is intentional: the registry is
//! owned together with the room table behind one mutex at a higher level,
//! so join/leave can update both structures as a single atomic unit.

mod auth;
mod connection;
mod error;
mod registry;

pub use auth::CredentialStore;
pub use connection::{AuthState, ConnectionRecord, ConnectionSender};
pub use error::RegistryError;
pub use registry::ConnectionRegistry;
