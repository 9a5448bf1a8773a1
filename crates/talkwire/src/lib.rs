//! # Talkwire
//!
//! Real-time chat relay over WebSockets: clients authenticate, join a
//! named room, and exchange messages that are fanned out to every other
//! member. Rooms spring into existence on first join and disappear when
//! their last member leaves.
//!
//! The relay keeps no history and acknowledges nothing — it is a
//! best-effort fan-out for live messages, typing indicators, and
//! presence. Durability, if you need it, is a downstream concern.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use talkwire::{DevCredentials, TalkwireServerBuilder};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), talkwire::TalkwireError> {
//!     talkwire::init_tracing();
//!     let server = TalkwireServerBuilder::new()
//!         .bind("0.0.0.0:8080")
//!         .build(DevCredentials)
//!         .await?;
//!     server.run().await
//! }
//! ```

mod auth;
mod error;
mod handler;
mod server;

pub use auth::DevCredentials;
pub use error::TalkwireError;
pub use server::{
    ServerStatus, StatusHandle, TalkwireServer, TalkwireServerBuilder,
};

// Re-export the layer crates so binaries and tests only depend on
// `talkwire`.
pub use talkwire_protocol as protocol;
pub use talkwire_registry as registry;
pub use talkwire_room as room;
pub use talkwire_transport as transport;

/// Installs a global `tracing` subscriber reading `RUST_LOG`, defaulting
/// to `info`. Call once at binary startup.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}
