//! Demo relay binary.
//!
//! Accepts `id:name[:avatar]` dev tokens — point a chat client at it
//! and go. Configuration via environment:
//!
//! ```bash
//! TALKWIRE_BIND=0.0.0.0:8080 RUST_LOG=debug talkwire-server
//! ```

use talkwire::{DevCredentials, TalkwireError, TalkwireServerBuilder};

#[tokio::main]
async fn main() -> Result<(), TalkwireError> {
    talkwire::init_tracing();

    let bind = std::env::var("TALKWIRE_BIND")
        .unwrap_or_else(|_| "127.0.0.1:8080".to_string());

    let server = TalkwireServerBuilder::new()
        .bind(&bind)
        .build(DevCredentials)
        .await?;

    if let Ok(addr) = server.local_addr() {
        tracing::info!(%addr, "listening");
    }
    server.run().await
}
