//! Runs the protocol double on a WebSocket port.
//!
//! The listen address comes from `DIPWIRE_DOUBLE_ADDR` (default
//! `127.0.0.1:8433`); log verbosity from `RUST_LOG` (default `info`).

use dipwire_double::{DoubleConfig, DoubleError, DoubleServer};
use tracing_subscriber::EnvFilter;

const DEFAULT_ADDR: &str = "127.0.0.1:8433";

#[tokio::main]
async fn main() -> Result<(), DoubleError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let addr = std::env::var("DIPWIRE_DOUBLE_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());
    let server = DoubleServer::builder()
        .bind(&addr)
        .config(DoubleConfig::default())
        .build()
        .await?;
    tracing::info!(addr = %server.local_addr()?, "protocol double listening");
    server.run().await
}
