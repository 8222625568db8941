//! # dipwire-double
//!
//! A deterministic game server that speaks the dipwire protocol well enough
//! to drive a client through a whole game without a real adjudicator.
//!
//! It keeps every game in memory, hands out canned legal orders, advances
//! phases along a fixed sequence, and pushes the notifications a real
//! server would. Clients reach it either in-process through
//! [`ProtocolDouble::attach`] or over WebSocket through a [`DoubleServer`].
//!
//! ```rust,no_run
//! use dipwire_double::{DoubleConfig, DoubleServer};
//!
//! # async fn run() -> Result<(), dipwire_double::DoubleError> {
//! let server = DoubleServer::builder()
//!     .bind("127.0.0.1:8433")
//!     .config(DoubleConfig::default().user("alice", "secret"))
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod server;
mod world;

pub use config::DoubleConfig;
pub use error::DoubleError;
pub use server::{DoubleServer, DoubleServerBuilder, ProtocolDouble};
pub use world::{FIRST_PHASE, canned_possible_orders, next_phase};
