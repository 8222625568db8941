//! Client side of the dipwire protocol.
//!
//! A [`Client`] drives one connection to a game server:
//!
//! 1. **Correlation** - [`Client::send_request`] assigns a `request_id`,
//!    registers a waiter, writes the frame and waits for the matching
//!    response, a timeout, or the connection closing.
//! 2. **Notifications** - unsolicited server events are routed by name to
//!    handlers registered with [`Client::on_notification`] or
//!    [`Client::subscribe`].
//! 3. **Typed operations** - [`Client::sign_in`], [`Client::create_game`],
//!    [`Client::set_orders`] and friends check the session, send, and
//!    unpack the expected payload.
//!
//! ```rust,no_run
//! use dipwire_client::{Client, ClientConfig, CreateGameOptions};
//!
//! # async fn run() -> Result<(), dipwire_client::ClientError> {
//! let client = Client::connect("ws://127.0.0.1:8433", ClientConfig::default()).await?;
//! client.sign_in("test_user", "test_password").await?;
//! client
//!     .create_game(CreateGameOptions::default().power_name("FRANCE").n_controls(1))
//!     .await?;
//! client.set_orders(["A PAR H"], None).await?;
//! client.close().await?;
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod dispatch;
mod error;
mod ops;
mod orders;
mod pending;

pub use client::Client;
pub use config::{ClientConfig, RetryPolicy};
pub use dispatch::{Dispatcher, HandlerId};
pub use error::ClientError;
pub use ops::{CreateGameOptions, DEFAULT_RULES, JoinGameOptions, ListGamesFilter};
pub use orders::{
    OrderContext, OrderGenerator, OrderValidation, RejectReason, RejectedOrder,
    WAIVE, fallback_orders, validate_orders,
};
