//! # dipwire
//!
//! Client library for the request/response protocol spoken by Diplomacy
//! game servers, plus a deterministic in-memory double of such a server.
//!
//! The crates underneath are re-exported as modules:
//!
//! - [`transport`]: the duplex [`Connection`](transport::Connection) and its
//!   WebSocket and in-memory implementations
//! - [`protocol`]: the message catalogue and JSON codec
//! - [`session`]: the connection state machine and token handling
//! - [`client`]: request correlation, notifications and game operations
//! - [`double`]: the protocol double
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dipwire::prelude::*;
//!
//! # async fn run() -> Result<(), DipwireError> {
//! let client = Client::connect("ws://127.0.0.1:8433", ClientConfig::default()).await?;
//! client.sign_in("test_user", "test_password").await?;
//! let game = client
//!     .create_game(CreateGameOptions::default().power_name("FRANCE").n_controls(1))
//!     .await?;
//! println!("playing {:?} in {:?}", game.game_id(), game.phase());
//! client.set_orders(["A PAR H", "F BRE H", "A MAR H"], None).await?;
//! # Ok(())
//! # }
//! ```

mod error;

pub use error::DipwireError;

pub use dipwire_client as client;
pub use dipwire_double as double;
pub use dipwire_protocol as protocol;
pub use dipwire_session as session;
pub use dipwire_transport as transport;

/// The types most programs need.
pub mod prelude {
    pub use crate::DipwireError;
    pub use dipwire_client::{
        Client, ClientConfig, ClientError, CreateGameOptions, HandlerId, JoinGameOptions,
        ListGamesFilter, OrderContext, OrderGenerator, RetryPolicy,
    };
    pub use dipwire_double::{DoubleConfig, DoubleServer, ProtocolDouble};
    pub use dipwire_protocol::{
        ErrorType, GameId, GameRole, GameSnapshot, MessageName, Notification, PossibleOrders,
        Token, Vote,
    };
    pub use dipwire_session::SessionState;
    pub use dipwire_transport::{Connection, MemoryConnection};
}
