//! Session management for dipwire.
//!
//! This crate covers who may send what:
//!
//! 1. **Session state machine** ([`Session`]) - the client's view of one
//!    connection, `Disconnected -> Connected -> Authenticated -> InGame`,
//!    and the only place request scopes are built.
//! 2. **Authentication** ([`Authenticator`] trait, [`StaticCredentials`]) -
//!    checking a `sign_in` on the server side.
//! 3. **Tokens** ([`TokenRegistry`]) - minting and validating the tokens
//!    that scoped requests carry.
//!
//! # How it fits in the stack
//!
//! ```text
//! Client / Double (above)  <- ask the session what may be sent
//!     |
//! Session Layer (this crate)
//!     |
//! Protocol Layer (below)  <- provides Token, GameId, Scope
//! ```

mod auth;
mod error;
mod session;
mod tokens;

pub use auth::{Authenticator, StaticCredentials};
pub use error::SessionError;
pub use session::{Session, SessionState};
pub use tokens::{TOKEN_PREFIX, TokenRegistry};
