//! Wire protocol for dipwire.
//!
//! This crate defines the language a game client and server speak:
//!
//! - **Catalogue** ([`MessageName`]) - the closed set of `name` values, each
//!   tagged as request, response or notification.
//! - **Messages** ([`Request`], [`Response`], [`Notification`], wrapped in
//!   [`Message`]) - the typed form of every wire document.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) - strict conversion between
//!   messages and JSON text frames.
//! - **Errors** ([`ProtocolError`]) - why a frame was rejected.
//!
//! # Architecture
//!
//! The protocol layer sits between the transport (frames) and the client or
//! server (sessions, correlation). It knows nothing about connections; it
//! only turns documents into messages and back.
//!
//! ```text
//! Transport (frames) -> Protocol (Message) -> Client / Double
//! ```
//!
//! # Example
//!
//! ```rust
//! use dipwire_protocol::{
//!     Codec, JsonCodec, Message, Request, RequestBody, RequestId, Scope,
//! };
//!
//! let request = Request::new(
//!     Scope::Connection,
//!     RequestBody::SignIn {
//!         username: "player1".into(),
//!         password: "password".into(),
//!     },
//! )
//! .with_request_id(RequestId::new("r-1"));
//!
//! let codec = JsonCodec;
//! let bytes = codec.encode(&Message::Request(request.clone())).unwrap();
//! assert_eq!(codec.decode(&bytes).unwrap(), Message::Request(request));
//! ```

mod codec;
mod error;
mod message;
mod name;
mod notification;
mod request;
mod response;
mod types;

pub use codec::{Codec, JsonCodec, from_document, salvage_request_id, to_document};
pub use error::ProtocolError;
pub use message::Message;
pub use name::{MessageKind, MessageName, ScopeKind, UnknownName};
pub use notification::Notification;
pub use request::{DIPLOMATIC_MESSAGE, PossibleOrders, Request, RequestBody, Scope};
pub use response::{Response, ResponseBody};
pub use types::{
    Document, ErrorType, GameId, GameRole, GameSnapshot, RequestId, Token, Vote,
};
