//! Unified error type for the dipwire crates.

use dipwire_client::ClientError;
use dipwire_double::DoubleError;
use dipwire_protocol::ProtocolError;
use dipwire_session::SessionError;
use dipwire_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// Lets an application using several dipwire crates propagate any of their
/// errors with `?` into one type.
#[derive(Debug, thiserror::Error)]
pub enum DipwireError {
    /// A transport-level error (connect, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A frame could not be encoded or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session precondition or token check failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A client operation failed.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// The protocol double could not start or serve.
    #[error(transparent)]
    Double(#[from] DoubleError),
}

impl DipwireError {
    /// The server's `error_type`, when the failure is a server rejection.
    pub fn error_type(&self) -> Option<dipwire_protocol::ErrorType> {
        match self {
            Self::Client(e) => e.error_type(),
            _ => None,
        }
    }
}
