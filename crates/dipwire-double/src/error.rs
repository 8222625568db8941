//! Error types for the protocol double.

use dipwire_protocol::ProtocolError;
use dipwire_transport::TransportError;

/// Failures that stop the double itself.
///
/// Problems with a single request never show up here; they are answered
/// with an `error` response on the wire.
#[derive(Debug, thiserror::Error)]
pub enum DoubleError {
    /// Binding, accepting or talking over a connection failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// An outgoing message could not be encoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The bind address could not be read back.
    #[error("listener address unavailable: {0}")]
    Io(#[from] std::io::Error),
}
