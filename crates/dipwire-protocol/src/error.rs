//! Error types for the protocol layer.
//!
//! Decoding distinguishes three situations a caller may want to react to
//! differently: the frame is not a document at all, the document names no
//! variant or an unknown one, and the document names a known variant but its
//! fields do not match that variant.

use crate::{MessageName, ScopeKind};

/// Errors that can occur while encoding or decoding wire messages.
///
/// Every variant is recoverable. A decode failure concerns one frame only and
/// never leaves a half-built message behind.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The frame is not valid JSON.
    #[error("malformed frame: {0}")]
    Malformed(#[source] serde_json::Error),

    /// The frame is valid JSON but not a JSON object.
    #[error("frame is not a JSON object")]
    NotAnObject,

    /// The document carries no `name` discriminator (or it is not a string).
    #[error("document has no `name` field")]
    MissingName,

    /// The `name` is not part of the closed message catalogue.
    #[error("unknown message `{0}`")]
    UnknownMessage(String),

    /// The `name` is known but the remaining fields do not match it:
    /// a required field is missing, a field has the wrong type, or an
    /// undeclared field is present.
    #[error("invalid `{name}` message: {source}")]
    InvalidBody {
        name: MessageName,
        #[source]
        source: serde_json::Error,
    },

    /// A request was built with a scope its variant does not take.
    #[error("`{name}` requires {expected} scope, got {actual}")]
    ScopeMismatch {
        name: MessageName,
        expected: ScopeKind,
        actual: ScopeKind,
    },

    /// Serialization failed.
    #[error("encode failed: {0}")]
    Encode(#[source] serde_json::Error),
}

impl ProtocolError {
    /// Returns the message name the error concerns, when one was recognised.
    pub fn message_name(&self) -> Option<MessageName> {
        match self {
            Self::InvalidBody { name, .. } | Self::ScopeMismatch { name, .. } => {
                Some(*name)
            }
            _ => None,
        }
    }
}
