//! Error types for the session layer.

use dipwire_protocol::ScopeKind;

/// Errors that can occur in the session layer.
///
/// These cover both sides of the protocol: the client's own state machine
/// (precondition and transition errors) and the credential and token checks
/// a server performs.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// A request needs more context than the session currently holds.
    ///
    /// Raised locally, before anything is written to the connection.
    #[error("{required}-scoped request not allowed while {state}")]
    Precondition {
        required: ScopeKind,
        state: &'static str,
    },

    /// A state transition was attempted from a state that does not allow it.
    #[error("cannot {event} while {state}")]
    InvalidTransition {
        event: &'static str,
        state: &'static str,
    },

    /// Username or password rejected by the
    /// [`Authenticator`](crate::Authenticator).
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The presented token was never issued, or has been revoked.
    #[error("invalid or missing authentication token")]
    InvalidToken,
}

impl SessionError {
    /// Returns `true` for errors raised before any frame is sent.
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::Precondition { .. })
    }
}
