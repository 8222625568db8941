//! Error types for the client.

use std::time::Duration;

use dipwire_protocol::{ErrorType, MessageName, ProtocolError, RequestId};
use dipwire_session::SessionError;
use dipwire_transport::TransportError;

/// Everything a client operation can fail with.
///
/// Each public operation either returns a typed payload or one of these;
/// nothing fails silently.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The connection failed underneath us.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A frame could not be encoded, or the response to our request could
    /// not be decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The session does not allow this request yet. Nothing was sent.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The server rejected our credentials or token.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The server answered with any other `error` response.
    #[error("server error {error_type}: {message}")]
    Server {
        error_type: ErrorType,
        message: String,
    },

    /// No response arrived in time. The waiter has been removed.
    #[error("request {request_id} timed out after {after:?}")]
    Timeout {
        request_id: RequestId,
        after: Duration,
    },

    /// The connection closed before a response arrived.
    #[error("connection closed")]
    ConnectionClosed,

    /// A request with this id is still waiting for its response.
    #[error("request id {0} is already pending")]
    DuplicateRequestId(RequestId),

    /// The server answered with a response of the wrong shape.
    #[error("unexpected `{got}` response to `{request}`")]
    UnexpectedResponse {
        request: MessageName,
        got: MessageName,
    },

    /// The response had the right shape but lacked a value we need.
    #[error("`{request}` response is missing {field}")]
    IncompletePayload {
        request: MessageName,
        field: &'static str,
    },

    /// An [`OrderGenerator`](crate::OrderGenerator) failed.
    #[error("order generation failed: {0}")]
    OrderGeneration(String),
}

impl ClientError {
    /// Builds the error for an `error` response.
    pub fn from_server(error_type: ErrorType, message: String) -> Self {
        match ErrorType::new(error_type) {
            ErrorType::Authentication => Self::Authentication(message),
            error_type => Self::Server {
                error_type,
                message,
            },
        }
    }

    /// The server-side `error_type` behind this error, if there was one.
    pub fn error_type(&self) -> Option<ErrorType> {
        match self {
            Self::Authentication(_) => Some(ErrorType::Authentication),
            Self::Server { error_type, .. } => Some(error_type.clone()),
            _ => None,
        }
    }

    /// Returns `true` if the failure is worth retrying with `re_sent`.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns `true` if the session refused the request locally.
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::Session(e) if e.is_precondition())
    }

    /// Maps a transport failure, folding "peer gone" into `ConnectionClosed`.
    pub(crate) fn from_transport(error: TransportError) -> Self {
        if error.is_closed() {
            Self::ConnectionClosed
        } else {
            Self::Transport(error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_server_authentication_maps_to_authentication() {
        let err = ClientError::from_server(
            ErrorType::Authentication,
            "Invalid username or password".into(),
        );
        assert!(matches!(err, ClientError::Authentication(_)));
        assert_eq!(err.error_type(), Some(ErrorType::Authentication));
    }

    #[test]
    fn test_from_server_raw_authentication_code_maps_to_authentication() {
        let err = ClientError::from_server(
            ErrorType::Other("AUTHENTICATION_ERROR".into()),
            "Token expired".into(),
        );
        assert!(matches!(err, ClientError::Authentication(_)));
    }

    #[test]
    fn test_from_server_other_maps_to_server() {
        let err = ClientError::from_server(
            ErrorType::GameNotFound,
            "Game NONEXISTENT not found".into(),
        );
        assert_eq!(err.error_type(), Some(ErrorType::GameNotFound));
        assert!(err.to_string().contains("GAME_NOT_FOUND"));
    }

    #[test]
    fn test_from_transport_closed_is_connection_closed() {
        let err = ClientError::from_transport(TransportError::ConnectionClosed(
            "peer dropped".into(),
        ));
        assert!(matches!(err, ClientError::ConnectionClosed));
    }
}
