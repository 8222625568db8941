//! Codec trait and the strict JSON implementation.
//!
//! Decoding happens in two steps. First the frame is parsed into a generic
//! JSON object and its `name` is looked up in the catalogue; this is where
//! "not JSON", "no name" and "unknown name" are told apart. Then the envelope
//! fields the name implies are pulled out and the remainder is deserialized
//! into the variant's body, which rejects anything undeclared.

use serde::de::{DeserializeOwned, Error as _};
use serde_json::{Map, Value};

use crate::{
    Message, MessageKind, MessageName, Notification, ProtocolError, Request,
    RequestBody, RequestId, Response, ResponseBody, Scope, ScopeKind,
};

/// Converts between typed [`Message`]s and wire frames.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a message into one frame.
    ///
    /// # Errors
    /// Returns [`ProtocolError::ScopeMismatch`] if a request's scope does not
    /// match its variant, or [`ProtocolError::Encode`] if serialization fails.
    fn encode(&self, message: &Message) -> Result<Vec<u8>, ProtocolError>;

    /// Parses one frame into a message.
    ///
    /// # Errors
    /// Returns a [`ProtocolError`] describing why the frame was rejected.
    /// Never returns a partially populated message.
    fn decode(&self, frame: &[u8]) -> Result<Message, ProtocolError>;
}

/// A [`Codec`] that speaks JSON text documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode(&self, message: &Message) -> Result<Vec<u8>, ProtocolError> {
        let document = to_document(message)?;
        serde_json::to_vec(&document).map_err(ProtocolError::Encode)
    }

    fn decode(&self, frame: &[u8]) -> Result<Message, ProtocolError> {
        let value: Value =
            serde_json::from_slice(frame).map_err(ProtocolError::Malformed)?;
        from_document(value)
    }
}

// ---------------------------------------------------------------------------
// Document-level conversion
// ---------------------------------------------------------------------------

/// Converts a message into its wire document.
pub fn to_document(message: &Message) -> Result<Value, ProtocolError> {
    match message {
        Message::Request(request) => request_to_document(request),
        Message::Response(response) => {
            let mut map = body_map(&response.body)?;
            map.insert(
                "request_id".into(),
                Value::String(response.request_id.as_str().to_string()),
            );
            Ok(Value::Object(map))
        }
        Message::Notification(notification) => serde_json::to_value(notification)
            .map_err(ProtocolError::Encode),
    }
}

/// Parses a wire document into a message.
pub fn from_document(value: Value) -> Result<Message, ProtocolError> {
    let Value::Object(mut map) = value else {
        return Err(ProtocolError::NotAnObject);
    };
    let name = match map.get("name") {
        Some(Value::String(name)) => name
            .parse::<MessageName>()
            .map_err(|e| ProtocolError::UnknownMessage(e.0))?,
        _ => return Err(ProtocolError::MissingName),
    };
    match name.kind() {
        MessageKind::Request => {
            let request_id =
                RequestId::new(require::<String>(&mut map, "request_id", name)?);
            let re_sent = take::<bool>(&mut map, "re_sent")
                .map_err(|e| invalid_body(e, name))?
                .unwrap_or(false);
            let scope = take_scope(&mut map, name)?;
            let body: RequestBody =
                from_map(map).map_err(|e| invalid_body(e, name))?;
            Ok(Message::Request(Request {
                request_id,
                re_sent,
                scope,
                body,
            }))
        }
        MessageKind::Response => {
            let request_id =
                RequestId::new(require::<String>(&mut map, "request_id", name)?);
            let body: ResponseBody =
                from_map(map).map_err(|e| invalid_body(e, name))?;
            Ok(Message::Response(Response { request_id, body }))
        }
        MessageKind::Notification => {
            let notification: Notification =
                from_map(map).map_err(|e| invalid_body(e, name))?;
            Ok(Message::Notification(notification))
        }
    }
}

/// Best-effort extraction of `request_id` from a frame that failed to decode.
///
/// Lets a server answer a broken request with an `error` response, and lets
/// a client fail the matching waiter instead of leaving it to time out.
pub fn salvage_request_id(frame: &[u8]) -> Option<RequestId> {
    let value: Value = serde_json::from_slice(frame).ok()?;
    match value.get("request_id")? {
        Value::String(id) if !id.is_empty() => Some(RequestId::new(id.as_str())),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn request_to_document(request: &Request) -> Result<Value, ProtocolError> {
    let name = request.body.name();
    let expected = request.body.scope_kind();
    let actual = request.scope.kind();
    if expected != actual {
        return Err(ProtocolError::ScopeMismatch {
            name,
            expected,
            actual,
        });
    }

    let mut map = body_map(&request.body)?;
    map.insert(
        "request_id".into(),
        Value::String(request.request_id.as_str().to_string()),
    );
    map.insert("re_sent".into(), Value::Bool(request.re_sent));
    match &request.scope {
        Scope::Connection => {}
        Scope::Channel { token } => {
            map.insert("token".into(), Value::String(token.as_str().into()));
        }
        Scope::Game {
            token,
            game_id,
            game_role,
            phase,
        } => {
            map.insert("token".into(), Value::String(token.as_str().into()));
            map.insert("game_id".into(), Value::String(game_id.as_str().into()));
            map.insert(
                "game_role".into(),
                Value::String(game_role.as_str().into()),
            );
            if let Some(phase) = phase {
                map.insert("phase".into(), Value::String(phase.clone()));
            }
        }
    }
    Ok(Value::Object(map))
}

fn body_map<T: serde::Serialize>(
    body: &T,
) -> Result<Map<String, Value>, ProtocolError> {
    match serde_json::to_value(body).map_err(ProtocolError::Encode)? {
        Value::Object(map) => Ok(map),
        other => Err(ProtocolError::Encode(serde_json::Error::custom(
            format!("body serialized to non-object {other}"),
        ))),
    }
}

/// Removes the envelope fields for `name`'s scope from `map`.
fn take_scope(
    map: &mut Map<String, Value>,
    name: MessageName,
) -> Result<Scope, ProtocolError> {
    let Some(kind) = name.scope() else {
        return Ok(Scope::Connection);
    };
    if kind == ScopeKind::Connection {
        return Ok(Scope::Connection);
    }

    let token = require(map, "token", name)?;
    if kind == ScopeKind::Channel {
        return Ok(Scope::Channel { token });
    }

    let game_id = require(map, "game_id", name)?;
    let game_role = require(map, "game_role", name)?;
    let phase =
        take::<String>(map, "phase").map_err(|e| invalid_body(e, name))?;
    Ok(Scope::Game {
        token,
        game_id,
        game_role,
        phase,
    })
}

fn take<T: DeserializeOwned>(
    map: &mut Map<String, Value>,
    field: &'static str,
) -> Result<Option<T>, serde_json::Error> {
    map.remove(field).map(serde_json::from_value).transpose()
}

fn require<T: DeserializeOwned>(
    map: &mut Map<String, Value>,
    field: &'static str,
    name: MessageName,
) -> Result<T, ProtocolError> {
    take(map, field)
        .and_then(|value| {
            value.ok_or_else(|| serde_json::Error::missing_field(field))
        })
        .map_err(|e| invalid_body(e, name))
}

fn from_map<T: DeserializeOwned>(
    map: Map<String, Value>,
) -> Result<T, serde_json::Error> {
    serde_json::from_value(Value::Object(map))
}

fn invalid_body(source: serde_json::Error, name: MessageName) -> ProtocolError {
    ProtocolError::InvalidBody { name, source }
}
