//! Value types shared by requests, responses and notifications.
//!
//! Most of these are newtype wrappers around `String`. They serialize as the
//! bare string (`#[serde(transparent)]`) but keep a token from being passed
//! where a game id is expected.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A structured document the protocol layer passes through untouched.
pub type Document = serde_json::Map<String, serde_json::Value>;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Caller-generated correlation identifier linking a request to its response.
///
/// Opaque on the wire. [`RequestId::generate`] produces a UUID v4 string; an
/// empty id means "let the client pick one".
#[derive(
    Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    /// Wraps an existing identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh random identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Returns `true` for the empty placeholder id.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RequestId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Opaque authentication token issued by a successful `sign_in`.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Tokens are credentials: keep them out of debug logs.
impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shown: String = self.0.chars().take(6).collect();
        write!(f, "Token({shown}…)")
    }
}

/// Server-assigned game identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(String);

impl GameId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GameId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// The role a client plays inside a game: a power name such as `FRANCE`, or
/// one of the administrative roles.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameRole(String);

impl GameRole {
    pub const OBSERVER: &'static str = "OBSERVER_TYPE";
    pub const OMNISCIENT: &'static str = "OMNISCIENT_TYPE";
    pub const MASTER: &'static str = "MASTER_TYPE";

    /// A role from its wire string, administrative or power.
    pub fn new(role: impl Into<String>) -> Self {
        Self(role.into())
    }

    /// A role playing the given power.
    pub fn power(power_name: impl Into<String>) -> Self {
        Self(power_name.into())
    }

    pub fn observer() -> Self {
        Self(Self::OBSERVER.to_string())
    }

    pub fn omniscient() -> Self {
        Self(Self::OMNISCIENT.to_string())
    }

    pub fn master() -> Self {
        Self(Self::MASTER.to_string())
    }

    /// Returns `true` if this role controls a power rather than watching.
    pub fn is_power(&self) -> bool {
        ![Self::OBSERVER, Self::OMNISCIENT, Self::MASTER].contains(&self.as_str())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GameRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Game snapshot
// ---------------------------------------------------------------------------

/// A game state document.
///
/// The layer never interprets it beyond the three accessors below; everything
/// else (powers, units, centers, rules) is carried as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameSnapshot(Document);

impl GameSnapshot {
    pub fn new(document: Document) -> Self {
        Self(document)
    }

    pub fn game_id(&self) -> Option<&str> {
        self.str_field("game_id")
    }

    pub fn phase(&self) -> Option<&str> {
        self.str_field("phase")
    }

    pub fn map_name(&self) -> Option<&str> {
        self.str_field("map_name")
    }

    pub fn document(&self) -> &Document {
        &self.0
    }

    pub fn into_document(self) -> Document {
        self.0
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(serde_json::Value::as_str)
    }
}

impl From<Document> for GameSnapshot {
    fn from(document: Document) -> Self {
        Self(document)
    }
}

// ---------------------------------------------------------------------------
// Enumerated values
// ---------------------------------------------------------------------------

/// The `error_type` carried by an `error` response.
///
/// Known values get their own variant; anything else is preserved verbatim
/// in [`ErrorType::Other`] so unknown server errors still round-trip.
///
/// Equality and hashing go by the wire code, so `Other("PARSING_ERROR")`
/// equals [`ErrorType::Parsing`]. Prefer [`ErrorType::new`], which never
/// builds such an `Other`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ErrorType {
    Authentication,
    GameNotFound,
    UnsupportedRequest,
    Parsing,
    Other(String),
}

impl ErrorType {
    /// Builds an error type from its wire code, mapping known codes to their
    /// variant.
    pub fn new(code: impl Into<String>) -> Self {
        Self::from(code.into())
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Authentication => "AUTHENTICATION_ERROR",
            Self::GameNotFound => "GAME_NOT_FOUND",
            Self::UnsupportedRequest => "UNSUPPORTED_REQUEST",
            Self::Parsing => "PARSING_ERROR",
            Self::Other(other) => other,
        }
    }
}

impl From<String> for ErrorType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "AUTHENTICATION_ERROR" => Self::Authentication,
            "GAME_NOT_FOUND" => Self::GameNotFound,
            "UNSUPPORTED_REQUEST" => Self::UnsupportedRequest,
            "PARSING_ERROR" => Self::Parsing,
            _ => Self::Other(s),
        }
    }
}

impl PartialEq for ErrorType {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for ErrorType {}

impl std::hash::Hash for ErrorType {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.as_str().hash(state);
    }
}

impl From<ErrorType> for String {
    fn from(error_type: ErrorType) -> Self {
        match error_type {
            ErrorType::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A draw vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vote {
    Yes,
    No,
}

impl fmt::Display for Vote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Yes => "yes",
            Self::No => "no",
        })
    }
}
