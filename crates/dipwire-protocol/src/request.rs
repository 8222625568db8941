//! Client-to-server requests.
//!
//! A [`Request`] is split in two: the envelope (`request_id`, `re_sent` and a
//! [`Scope`]) and the [`RequestBody`], which holds the variant-specific
//! fields. On the wire both halves are flattened into one JSON object.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    Document, GameId, GameRole, MessageName, RequestId, ScopeKind, Token, Vote,
};

/// The context a request travels with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// No context (`sign_in`, `get_daide_port`).
    Connection,
    /// Authenticated, not tied to a game.
    Channel { token: Token },
    /// Authenticated and acting inside a game.
    Game {
        token: Token,
        game_id: GameId,
        game_role: GameRole,
        phase: Option<String>,
    },
}

impl Scope {
    /// The scope level without its fields.
    pub fn kind(&self) -> ScopeKind {
        match self {
            Self::Connection => ScopeKind::Connection,
            Self::Channel { .. } => ScopeKind::Channel,
            Self::Game { .. } => ScopeKind::Game,
        }
    }

    /// The token, for channel and game scopes.
    pub fn token(&self) -> Option<&Token> {
        match self {
            Self::Connection => None,
            Self::Channel { token } | Self::Game { token, .. } => Some(token),
        }
    }

    pub fn game_id(&self) -> Option<&GameId> {
        match self {
            Self::Game { game_id, .. } => Some(game_id),
            _ => None,
        }
    }

    pub fn game_role(&self) -> Option<&GameRole> {
        match self {
            Self::Game { game_role, .. } => Some(game_role),
            _ => None,
        }
    }
}

/// A complete request: envelope plus body.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub request_id: RequestId,
    /// Set when the caller re-submits the same logical request after a
    /// timeout; the server uses it to avoid repeating side effects.
    pub re_sent: bool,
    pub scope: Scope,
    pub body: RequestBody,
}

impl Request {
    /// Creates a request with an empty id; the client fills one in on send.
    pub fn new(scope: Scope, body: RequestBody) -> Self {
        Self {
            request_id: RequestId::default(),
            re_sent: false,
            scope,
            body,
        }
    }

    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = request_id;
        self
    }

    pub fn name(&self) -> MessageName {
        self.body.name()
    }
}

/// Variant-specific request fields, discriminated by `name`.
///
/// Field-less variants are written as empty struct variants (`Logout {}`) so
/// that undeclared fields are rejected for them too.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case", deny_unknown_fields)]
pub enum RequestBody {
    // -- Connection scope --
    SignIn {
        username: String,
        password: String,
    },
    GetDaidePort {
        game_id: GameId,
    },

    // -- Channel scope --
    CreateGame {
        map_name: String,
        rules: Vec<String>,
        n_controls: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        deadline: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        registration_password: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        power_name: Option<String>,
    },
    JoinGame {
        game_id: GameId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        power_name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        registration_password: Option<String>,
    },
    JoinPowers {
        game_id: GameId,
        power_names: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        registration_password: Option<String>,
    },
    ListGames {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        game_id_filter: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        map_name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        status: Option<String>,
        #[serde(default)]
        include_protected: bool,
    },
    GetPlayablePowers {
        game_id: GameId,
    },
    GetAvailableMaps {},
    GetDummyWaitingPowers {
        game_id: GameId,
    },
    SetGrade {
        username: String,
        grade: String,
    },
    DeleteAccount {},
    Logout {},

    // -- Game scope --
    SetOrders {
        orders: Vec<String>,
    },
    SetWaitFlag {
        wait: bool,
    },
    SendGameMessage {
        recipient: String,
        message: String,
        #[serde(default = "default_message_type")]
        message_type: String,
    },
    GetAllPossibleOrders {},
    GetPhaseHistory {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from_phase: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        to_phase: Option<String>,
    },
    ProcessGame {},
    Vote {
        vote: Vote,
    },
    SaveGame {},
    SetGameState {
        state: Document,
    },
    SetGameStatus {
        status: String,
    },
    SetDummyPowers {
        power_names: Vec<String>,
    },
    DeleteGame {},
    LeaveGame {},
}

/// Message type used by `send_game_message` when none is given.
pub const DIPLOMATIC_MESSAGE: &str = "DIPLOMATIC";

fn default_message_type() -> String {
    DIPLOMATIC_MESSAGE.to_string()
}

impl RequestBody {
    pub fn name(&self) -> MessageName {
        match self {
            Self::SignIn { .. } => MessageName::SignIn,
            Self::GetDaidePort { .. } => MessageName::GetDaidePort,
            Self::CreateGame { .. } => MessageName::CreateGame,
            Self::JoinGame { .. } => MessageName::JoinGame,
            Self::JoinPowers { .. } => MessageName::JoinPowers,
            Self::ListGames { .. } => MessageName::ListGames,
            Self::GetPlayablePowers { .. } => MessageName::GetPlayablePowers,
            Self::GetAvailableMaps {} => MessageName::GetAvailableMaps,
            Self::GetDummyWaitingPowers { .. } => {
                MessageName::GetDummyWaitingPowers
            }
            Self::SetGrade { .. } => MessageName::SetGrade,
            Self::DeleteAccount {} => MessageName::DeleteAccount,
            Self::Logout {} => MessageName::Logout,
            Self::SetOrders { .. } => MessageName::SetOrders,
            Self::SetWaitFlag { .. } => MessageName::SetWaitFlag,
            Self::SendGameMessage { .. } => MessageName::SendGameMessage,
            Self::GetAllPossibleOrders {} => MessageName::GetAllPossibleOrders,
            Self::GetPhaseHistory { .. } => MessageName::GetPhaseHistory,
            Self::ProcessGame {} => MessageName::ProcessGame,
            Self::Vote { .. } => MessageName::Vote,
            Self::SaveGame {} => MessageName::SaveGame,
            Self::SetGameState { .. } => MessageName::SetGameState,
            Self::SetGameStatus { .. } => MessageName::SetGameStatus,
            Self::SetDummyPowers { .. } => MessageName::SetDummyPowers,
            Self::DeleteGame {} => MessageName::DeleteGame,
            Self::LeaveGame {} => MessageName::LeaveGame,
        }
    }

    /// The scope this body must be sent with.
    pub fn scope_kind(&self) -> ScopeKind {
        match self.name().scope() {
            Some(kind) => kind,
            // Every request name has a scope in the catalogue.
            None => ScopeKind::Connection,
        }
    }
}

/// Per-location legal orders, as returned by `get_all_possible_orders`.
pub type PossibleOrders = BTreeMap<String, Vec<String>>;
