//! The client-side session state machine.
//!
//! A [`Session`] is the single source of truth for "what may be sent next"
//! on one connection. It holds the token and game context that used to be
//! loose fields on a client object, and only hands them out through
//! [`Session::scope_for`], which checks legality and builds the request
//! scope in one step.

use dipwire_protocol::{GameId, GameRole, Scope, ScopeKind, Token};

use crate::SessionError;

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Where a connection stands.
///
/// ```text
///   Disconnected ──connect──→ Connected ──sign_in ok──→ Authenticated
///        ↑                       ↑  ↑                       │   ↑
///        │                       │  └──────logout ok────────┘   │
///        │                       │                     leave/delete ok
///        │                       │                              │
///        └───────close───────────┴────────── InGame ←─create/join ok
/// ```
///
/// Closing the connection returns to `Disconnected` from every state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Disconnected,
    Connected,
    Authenticated {
        token: Token,
    },
    InGame {
        token: Token,
        game_id: GameId,
        game_role: GameRole,
    },
}

impl SessionState {
    /// Short lowercase label, used in errors and logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connected => "connected",
            Self::Authenticated { .. } => "authenticated",
            Self::InGame { .. } => "in game",
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// One connection's session.
///
/// Transitions are driven by the client after the matching response
/// arrives; a failed request never changes the state.
#[derive(Debug, Clone, Default)]
pub struct Session {
    state: SessionState,
}

impl Session {
    /// Creates a session in the `Disconnected` state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a session for a freshly opened connection.
    pub fn connected() -> Self {
        Self {
            state: SessionState::Connected,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_connected(&self) -> bool {
        !matches!(self.state, SessionState::Disconnected)
    }

    pub fn token(&self) -> Option<&Token> {
        match &self.state {
            SessionState::Authenticated { token }
            | SessionState::InGame { token, .. } => Some(token),
            _ => None,
        }
    }

    pub fn game_id(&self) -> Option<&GameId> {
        match &self.state {
            SessionState::InGame { game_id, .. } => Some(game_id),
            _ => None,
        }
    }

    pub fn game_role(&self) -> Option<&GameRole> {
        match &self.state {
            SessionState::InGame { game_role, .. } => Some(game_role),
            _ => None,
        }
    }

    /// The game and role this session is playing.
    ///
    /// # Errors
    /// [`SessionError::Precondition`] unless the session is in a game.
    pub fn game_context(&self) -> Result<(&GameId, &GameRole), SessionError> {
        match &self.state {
            SessionState::InGame {
                game_id, game_role, ..
            } => Ok((game_id, game_role)),
            other => Err(SessionError::Precondition {
                required: ScopeKind::Game,
                state: other.label(),
            }),
        }
    }

    /// Checks that a request of the given scope may be sent now and builds
    /// its scope from the held context.
    ///
    /// # Errors
    /// [`SessionError::Precondition`] if the session holds less context than
    /// `kind` needs. A connection-scoped request still needs a connection.
    pub fn scope_for(&self, kind: ScopeKind) -> Result<Scope, SessionError> {
        let refuse = || SessionError::Precondition {
            required: kind,
            state: self.state.label(),
        };
        match (kind, &self.state) {
            (_, SessionState::Disconnected) => Err(refuse()),
            (ScopeKind::Connection, _) => Ok(Scope::Connection),
            (ScopeKind::Channel, SessionState::Authenticated { token })
            | (ScopeKind::Channel, SessionState::InGame { token, .. }) => {
                Ok(Scope::Channel {
                    token: token.clone(),
                })
            }
            (
                ScopeKind::Game,
                SessionState::InGame {
                    token,
                    game_id,
                    game_role,
                },
            ) => Ok(Scope::Game {
                token: token.clone(),
                game_id: game_id.clone(),
                game_role: game_role.clone(),
                phase: None,
            }),
            _ => Err(refuse()),
        }
    }

    // -- Transitions --------------------------------------------------------

    /// `Disconnected -> Connected`.
    pub fn connect(&mut self) -> Result<(), SessionError> {
        if self.is_connected() {
            return Err(self.invalid("connect"));
        }
        self.state = SessionState::Connected;
        Ok(())
    }

    /// A `sign_in` succeeded. Valid from any connected state; a fresh sign-in
    /// replaces the token and drops any game context.
    pub fn authenticated(&mut self, token: Token) -> Result<(), SessionError> {
        if !self.is_connected() {
            return Err(self.invalid("authenticate"));
        }
        self.state = SessionState::Authenticated { token };
        tracing::debug!("session authenticated");
        Ok(())
    }

    /// A `create_game` or `join_game` succeeded. From `InGame` this moves to
    /// the new game.
    pub fn entered_game(
        &mut self,
        game_id: GameId,
        game_role: GameRole,
    ) -> Result<(), SessionError> {
        let Some(token) = self.token().cloned() else {
            return Err(self.invalid("enter a game"));
        };
        tracing::debug!(%game_id, %game_role, "session entered game");
        self.state = SessionState::InGame {
            token,
            game_id,
            game_role,
        };
        Ok(())
    }

    /// A `leave_game` or `delete_game` succeeded: `InGame -> Authenticated`.
    pub fn left_game(&mut self) -> Result<(), SessionError> {
        match &self.state {
            SessionState::InGame { token, .. } => {
                self.state = SessionState::Authenticated {
                    token: token.clone(),
                };
                Ok(())
            }
            _ => Err(self.invalid("leave a game")),
        }
    }

    /// A `logout` or `delete_account` succeeded: back to `Connected`.
    pub fn logged_out(&mut self) -> Result<(), SessionError> {
        if self.token().is_none() {
            return Err(self.invalid("log out"));
        }
        self.state = SessionState::Connected;
        Ok(())
    }

    /// The connection closed. Valid from every state.
    pub fn disconnected(&mut self) {
        self.state = SessionState::Disconnected;
    }

    fn invalid(&self, event: &'static str) -> SessionError {
        SessionError::InvalidTransition {
            event,
            state: self.state.label(),
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
