//! Typed game operations.
//!
//! Each operation asks the session for the scope it needs, sends the
//! request, maps an `error` response to a [`ClientError`], and unpacks the
//! expected payload. Session transitions happen only after a successful
//! response.

use dipwire_protocol::{
    Document, GameId, GameRole, GameSnapshot, MessageName, PossibleOrders,
    Request, RequestBody, ResponseBody, Scope, ScopeKind, Token, Vote,
    DIPLOMATIC_MESSAGE,
};
use dipwire_transport::Connection;

use crate::{Client, ClientError};

/// Rules a game is created with unless told otherwise.
pub const DEFAULT_RULES: [&str; 3] = ["NO_PRESS", "IGNORE_ERRORS", "POWER_CHOICE"];

/// Parameters for [`Client::create_game`].
///
/// ```rust
/// use dipwire_client::CreateGameOptions;
///
/// let options = CreateGameOptions::default().power_name("FRANCE").n_controls(1);
/// assert_eq!(options.map_name, "standard");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CreateGameOptions {
    pub map_name: String,
    pub rules: Vec<String>,
    /// Number of controlled powers needed before the game starts.
    pub n_controls: u32,
    /// Phase deadline in seconds.
    pub deadline: Option<u32>,
    pub registration_password: Option<String>,
    /// Power to play. Without one the creator joins as omniscient observer.
    pub power_name: Option<String>,
}

impl CreateGameOptions {
    pub fn map_name(mut self, map_name: impl Into<String>) -> Self {
        self.map_name = map_name.into();
        self
    }

    pub fn rules<I, S>(mut self, rules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rules = rules.into_iter().map(Into::into).collect();
        self
    }

    pub fn n_controls(mut self, n_controls: u32) -> Self {
        self.n_controls = n_controls;
        self
    }

    pub fn deadline(mut self, seconds: u32) -> Self {
        self.deadline = Some(seconds);
        self
    }

    pub fn registration_password(mut self, password: impl Into<String>) -> Self {
        self.registration_password = Some(password.into());
        self
    }

    pub fn power_name(mut self, power_name: impl Into<String>) -> Self {
        self.power_name = Some(power_name.into());
        self
    }
}

impl Default for CreateGameOptions {
    fn default() -> Self {
        Self {
            map_name: "standard".to_string(),
            rules: DEFAULT_RULES.iter().map(|r| r.to_string()).collect(),
            n_controls: 7,
            deadline: None,
            registration_password: None,
            power_name: None,
        }
    }
}

/// Parameters for [`Client::join_game`]. The default joins as an observer.
///
/// ```rust
/// use dipwire_client::JoinGameOptions;
///
/// let options = JoinGameOptions::default()
///     .power_name("ENGLAND")
///     .registration_password("secret");
/// assert_eq!(options.power_name.as_deref(), Some("ENGLAND"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinGameOptions {
    /// Power to play. Without one the session joins as observer.
    pub power_name: Option<String>,
    /// Required when the game was created with one.
    pub registration_password: Option<String>,
}

impl JoinGameOptions {
    pub fn power_name(mut self, power_name: impl Into<String>) -> Self {
        self.power_name = Some(power_name.into());
        self
    }

    pub fn registration_password(mut self, password: impl Into<String>) -> Self {
        self.registration_password = Some(password.into());
        self
    }
}

/// Filter for [`Client::list_games`]. The default lists everything public.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListGamesFilter {
    pub game_id: Option<String>,
    pub map_name: Option<String>,
    pub status: Option<String>,
    pub include_protected: bool,
}

impl<C: Connection> Client<C> {
    /// Sends `body` with the scope the session currently allows.
    ///
    /// This is the generic entry point behind every typed operation; it is
    /// public so variants without a dedicated method can still be sent.
    /// Timeouts are retried per [`ClientConfig::retry`](crate::ClientConfig).
    ///
    /// # Errors
    /// - [`ClientError::Session`] if the session is not far enough along;
    ///   nothing is sent
    /// - [`ClientError::Authentication`] or [`ClientError::Server`] for an
    ///   `error` response
    /// - any error from [`send_request`](Self::send_request)
    pub async fn request(
        &self,
        body: RequestBody,
    ) -> Result<ResponseBody, ClientError> {
        let scope = self.with_session(|s| s.scope_for(body.scope_kind()))?;
        self.request_in(scope, body).await
    }

    /// Like [`request`](Self::request) for a game-scoped body, with the
    /// optional `phase` envelope field set.
    pub async fn request_in_phase(
        &self,
        body: RequestBody,
        phase: Option<&str>,
    ) -> Result<ResponseBody, ClientError> {
        let mut scope = self.with_session(|s| s.scope_for(ScopeKind::Game))?;
        if let Scope::Game { phase: slot, .. } = &mut scope {
            *slot = phase.map(str::to_string);
        }
        self.request_in(scope, body).await
    }

    async fn request_in(
        &self,
        scope: Scope,
        body: RequestBody,
    ) -> Result<ResponseBody, ClientError> {
        let name = body.name();
        let response = self
            .send_request_with_retry(Request::new(scope, body))
            .await?;
        match response.body {
            ResponseBody::Error {
                error_type,
                message,
            } => {
                tracing::debug!(
                    request_id = %response.request_id,
                    %name,
                    %error_type,
                    "request rejected"
                );
                Err(ClientError::from_server(error_type, message))
            }
            body => Ok(body),
        }
    }

    async fn request_ok(&self, body: RequestBody) -> Result<(), ClientError> {
        let name = body.name();
        match self.request(body).await? {
            ResponseBody::Ok {} => Ok(()),
            other => Err(unexpected(name, &other)),
        }
    }

    // -- Connection scope ---------------------------------------------------

    /// Authenticates and stores the returned token in the session.
    ///
    /// A failed sign-in leaves the session unchanged.
    pub async fn sign_in(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Token, ClientError> {
        let body = RequestBody::SignIn {
            username: username.to_string(),
            password: password.to_string(),
        };
        let token = match self.request(body).await? {
            ResponseBody::DataToken { data } => data,
            other => return Err(unexpected(MessageName::SignIn, &other)),
        };
        self.with_session(|s| s.authenticated(token.clone()))?;
        tracing::info!(username, "signed in");
        Ok(token)
    }

    /// Asks for the DAIDE port of a game.
    pub async fn get_daide_port(&self, game_id: &GameId) -> Result<u16, ClientError> {
        let body = RequestBody::GetDaidePort {
            game_id: game_id.clone(),
        };
        match self.request(body).await? {
            ResponseBody::DataPort { data } => Ok(data),
            other => Err(unexpected(MessageName::GetDaidePort, &other)),
        }
    }

    // -- Channel scope ------------------------------------------------------

    /// Creates a game and enters it.
    ///
    /// The session's role becomes `options.power_name`, or omniscient
    /// observer when no power was requested.
    pub async fn create_game(
        &self,
        options: CreateGameOptions,
    ) -> Result<GameSnapshot, ClientError> {
        let role = options
            .power_name
            .as_deref()
            .map_or_else(GameRole::omniscient, GameRole::power);
        let body = RequestBody::CreateGame {
            map_name: options.map_name,
            rules: options.rules,
            n_controls: options.n_controls,
            deadline: options.deadline,
            registration_password: options.registration_password,
            power_name: options.power_name,
        };
        let snapshot = self.expect_game(MessageName::CreateGame, body).await?;
        let game_id = snapshot
            .game_id()
            .map(GameId::new)
            .ok_or(ClientError::IncompletePayload {
                request: MessageName::CreateGame,
                field: "game_id",
            })?;
        tracing::info!(%game_id, %role, "created game");
        self.with_session(|s| s.entered_game(game_id, role))?;
        Ok(snapshot)
    }

    /// Joins an existing game, as `options.power_name` or as an observer.
    ///
    /// A wrong or missing registration password for a protected game is an
    /// [`ClientError::Authentication`] and leaves the session unchanged.
    pub async fn join_game(
        &self,
        game_id: &GameId,
        options: JoinGameOptions,
    ) -> Result<GameSnapshot, ClientError> {
        let role = options
            .power_name
            .as_deref()
            .map_or_else(GameRole::observer, GameRole::power);
        let body = RequestBody::JoinGame {
            game_id: game_id.clone(),
            power_name: options.power_name,
            registration_password: options.registration_password,
        };
        let snapshot = self.expect_game(MessageName::JoinGame, body).await?;
        tracing::info!(%game_id, %role, "joined game");
        self.with_session(|s| s.entered_game(game_id.clone(), role))?;
        Ok(snapshot)
    }

    /// Lists games visible to this account.
    pub async fn list_games(
        &self,
        filter: ListGamesFilter,
    ) -> Result<Vec<Document>, ClientError> {
        let body = RequestBody::ListGames {
            game_id_filter: filter.game_id,
            map_name: filter.map_name,
            status: filter.status,
            include_protected: filter.include_protected,
        };
        match self.request(body).await? {
            ResponseBody::DataGames { data } => Ok(data),
            other => Err(unexpected(MessageName::ListGames, &other)),
        }
    }

    pub async fn get_available_maps(&self) -> Result<Vec<String>, ClientError> {
        match self.request(RequestBody::GetAvailableMaps {}).await? {
            ResponseBody::DataMaps { data } => Ok(data),
            other => Err(unexpected(MessageName::GetAvailableMaps, &other)),
        }
    }

    /// Powers of `game_id` nobody controls yet.
    pub async fn get_playable_powers(
        &self,
        game_id: &GameId,
    ) -> Result<Vec<String>, ClientError> {
        let body = RequestBody::GetPlayablePowers {
            game_id: game_id.clone(),
        };
        match self.request(body).await? {
            ResponseBody::DataPowerNames { data } => Ok(data),
            other => Err(unexpected(MessageName::GetPlayablePowers, &other)),
        }
    }

    /// Ends the session on the server. The connection stays open.
    pub async fn logout(&self) -> Result<(), ClientError> {
        self.request_ok(RequestBody::Logout {}).await?;
        self.with_session(|s| s.logged_out())?;
        tracing::info!("logged out");
        Ok(())
    }

    pub async fn delete_account(&self) -> Result<(), ClientError> {
        self.request_ok(RequestBody::DeleteAccount {}).await?;
        self.with_session(|s| s.logged_out())?;
        tracing::info!("account deleted");
        Ok(())
    }

    // -- Game scope ---------------------------------------------------------

    /// Submits orders for the current power, optionally for a given phase.
    pub async fn set_orders<I, S>(
        &self,
        orders: I,
        phase: Option<&str>,
    ) -> Result<(), ClientError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let body = RequestBody::SetOrders {
            orders: orders.into_iter().map(Into::into).collect(),
        };
        self.phase_ok(body, phase).await
    }

    pub async fn set_wait_flag(&self, wait: bool) -> Result<(), ClientError> {
        self.request_ok(RequestBody::SetWaitFlag { wait }).await
    }

    /// Sends a diplomatic message to another power, or `GLOBAL`.
    pub async fn send_game_message(
        &self,
        recipient: &str,
        message: &str,
    ) -> Result<(), ClientError> {
        self.request_ok(RequestBody::SendGameMessage {
            recipient: recipient.to_string(),
            message: message.to_string(),
            message_type: DIPLOMATIC_MESSAGE.to_string(),
        })
        .await
    }

    /// Legal orders per unit location.
    pub async fn get_all_possible_orders(
        &self,
        phase: Option<&str>,
    ) -> Result<PossibleOrders, ClientError> {
        match self
            .request_in_phase(RequestBody::GetAllPossibleOrders {}, phase)
            .await?
        {
            ResponseBody::DataPossibleOrders { data } => Ok(data),
            other => Err(unexpected(MessageName::GetAllPossibleOrders, &other)),
        }
    }

    /// Past phases, optionally bounded on either side.
    pub async fn get_phase_history(
        &self,
        from_phase: Option<&str>,
        to_phase: Option<&str>,
    ) -> Result<Vec<Document>, ClientError> {
        let body = RequestBody::GetPhaseHistory {
            from_phase: from_phase.map(str::to_string),
            to_phase: to_phase.map(str::to_string),
        };
        match self.request(body).await? {
            ResponseBody::DataGamePhases { data } => Ok(data),
            other => Err(unexpected(MessageName::GetPhaseHistory, &other)),
        }
    }

    /// Asks the server to adjudicate the current phase.
    pub async fn process_game(&self, phase: Option<&str>) -> Result<(), ClientError> {
        self.phase_ok(RequestBody::ProcessGame {}, phase).await
    }

    pub async fn vote(&self, vote: Vote) -> Result<(), ClientError> {
        self.request_ok(RequestBody::Vote { vote }).await
    }

    /// Exports the whole game.
    pub async fn save_game(&self) -> Result<Document, ClientError> {
        match self.request(RequestBody::SaveGame {}).await? {
            ResponseBody::DataSavedGame { data } => Ok(data),
            other => Err(unexpected(MessageName::SaveGame, &other)),
        }
    }

    pub async fn leave_game(&self) -> Result<(), ClientError> {
        self.request_ok(RequestBody::LeaveGame {}).await?;
        self.with_session(|s| s.left_game())?;
        tracing::info!("left game");
        Ok(())
    }

    pub async fn delete_game(&self) -> Result<(), ClientError> {
        self.request_ok(RequestBody::DeleteGame {}).await?;
        self.with_session(|s| s.left_game())?;
        tracing::info!("deleted game");
        Ok(())
    }

    // -- Helpers ------------------------------------------------------------

    async fn phase_ok(
        &self,
        body: RequestBody,
        phase: Option<&str>,
    ) -> Result<(), ClientError> {
        let name = body.name();
        match self.request_in_phase(body, phase).await? {
            ResponseBody::Ok {} => Ok(()),
            other => Err(unexpected(name, &other)),
        }
    }

    async fn expect_game(
        &self,
        name: MessageName,
        body: RequestBody,
    ) -> Result<GameSnapshot, ClientError> {
        match self.request(body).await? {
            ResponseBody::DataGame { data } => Ok(data),
            other => Err(unexpected(name, &other)),
        }
    }
}

fn unexpected(request: MessageName, got: &ResponseBody) -> ClientError {
    ClientError::UnexpectedResponse {
        request,
        got: got.name(),
    }
}
