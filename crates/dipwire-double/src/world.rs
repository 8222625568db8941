//! The double's game world and its request handlers.
//!
//! All state lives in one [`World`] behind one lock. Every request maps to
//! one handler that validates the scope, reads or mutates the world, and
//! returns the response body; a rejection becomes an `error` response.
//! Handlers are synchronous, so the lock is never held across an `.await`.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::time::{SystemTime, UNIX_EPOCH};

use dipwire_protocol::{
    Document, ErrorType, GameId, GameRole, GameSnapshot, MessageName,
    Notification, PossibleOrders, Request, RequestBody, RequestId, Response,
    ResponseBody, Scope, Vote,
};
use dipwire_session::{SessionError, TokenRegistry};
use dipwire_transport::ConnectionId;
use serde_json::{Value, json};
use tokio::sync::mpsc;

use crate::DoubleConfig;

/// Where a connection's notifications are queued.
pub(crate) type Outbox = mpsc::UnboundedSender<Notification>;

/// How many answered requests are remembered for `re_sent` replays.
const REPLAY_CACHE_SIZE: usize = 1024;

/// Starting supply centers per power on the standard map.
const POWERS: [(&str, &[&str]); 7] = [
    ("AUSTRIA", &["VIE", "BUD", "TRI"]),
    ("ENGLAND", &["EDI", "LVP", "LON"]),
    ("FRANCE", &["PAR", "BRE", "MAR"]),
    ("GERMANY", &["BER", "MUN", "KIE"]),
    ("ITALY", &["ROM", "NAP", "VEN"]),
    ("RUSSIA", &["MOS", "SEV", "STP", "WAR"]),
    ("TURKEY", &["ANK", "CON", "SMY"]),
];

/// The phase every new game starts in.
pub const FIRST_PHASE: &str = "S1901M";

/// The phase that follows `current` in the canned sequence
/// `S1901M -> F1901M -> W1901A -> S1902M`, which then stays on `S1902M`.
pub fn next_phase(current: &str) -> &'static str {
    match current {
        "S1901M" => "F1901M",
        "F1901M" => "W1901A",
        _ => "S1902M",
    }
}

/// The legal-orders table every game answers with.
pub fn canned_possible_orders() -> PossibleOrders {
    let table: [(&str, [&str; 4]); 3] = [
        ("PAR", ["A PAR H", "A PAR - BUR", "A PAR - PIC", "A PAR - GAS"]),
        ("BRE", ["F BRE H", "F BRE - MAO", "F BRE - ENG", "F BRE - PIC"]),
        ("MAR", ["A MAR H", "A MAR - GAS", "A MAR - SPA", "A MAR - PIE"]),
    ];
    table
        .iter()
        .map(|(loc, orders)| {
            (loc.to_string(), orders.iter().map(|o| o.to_string()).collect())
        })
        .collect()
}

/// An `error` response in the making.
type Rejection = (ErrorType, String);

fn auth_error() -> Rejection {
    (
        ErrorType::Authentication,
        "Invalid or missing authentication token".to_string(),
    )
}

fn not_found(game_id: &GameId) -> Rejection {
    (ErrorType::GameNotFound, format!("Game {game_id} not found"))
}

fn unsupported(name: MessageName) -> Rejection {
    (
        ErrorType::UnsupportedRequest,
        format!("Request type {name} not supported by the protocol double"),
    )
}

fn game_error(message: String) -> Rejection {
    (ErrorType::new("GAME_ERROR"), message)
}

/// Rejects power names the standard map does not have.
fn known_power(power_name: &str) -> Result<(), Rejection> {
    if POWERS.iter().any(|(name, _)| *name == power_name) {
        Ok(())
    } else {
        Err(game_error(format!("Unknown power {power_name}")))
    }
}

fn into_document(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        _ => Document::new(),
    }
}

fn now_micros() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_micros()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

// ---------------------------------------------------------------------------
// GameRecord
// ---------------------------------------------------------------------------

/// One game as the double tracks it.
#[derive(Debug)]
struct GameRecord {
    game_id: GameId,
    map_name: String,
    rules: Vec<String>,
    n_controls: u32,
    deadline: Option<u32>,
    registration_password: Option<String>,
    daide_port: u16,
    phase: String,
    status: String,
    /// Power name to controlling username.
    controlled_powers: BTreeMap<String, String>,
    orders: BTreeMap<String, Vec<String>>,
    wait_flags: BTreeMap<String, bool>,
    votes: BTreeMap<String, Vote>,
    messages: Vec<Document>,
    history: Vec<Document>,
    /// Connections that created or joined this game.
    members: HashSet<ConnectionId>,
}

impl GameRecord {
    fn snapshot(&self) -> GameSnapshot {
        let powers: BTreeMap<&str, Value> = POWERS
            .iter()
            .map(|(name, centers)| {
                (
                    *name,
                    json!({"units": [], "centers": centers, "is_eliminated": false}),
                )
            })
            .collect();
        GameSnapshot::new(into_document(json!({
            "game_id": self.game_id,
            "map_name": self.map_name,
            "rules": self.rules,
            "phase": self.phase,
            "status": self.status,
            "n_controls": self.n_controls,
            "deadline": self.deadline,
            "powers": powers,
            "controlled_powers": self.controlled_powers,
        })))
    }

    /// The short form used by `list_games`.
    fn info(&self) -> Document {
        into_document(json!({
            "game_id": self.game_id,
            "map_name": self.map_name,
            "status": self.status,
            "phase": self.phase,
            "n_controls": self.n_controls,
            "has_password": self.registration_password.is_some(),
        }))
    }

    /// Gives `power_name` to `username`. A power already held by someone
    /// else stays with them.
    fn claim(&mut self, power_name: String, username: String) -> Result<(), Rejection> {
        known_power(&power_name)?;
        if let Some(holder) = self.controlled_powers.get(&power_name) {
            if *holder != username {
                return Err(game_error(format!(
                    "Power {power_name} is already controlled in game {}",
                    self.game_id
                )));
            }
        }
        self.controlled_powers.insert(power_name, username);
        let controlled = u32::try_from(self.controlled_powers.len()).unwrap_or(u32::MAX);
        if controlled >= self.n_controls {
            self.status = "ACTIVE".to_string();
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

/// Everything the double knows.
pub(crate) struct World {
    config: DoubleConfig,
    tokens: TokenRegistry,
    games: HashMap<GameId, GameRecord>,
    next_game: u32,
    outboxes: HashMap<ConnectionId, Outbox>,
    /// Answers kept for `re_sent` replays, per connection.
    answered: HashMap<(ConnectionId, RequestId), Response>,
    answered_order: VecDeque<(ConnectionId, RequestId)>,
}

impl World {
    pub(crate) fn new(config: DoubleConfig) -> Self {
        Self {
            config,
            tokens: TokenRegistry::new(),
            games: HashMap::new(),
            next_game: 1,
            outboxes: HashMap::new(),
            answered: HashMap::new(),
            answered_order: VecDeque::new(),
        }
    }

    // -- Connections --------------------------------------------------------

    pub(crate) fn connect(&mut self, conn_id: ConnectionId, outbox: Outbox) {
        self.outboxes.insert(conn_id, outbox);
    }

    pub(crate) fn disconnect(&mut self, conn_id: ConnectionId) {
        self.outboxes.remove(&conn_id);
        for game in self.games.values_mut() {
            game.members.remove(&conn_id);
        }
        self.answered.retain(|(owner, _), _| *owner != conn_id);
        self.answered_order.retain(|(owner, _)| *owner != conn_id);
    }

    pub(crate) fn connection_count(&self) -> usize {
        self.outboxes.len()
    }

    // -- Inspection ---------------------------------------------------------

    pub(crate) fn game_count(&self) -> usize {
        self.games.len()
    }

    pub(crate) fn game_phase(&self, game_id: &GameId) -> Option<String> {
        self.games.get(game_id).map(|g| g.phase.clone())
    }

    pub(crate) fn game_orders(&self, game_id: &GameId, power_name: &str) -> Option<Vec<String>> {
        self.games.get(game_id)?.orders.get(power_name).cloned()
    }

    // -- Requests -----------------------------------------------------------

    /// Answers one request.
    ///
    /// `sign_in` is the outcome of checking credentials, which the caller
    /// does before taking the lock; it is only consulted for `sign_in`.
    /// A `re_sent` request whose id was already answered on the same
    /// connection gets the same answer again without side effects. Ids
    /// answered on other connections are never replayed.
    pub(crate) fn handle(
        &mut self,
        conn_id: ConnectionId,
        request: Request,
        sign_in: Option<Result<(), SessionError>>,
    ) -> Response {
        let request_id = request.request_id.clone();
        if request.re_sent {
            if let Some(previous) = self.answered.get(&(conn_id, request_id.clone())) {
                tracing::debug!(%request_id, "replaying answer to re-sent request");
                return previous.clone();
            }
        }

        let name = request.name();
        let body = match self.dispatch(conn_id, request, sign_in) {
            Ok(body) => body,
            Err((error_type, message)) => {
                tracing::debug!(%request_id, %name, %error_type, %message, "request rejected");
                ResponseBody::Error {
                    error_type,
                    message,
                }
            }
        };
        let response = Response::new(request_id, body);
        self.remember(conn_id, &response);
        response
    }

    fn remember(&mut self, conn_id: ConnectionId, response: &Response) {
        if response.request_id.is_empty() {
            return;
        }
        let key = (conn_id, response.request_id.clone());
        if self.answered.insert(key.clone(), response.clone()).is_none() {
            self.answered_order.push_back(key);
        }
        while self.answered_order.len() > REPLAY_CACHE_SIZE {
            if let Some(oldest) = self.answered_order.pop_front() {
                self.answered.remove(&oldest);
            }
        }
    }

    fn dispatch(
        &mut self,
        conn_id: ConnectionId,
        request: Request,
        sign_in: Option<Result<(), SessionError>>,
    ) -> Result<ResponseBody, Rejection> {
        let Request { scope, body, .. } = request;
        match body {
            RequestBody::SignIn { username, .. } => self.sign_in(&username, sign_in),
            RequestBody::GetDaidePort { game_id } => {
                let game = self.games.get(&game_id).ok_or_else(|| not_found(&game_id))?;
                Ok(ResponseBody::DataPort {
                    data: game.daide_port,
                })
            }

            RequestBody::CreateGame {
                map_name,
                rules,
                n_controls,
                deadline,
                registration_password,
                power_name,
            } => {
                let username = self.username(&scope)?;
                let game = self.create_game(
                    conn_id,
                    username,
                    GameRecordSeed {
                        map_name,
                        rules,
                        n_controls,
                        deadline,
                        registration_password,
                    },
                    power_name,
                )?;
                Ok(ResponseBody::DataGame { data: game })
            }
            RequestBody::JoinGame {
                game_id,
                power_name,
                registration_password,
            } => {
                let username = self.username(&scope)?;
                let game = self.games.get_mut(&game_id).ok_or_else(|| not_found(&game_id))?;
                if let Some(expected) = &game.registration_password {
                    if registration_password.as_ref() != Some(expected) {
                        return Err((
                            ErrorType::Authentication,
                            "Invalid registration password".to_string(),
                        ));
                    }
                }
                if let Some(power_name) = power_name {
                    game.claim(power_name, username.clone())?;
                }
                game.members.insert(conn_id);
                tracing::info!(%game_id, %username, "game joined");
                Ok(ResponseBody::DataGame {
                    data: game.snapshot(),
                })
            }
            RequestBody::ListGames {
                game_id_filter,
                map_name,
                status,
                include_protected,
            } => {
                self.username(&scope)?;
                let mut games: Vec<&GameRecord> = self
                    .games
                    .values()
                    .filter(|g| include_protected || g.registration_password.is_none())
                    .filter(|g| {
                        game_id_filter
                            .as_deref()
                            .is_none_or(|f| g.game_id.as_str().contains(f))
                    })
                    .filter(|g| map_name.as_deref().is_none_or(|m| g.map_name == m))
                    .filter(|g| {
                        status
                            .as_deref()
                            .is_none_or(|s| g.status.eq_ignore_ascii_case(s))
                    })
                    .collect();
                games.sort_by(|a, b| a.game_id.as_str().cmp(b.game_id.as_str()));
                Ok(ResponseBody::DataGames {
                    data: games.into_iter().map(GameRecord::info).collect(),
                })
            }
            RequestBody::GetAvailableMaps {} => {
                self.username(&scope)?;
                Ok(ResponseBody::DataMaps {
                    data: self.config.map_names.clone(),
                })
            }
            RequestBody::GetPlayablePowers { game_id } => {
                self.username(&scope)?;
                let game = self.games.get(&game_id).ok_or_else(|| not_found(&game_id))?;
                let data = POWERS
                    .iter()
                    .map(|(name, _)| name.to_string())
                    .filter(|name| !game.controlled_powers.contains_key(name))
                    .collect();
                Ok(ResponseBody::DataPowerNames { data })
            }
            RequestBody::Logout {} => {
                self.username(&scope)?;
                if let Some(token) = scope.token() {
                    if let Some(username) = self.tokens.revoke(token) {
                        tracing::info!(%username, "logged out");
                    }
                }
                Ok(ResponseBody::Ok {})
            }

            RequestBody::SetOrders { orders } => {
                let (game_id, role) = self.in_game(&scope)?;
                let game = self.game_mut(&game_id)?;
                if role.is_power() {
                    tracing::info!(%game_id, power = %role, ?orders, "orders received");
                    game.orders.insert(role.as_str().to_string(), orders);
                }
                Ok(ResponseBody::Ok {})
            }
            RequestBody::SetWaitFlag { wait } => {
                let (game_id, role) = self.in_game(&scope)?;
                let game = self.game_mut(&game_id)?;
                if role.is_power() {
                    game.wait_flags.insert(role.as_str().to_string(), wait);
                }
                Ok(ResponseBody::Ok {})
            }
            RequestBody::SendGameMessage {
                recipient,
                message,
                message_type,
            } => {
                let (game_id, role) = self.in_game(&scope)?;
                let time_sent = now_micros();
                let game = self
                    .games
                    .get_mut(&game_id)
                    .ok_or_else(|| not_found(&game_id))?;
                game.messages.push(into_document(json!({
                    "phase": game.phase,
                    "sender": role.as_str(),
                    "recipient": recipient,
                    "message": message,
                    "message_type": message_type,
                    "time_sent": time_sent,
                })));
                broadcast(
                    &self.outboxes,
                    &game.members,
                    &Notification::GameMessageReceived {
                        game_id: game_id.clone(),
                        sender: role.as_str().to_string(),
                        recipient,
                        message,
                        message_type,
                        time_sent,
                    },
                );
                Ok(ResponseBody::Ok {})
            }
            RequestBody::GetAllPossibleOrders {} => {
                self.in_game(&scope)?;
                Ok(ResponseBody::DataPossibleOrders {
                    data: canned_possible_orders(),
                })
            }
            RequestBody::GetPhaseHistory {
                from_phase,
                to_phase,
            } => {
                let (game_id, _) = self.in_game(&scope)?;
                let game = self.game_mut(&game_id)?;
                Ok(ResponseBody::DataGamePhases {
                    data: phase_range(&game.history, from_phase.as_deref(), to_phase.as_deref()),
                })
            }
            RequestBody::ProcessGame {} => {
                let (game_id, _) = self.in_game(&scope)?;
                let game = self
                    .games
                    .get_mut(&game_id)
                    .ok_or_else(|| not_found(&game_id))?;
                let orders = std::mem::take(&mut game.orders);
                game.wait_flags.clear();
                game.history.push(into_document(json!({
                    "name": game.phase,
                    "orders": orders,
                })));
                let next = next_phase(&game.phase).to_string();
                let processed = std::mem::replace(&mut game.phase, next);
                tracing::info!(%game_id, from = %processed, to = %game.phase, "game processed");
                broadcast(
                    &self.outboxes,
                    &game.members,
                    &Notification::GameProcessed {
                        game_id: game_id.clone(),
                        phase: game.phase.clone(),
                        game_state: game.snapshot(),
                    },
                );
                Ok(ResponseBody::Ok {})
            }
            RequestBody::Vote { vote } => {
                let (game_id, role) = self.in_game(&scope)?;
                let game = self.game_mut(&game_id)?;
                if role.is_power() {
                    game.votes.insert(role.as_str().to_string(), vote);
                }
                Ok(ResponseBody::Ok {})
            }
            RequestBody::SaveGame {} => {
                let (game_id, _) = self.in_game(&scope)?;
                let game = self.game_mut(&game_id)?;
                let mut data = game.snapshot().into_document();
                data.insert("phases".into(), Value::Array(game.history.iter().cloned().map(Value::Object).collect()));
                data.insert("messages".into(), Value::Array(game.messages.iter().cloned().map(Value::Object).collect()));
                Ok(ResponseBody::DataSavedGame { data })
            }
            RequestBody::LeaveGame {} => {
                let username = self.username(&scope)?;
                let (game_id, role) = self.in_game(&scope)?;
                let game = self.game_mut(&game_id)?;
                game.members.remove(&conn_id);
                if game.controlled_powers.get(role.as_str()) == Some(&username) {
                    game.controlled_powers.remove(role.as_str());
                }
                tracing::info!(%game_id, %username, "game left");
                Ok(ResponseBody::Ok {})
            }
            RequestBody::DeleteGame {} => {
                let (game_id, _) = self.in_game(&scope)?;
                let game = self.games.remove(&game_id).ok_or_else(|| not_found(&game_id))?;
                broadcast(
                    &self.outboxes,
                    &game.members,
                    &Notification::GameDeleted {
                        game_id: game_id.clone(),
                    },
                );
                tracing::info!(%game_id, "game deleted");
                Ok(ResponseBody::Ok {})
            }

            other => Err(unsupported(other.name())),
        }
    }

    fn sign_in(
        &mut self,
        username: &str,
        check: Option<Result<(), SessionError>>,
    ) -> Result<ResponseBody, Rejection> {
        match check {
            Some(Ok(())) => {
                let token = self.tokens.issue(username);
                tracing::info!(username, "signed in");
                Ok(ResponseBody::DataToken { data: token })
            }
            Some(Err(e)) => {
                tracing::debug!(username, error = %e, "sign-in refused");
                Err((
                    ErrorType::Authentication,
                    "Invalid username or password".to_string(),
                ))
            }
            None => Err(auth_error()),
        }
    }

    fn create_game(
        &mut self,
        conn_id: ConnectionId,
        username: String,
        seed: GameRecordSeed,
        power_name: Option<String>,
    ) -> Result<GameSnapshot, Rejection> {
        if let Some(power_name) = &power_name {
            known_power(power_name)?;
        }
        let number = self.next_game;
        self.next_game += 1;
        let game_id = GameId::new(format!("GAME_{number:04}"));
        let offset = u16::try_from(number - 1).unwrap_or(u16::MAX);
        let mut game = GameRecord {
            game_id: game_id.clone(),
            map_name: seed.map_name,
            rules: seed.rules,
            n_controls: seed.n_controls,
            deadline: seed.deadline,
            registration_password: seed.registration_password,
            daide_port: self.config.first_daide_port.saturating_add(offset),
            phase: FIRST_PHASE.to_string(),
            status: "FORMING".to_string(),
            controlled_powers: BTreeMap::new(),
            orders: BTreeMap::new(),
            wait_flags: BTreeMap::new(),
            votes: BTreeMap::new(),
            messages: Vec::new(),
            history: Vec::new(),
            members: HashSet::from([conn_id]),
        };
        if let Some(power_name) = power_name {
            game.claim(power_name, username.clone())?;
        }
        tracing::info!(%game_id, %username, "game created");
        let snapshot = game.snapshot();
        self.games.insert(game_id, game);
        Ok(snapshot)
    }

    /// The user behind a scoped request's token.
    fn username(&self, scope: &Scope) -> Result<String, Rejection> {
        let token = scope.token().ok_or_else(auth_error)?;
        self.tokens
            .validate(token)
            .map(str::to_string)
            .map_err(|_| auth_error())
    }

    /// Validates a game-scoped request: token first, then the game.
    fn in_game(&self, scope: &Scope) -> Result<(GameId, GameRole), Rejection> {
        self.username(scope)?;
        let (Some(game_id), Some(role)) = (scope.game_id(), scope.game_role()) else {
            return Err(auth_error());
        };
        if !self.games.contains_key(game_id) {
            return Err(not_found(game_id));
        }
        Ok((game_id.clone(), role.clone()))
    }

    fn game_mut(&mut self, game_id: &GameId) -> Result<&mut GameRecord, Rejection> {
        self.games.get_mut(game_id).ok_or_else(|| not_found(game_id))
    }
}

/// The `create_game` fields that go straight into the record.
struct GameRecordSeed {
    map_name: String,
    rules: Vec<String>,
    n_controls: u32,
    deadline: Option<u32>,
    registration_password: Option<String>,
}

/// Queues `notification` for every member connection. Returns how many
/// connections it was queued for.
fn broadcast(
    outboxes: &HashMap<ConnectionId, Outbox>,
    members: &HashSet<ConnectionId>,
    notification: &Notification,
) -> usize {
    let mut sent = 0;
    for member in members {
        if let Some(outbox) = outboxes.get(member) {
            if outbox.send(notification.clone()).is_ok() {
                sent += 1;
            }
        }
    }
    tracing::debug!(name = %notification.name(), sent, "notification broadcast");
    sent
}

/// The history entries from `from` to `to`, both inclusive. An unknown or
/// absent bound leaves that side open.
fn phase_range(history: &[Document], from: Option<&str>, to: Option<&str>) -> Vec<Document> {
    let position = |phase: &str| {
        history
            .iter()
            .position(|entry| entry.get("name").and_then(Value::as_str) == Some(phase))
    };
    let start = from.and_then(position).unwrap_or(0);
    let end = to.and_then(position).map_or(history.len(), |i| i + 1);
    if start >= end {
        return Vec::new();
    }
    history[start..end].to_vec()
}
