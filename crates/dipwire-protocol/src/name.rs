//! The closed catalogue of message names.
//!
//! Every wire document carries a `name` field. [`MessageName`] enumerates
//! every value that field may take, and records for each one whether it is
//! a request, a response or a notification, and which scope a request needs.

use std::fmt;
use std::str::FromStr;

/// The three disjoint kinds of message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// Client to server, carries a `request_id`.
    Request,
    /// Server to client, answers a `request_id`.
    Response,
    /// Server to client, unsolicited.
    Notification,
}

/// How much context a request carries.
///
/// The kinds are ordered: a game-scoped request carries everything a
/// channel-scoped one does, plus the game context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ScopeKind {
    /// No context at all.
    Connection,
    /// An authentication `token`.
    Channel,
    /// A `token` plus `game_id`, `game_role` and an optional `phase`.
    Game,
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Connection => "connection",
            Self::Channel => "channel",
            Self::Game => "game",
        })
    }
}

// One row per message: variant, wire name, kind, and scope for requests.
macro_rules! message_names {
    (@scope $scope:ident) => { Some(ScopeKind::$scope) };
    (@scope) => { None };
    ($( $variant:ident => $wire:literal, $kind:ident $(($scope:ident))? ; )*) => {
        /// A message name from the closed catalogue.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum MessageName {
            $( $variant, )*
        }

        impl MessageName {
            /// Every known name, in catalogue order.
            pub const ALL: &'static [MessageName] = &[ $( MessageName::$variant, )* ];

            /// The string that appears in the `name` field.
            pub fn as_str(self) -> &'static str {
                match self {
                    $( MessageName::$variant => $wire, )*
                }
            }

            /// Whether this is a request, response or notification.
            pub fn kind(self) -> MessageKind {
                match self {
                    $( MessageName::$variant => MessageKind::$kind, )*
                }
            }

            /// The scope a request of this name must carry.
            ///
            /// Returns `None` for responses and notifications.
            pub fn scope(self) -> Option<ScopeKind> {
                match self {
                    $( MessageName::$variant => message_names!(@scope $($scope)?), )*
                }
            }
        }
    };
}

message_names! {
    // Requests, connection scope
    SignIn => "sign_in", Request(Connection);
    GetDaidePort => "get_daide_port", Request(Connection);
    // Requests, channel scope
    CreateGame => "create_game", Request(Channel);
    JoinGame => "join_game", Request(Channel);
    JoinPowers => "join_powers", Request(Channel);
    ListGames => "list_games", Request(Channel);
    GetPlayablePowers => "get_playable_powers", Request(Channel);
    GetAvailableMaps => "get_available_maps", Request(Channel);
    GetDummyWaitingPowers => "get_dummy_waiting_powers", Request(Channel);
    SetGrade => "set_grade", Request(Channel);
    DeleteAccount => "delete_account", Request(Channel);
    Logout => "logout", Request(Channel);
    // Requests, game scope
    SetOrders => "set_orders", Request(Game);
    SetWaitFlag => "set_wait_flag", Request(Game);
    SendGameMessage => "send_game_message", Request(Game);
    GetAllPossibleOrders => "get_all_possible_orders", Request(Game);
    GetPhaseHistory => "get_phase_history", Request(Game);
    ProcessGame => "process_game", Request(Game);
    Vote => "vote", Request(Game);
    SaveGame => "save_game", Request(Game);
    SetGameState => "set_game_state", Request(Game);
    SetGameStatus => "set_game_status", Request(Game);
    SetDummyPowers => "set_dummy_powers", Request(Game);
    DeleteGame => "delete_game", Request(Game);
    LeaveGame => "leave_game", Request(Game);
    // Responses
    Ok => "ok", Response;
    Error => "error", Response;
    DataToken => "data_token", Response;
    DataGame => "data_game", Response;
    DataGameInfo => "data_game_info", Response;
    DataGames => "data_games", Response;
    DataMaps => "data_maps", Response;
    DataPowerNames => "data_power_names", Response;
    DataPossibleOrders => "data_possible_orders", Response;
    DataGamePhases => "data_game_phases", Response;
    DataSavedGame => "data_saved_game", Response;
    DataPort => "data_port", Response;
    // Notifications
    GameProcessed => "game_processed", Notification;
    GamePhaseUpdate => "game_phase_update", Notification;
    GameStatusUpdate => "game_status_update", Notification;
    PowersControllers => "powers_controllers", Notification;
    PowerOrdersUpdate => "power_orders_update", Notification;
    PowerOrdersFlag => "power_orders_flag", Notification;
    PowerWaitFlag => "power_wait_flag", Notification;
    GameMessageReceived => "game_message_received", Notification;
    VoteUpdated => "vote_updated", Notification;
    VoteCountUpdated => "vote_count_updated", Notification;
    PowerVoteUpdated => "power_vote_updated", Notification;
    GameDeleted => "game_deleted", Notification;
    OmniscientUpdated => "omniscient_updated", Notification;
    AccountDeleted => "account_deleted", Notification;
    ClearedCenters => "cleared_centers", Notification;
    ClearedOrders => "cleared_orders", Notification;
    ClearedUnits => "cleared_units", Notification;
}

impl fmt::Display for MessageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing a string that is not a known message name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown message name `{0}`")]
pub struct UnknownName(pub String);

impl FromStr for MessageName {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| UnknownName(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str_every_name_round_trips() {
        for name in MessageName::ALL {
            assert_eq!(name.as_str().parse::<MessageName>(), Ok(*name));
        }
    }

    #[test]
    fn test_from_str_unknown_name_fails() {
        let err = "teleport".parse::<MessageName>().unwrap_err();
        assert_eq!(err, UnknownName("teleport".into()));
    }

    #[test]
    fn test_catalogue_has_no_duplicate_wire_names() {
        let mut seen = std::collections::HashSet::new();
        for name in MessageName::ALL {
            assert!(seen.insert(name.as_str()), "duplicate {name}");
        }
        assert_eq!(seen.len(), 53);
    }

    #[test]
    fn test_scope_only_for_requests() {
        for name in MessageName::ALL {
            assert_eq!(
                name.scope().is_some(),
                name.kind() == MessageKind::Request,
                "{name}"
            );
        }
    }

    #[test]
    fn test_scope_of_representative_requests() {
        assert_eq!(MessageName::SignIn.scope(), Some(ScopeKind::Connection));
        assert_eq!(MessageName::CreateGame.scope(), Some(ScopeKind::Channel));
        assert_eq!(MessageName::SetOrders.scope(), Some(ScopeKind::Game));
        assert_eq!(MessageName::Logout.scope(), Some(ScopeKind::Channel));
    }

    #[test]
    fn test_scope_kind_ordering() {
        assert!(ScopeKind::Connection < ScopeKind::Channel);
        assert!(ScopeKind::Channel < ScopeKind::Game);
    }
}
