//! Unsolicited server-to-client notifications.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{GameId, GameSnapshot, MessageName};

/// A server-initiated event. Carries no `request_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case", deny_unknown_fields)]
pub enum Notification {
    GameProcessed {
        game_id: GameId,
        phase: String,
        game_state: GameSnapshot,
    },
    GamePhaseUpdate {
        game_id: GameId,
        phase: String,
        game_state: GameSnapshot,
    },
    GameStatusUpdate {
        game_id: GameId,
        status: String,
    },
    PowersControllers {
        game_id: GameId,
        /// Power name to controller (user name or dummy marker).
        controllers: BTreeMap<String, String>,
    },
    PowerOrdersUpdate {
        game_id: GameId,
        power_name: String,
        orders: Vec<String>,
        phase: String,
    },
    PowerOrdersFlag {
        game_id: GameId,
        power_name: String,
        order_is_set: bool,
        phase: String,
    },
    PowerWaitFlag {
        game_id: GameId,
        power_name: String,
        wait: bool,
    },
    GameMessageReceived {
        game_id: GameId,
        sender: String,
        recipient: String,
        message: String,
        message_type: String,
        /// Server timestamp in microseconds since the epoch.
        time_sent: u64,
    },
    VoteUpdated {
        game_id: GameId,
        votes: BTreeMap<String, String>,
    },
    VoteCountUpdated {
        game_id: GameId,
        count_yes: u32,
        count_no: u32,
    },
    PowerVoteUpdated {
        game_id: GameId,
        power_name: String,
        vote: String,
    },
    GameDeleted {
        game_id: GameId,
    },
    OmniscientUpdated {
        game_id: GameId,
        omniscient_type: String,
    },
    AccountDeleted {
        username: String,
    },
    ClearedCenters {
        game_id: GameId,
        power_name: String,
    },
    ClearedOrders {
        game_id: GameId,
        power_name: String,
        phase: String,
    },
    ClearedUnits {
        game_id: GameId,
        power_name: String,
    },
}

impl Notification {
    pub fn name(&self) -> MessageName {
        match self {
            Self::GameProcessed { .. } => MessageName::GameProcessed,
            Self::GamePhaseUpdate { .. } => MessageName::GamePhaseUpdate,
            Self::GameStatusUpdate { .. } => MessageName::GameStatusUpdate,
            Self::PowersControllers { .. } => MessageName::PowersControllers,
            Self::PowerOrdersUpdate { .. } => MessageName::PowerOrdersUpdate,
            Self::PowerOrdersFlag { .. } => MessageName::PowerOrdersFlag,
            Self::PowerWaitFlag { .. } => MessageName::PowerWaitFlag,
            Self::GameMessageReceived { .. } => MessageName::GameMessageReceived,
            Self::VoteUpdated { .. } => MessageName::VoteUpdated,
            Self::VoteCountUpdated { .. } => MessageName::VoteCountUpdated,
            Self::PowerVoteUpdated { .. } => MessageName::PowerVoteUpdated,
            Self::GameDeleted { .. } => MessageName::GameDeleted,
            Self::OmniscientUpdated { .. } => MessageName::OmniscientUpdated,
            Self::AccountDeleted { .. } => MessageName::AccountDeleted,
            Self::ClearedCenters { .. } => MessageName::ClearedCenters,
            Self::ClearedOrders { .. } => MessageName::ClearedOrders,
            Self::ClearedUnits { .. } => MessageName::ClearedUnits,
        }
    }

    /// The game this notification concerns, if any.
    pub fn game_id(&self) -> Option<&GameId> {
        match self {
            Self::AccountDeleted { .. } => None,
            Self::GameProcessed { game_id, .. }
            | Self::GamePhaseUpdate { game_id, .. }
            | Self::GameStatusUpdate { game_id, .. }
            | Self::PowersControllers { game_id, .. }
            | Self::PowerOrdersUpdate { game_id, .. }
            | Self::PowerOrdersFlag { game_id, .. }
            | Self::PowerWaitFlag { game_id, .. }
            | Self::GameMessageReceived { game_id, .. }
            | Self::VoteUpdated { game_id, .. }
            | Self::VoteCountUpdated { game_id, .. }
            | Self::PowerVoteUpdated { game_id, .. }
            | Self::GameDeleted { game_id }
            | Self::OmniscientUpdated { game_id, .. }
            | Self::ClearedCenters { game_id, .. }
            | Self::ClearedOrders { game_id, .. }
            | Self::ClearedUnits { game_id, .. } => Some(game_id),
        }
    }
}
