//! Game entity and its competitive direction.

use crate::domain::{Address, CoinFeed, Decimal, GameId, Player, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which way a game is played.
///
/// The ledger encodes the direction as a small integer: `1` for High, `2` for Low.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameDirection {
    /// Highest score wins; captain bonus applies to non-negative moves.
    High,
    /// Lowest score wins; captain bonus applies to non-positive moves.
    Low,
}

impl GameDirection {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(GameDirection::High),
            2 => Some(GameDirection::Low),
            _ => None,
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            GameDirection::High => 1,
            GameDirection::Low => 2,
        }
    }

    /// Game type flag used by the ranking comparator (`code - 1`).
    pub fn type_flag(&self) -> u8 {
        self.code() - 1
    }

    /// Low games rank ascending (biggest drop wins); High games rank descending.
    pub fn ranks_ascending(&self) -> bool {
        self.type_flag() != 0
    }
}

impl std::fmt::Display for GameDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GameDirection::High => write!(f, "high"),
            GameDirection::Low => write!(f, "low"),
        }
    }
}

/// A game reconstructed from the ledger for one aggregation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    pub id: GameId,
    pub direction: GameDirection,
    pub duration_secs: i64,
    pub start_timestamp: Timestamp,
    pub abort_timestamp: Timestamp,
    /// Entry fee in the entry token's smallest unit.
    pub entry_amount: Decimal,
    pub entry_token: Address,
    pub num_coins_per_player: u32,
    pub num_players_expected: u32,
    pub total_amount_collected: Decimal,
    pub started: bool,
    pub finished: bool,
    pub aborted: bool,
    pub scores_finalized: bool,
    /// Players in ledger join order.
    pub players: Vec<Player>,
    /// Union of every feed any player selected, keyed by feed address.
    pub coin_feeds: BTreeMap<Address, CoinFeed>,
}

impl Game {
    /// The instant after which a started game may be settled.
    pub fn end_timestamp(&self) -> Timestamp {
        self.start_timestamp.saturating_add_secs(self.duration_secs)
    }

    pub fn player(&self, address: &Address) -> Option<&Player> {
        self.players.iter().find(|p| &p.address == address)
    }
}
