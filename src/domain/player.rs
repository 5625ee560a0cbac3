//! Player entity and coin feed records.

use crate::domain::{Address, Decimal};
use serde::{Deserialize, Serialize};

/// A participant and their feed selections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub address: Address,
    pub captain_coin: Address,
    /// Non-captain feeds, in the order the player picked them. Never contains the captain.
    pub coin_feeds: Vec<Address>,
    pub affiliate: Option<Address>,
    /// Score as last written to the ledger. Unset (zero) before settlement.
    pub raw_chain_score: Decimal,
}

impl Player {
    /// Captain followed by the non-captain feeds.
    pub fn all_feeds(&self) -> impl Iterator<Item = &Address> {
        std::iter::once(&self.captain_coin).chain(self.coin_feeds.iter())
    }
}

/// One price feed as referenced by a game.
///
/// `end_price` and `score` are only populated once a settlement pass resolves a price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinFeed {
    pub address: Address,
    pub start_price: Decimal,
    pub end_price: Option<Decimal>,
    /// Percentage move in hundred-thousandths, without any captain bonus.
    pub score: Option<Decimal>,
}

impl CoinFeed {
    pub fn new(address: Address, start_price: Decimal) -> Self {
        Self {
            address,
            start_price,
            end_price: None,
            score: None,
        }
    }
}
