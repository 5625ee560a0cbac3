//! Ledger and price oracle abstractions.
//!
//! The ledger is the source of truth for games, players and their feed selections; the
//! oracle reports current prices. Both are remote and latency-expensive, so every method
//! that can be batched takes the whole batch at once.

use crate::domain::{Address, Decimal, GameId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub mod mock;
pub mod reader;
pub mod rpc;

pub use mock::{MockLedger, MockPriceOracle};
pub use reader::{LedgerReader, LedgerSnapshot};
pub use rpc::{JsonRpcClient, RpcLedger, RpcPriceOracle};

/// Game record exactly as the ledger reports it. Integers are base-10 strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawGame {
    pub game_type: String,
    pub duration: String,
    pub start_timestamp: String,
    pub abort_timestamp: String,
    pub amount_to_play: String,
    pub coin_to_play: String,
    pub num_coins: String,
    pub num_players: String,
    pub total_amount_collected: String,
    pub started: bool,
    pub finished: bool,
    pub aborted: bool,
    pub scores_done: bool,
}

/// Player entry from the game's player list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPlayer {
    pub player_address: String,
    pub captain_coin: String,
    pub affiliate: String,
    pub score: String,
}

/// Per-game feed detail: start price fixed at game start, end price and score once settled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCoinFeed {
    pub feed: String,
    pub start_price: String,
    pub end_price: String,
    pub score: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawWinner {
    pub place: String,
    pub score: String,
    pub winner_address: String,
    pub claimed: bool,
}

/// Read-side ledger queries.
///
/// Implementations must not retry; retry policy belongs to the caller.
#[async_trait]
pub trait LedgerSource: Send + Sync + fmt::Debug {
    /// Fetch the game record, or `None` if no game has this id.
    async fn fetch_game(&self, game_id: GameId) -> Result<Option<RawGame>, LedgerError>;

    /// Fetch the player list in join order.
    async fn fetch_players(&self, game_id: GameId) -> Result<Vec<RawPlayer>, LedgerError>;

    /// Fetch the non-captain feeds of each listed player in one round trip.
    ///
    /// The result is aligned with `player_indexes`.
    async fn fetch_player_coin_feeds(
        &self,
        game_id: GameId,
        player_indexes: &[usize],
    ) -> Result<Vec<Vec<String>>, LedgerError>;

    /// Fetch the per-game detail of each listed feed in one round trip.
    ///
    /// The result is aligned with `feeds`.
    async fn fetch_coin_feeds(
        &self,
        game_id: GameId,
        feeds: &[Address],
    ) -> Result<Vec<RawCoinFeed>, LedgerError>;

    /// Fetch the winner record for an account. Unsettled games report the zero address.
    async fn fetch_winner(
        &self,
        game_id: GameId,
        account: &Address,
    ) -> Result<RawWinner, LedgerError>;
}

/// Current-price lookups against the price oracle.
#[async_trait]
pub trait PriceOracle: Send + Sync + fmt::Debug {
    async fn current_price(&self, feed: &Address) -> Result<Decimal, OracleError>;
}

/// Error type for ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Connection timeout, DNS failure and the like.
    #[error("Network error: {0}")]
    Network(String),
    #[error("HTTP error {status}: {message}")]
    Http { status: u16, message: String },
    /// The endpoint answered with a JSON-RPC error object.
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },
    /// The endpoint answered with something we could not decode.
    #[error("Parse error: {0}")]
    Parse(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OracleError {
    #[error("oracle request failed: {0}")]
    Request(String),
    #[error("oracle returned an invalid price: {0}")]
    InvalidPrice(String),
}

impl From<LedgerError> for OracleError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Parse(msg) => OracleError::InvalidPrice(msg),
            other => OracleError::Request(other.to_string()),
        }
    }
}
