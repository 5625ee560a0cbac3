//! In-memory ledger and oracle for tests and local runs without a network.

use super::{
    LedgerError, LedgerSource, OracleError, PriceOracle, RawCoinFeed, RawGame, RawPlayer,
    RawWinner,
};
use crate::domain::{Address, Decimal, GameId};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, Default)]
struct MockGame {
    game: Option<RawGame>,
    players: Vec<(RawPlayer, Vec<String>)>,
    coin_feeds: HashMap<String, RawCoinFeed>,
    winners: HashMap<Address, RawWinner>,
}

/// Mock ledger that serves predefined games and counts round trips.
#[derive(Debug, Clone, Default)]
pub struct MockLedger {
    games: HashMap<GameId, MockGame>,
    round_trips: Arc<AtomicUsize>,
    unavailable: Arc<AtomicBool>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_game(mut self, game_id: GameId, game: RawGame) -> Self {
        self.games.entry(game_id).or_default().game = Some(game);
        self
    }

    /// Add a player with their non-captain feeds.
    pub fn with_player(
        mut self,
        game_id: GameId,
        player: RawPlayer,
        coin_feeds: Vec<String>,
    ) -> Self {
        self.games
            .entry(game_id)
            .or_default()
            .players
            .push((player, coin_feeds));
        self
    }

    pub fn with_coin_feed(mut self, game_id: GameId, feed: RawCoinFeed) -> Self {
        self.games
            .entry(game_id)
            .or_default()
            .coin_feeds
            .insert(feed.feed.to_lowercase(), feed);
        self
    }

    pub fn with_winner(mut self, game_id: GameId, account: Address, winner: RawWinner) -> Self {
        self.games
            .entry(game_id)
            .or_default()
            .winners
            .insert(account, winner);
        self
    }

    /// Number of requests served so far, across clones.
    pub fn round_trips(&self) -> usize {
        self.round_trips.load(Ordering::SeqCst)
    }

    /// Toggle a simulated outage; every call fails with a network error while set.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn begin_call(&self) -> Result<(), LedgerError> {
        self.round_trips.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(LedgerError::Network("mock ledger unavailable".to_string()));
        }
        Ok(())
    }

    fn game(&self, game_id: GameId) -> Result<&MockGame, LedgerError> {
        self.games.get(&game_id).ok_or_else(|| LedgerError::Rpc {
            code: -32000,
            message: format!("game {} does not exist", game_id),
        })
    }
}

#[async_trait]
impl LedgerSource for MockLedger {
    async fn fetch_game(&self, game_id: GameId) -> Result<Option<RawGame>, LedgerError> {
        self.begin_call()?;
        Ok(self.games.get(&game_id).and_then(|g| g.game.clone()))
    }

    async fn fetch_players(&self, game_id: GameId) -> Result<Vec<RawPlayer>, LedgerError> {
        self.begin_call()?;
        Ok(self
            .games
            .get(&game_id)
            .map(|g| g.players.iter().map(|(p, _)| p.clone()).collect())
            .unwrap_or_default())
    }

    async fn fetch_player_coin_feeds(
        &self,
        game_id: GameId,
        player_indexes: &[usize],
    ) -> Result<Vec<Vec<String>>, LedgerError> {
        self.begin_call()?;
        let game = self.game(game_id)?;
        player_indexes
            .iter()
            .map(|&index| {
                game.players
                    .get(index)
                    .map(|(_, feeds)| feeds.clone())
                    .ok_or_else(|| LedgerError::Rpc {
                        code: -32000,
                        message: format!("player index {} out of range", index),
                    })
            })
            .collect()
    }

    async fn fetch_coin_feeds(
        &self,
        game_id: GameId,
        feeds: &[Address],
    ) -> Result<Vec<RawCoinFeed>, LedgerError> {
        self.begin_call()?;
        let game = self.game(game_id)?;
        Ok(feeds
            .iter()
            .map(|feed| {
                game.coin_feeds
                    .get(feed.as_str())
                    .cloned()
                    .unwrap_or_else(|| RawCoinFeed {
                        feed: feed.as_str().to_string(),
                        start_price: "0".to_string(),
                        end_price: "0".to_string(),
                        score: "0".to_string(),
                    })
            })
            .collect())
    }

    async fn fetch_winner(
        &self,
        game_id: GameId,
        account: &Address,
    ) -> Result<RawWinner, LedgerError> {
        self.begin_call()?;
        Ok(self
            .games
            .get(&game_id)
            .and_then(|g| g.winners.get(account).cloned())
            .unwrap_or_else(|| RawWinner {
                place: "0".to_string(),
                score: "0".to_string(),
                winner_address: Address::ZERO_HEX.to_string(),
                claimed: false,
            }))
    }
}

#[derive(Debug, Clone)]
enum PriceBehavior {
    Price(Decimal),
    /// Fail this many times, then answer with the price.
    FailThen(usize, Decimal),
    AlwaysFail,
}

/// Mock oracle with per-feed prices, failures and latencies. Records every call.
#[derive(Debug, Clone, Default)]
pub struct MockPriceOracle {
    behaviors: HashMap<Address, PriceBehavior>,
    delays: HashMap<Address, Duration>,
    calls: Arc<Mutex<HashMap<Address, usize>>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl MockPriceOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_price(mut self, feed: Address, price: Decimal) -> Self {
        self.behaviors.insert(feed, PriceBehavior::Price(price));
        self
    }

    pub fn with_failure(mut self, feed: Address) -> Self {
        self.behaviors.insert(feed, PriceBehavior::AlwaysFail);
        self
    }

    /// Fail the first `failures` lookups of `feed`, then return `price`.
    pub fn with_transient_failure(
        mut self,
        feed: Address,
        failures: usize,
        price: Decimal,
    ) -> Self {
        self.behaviors
            .insert(feed, PriceBehavior::FailThen(failures, price));
        self
    }

    pub fn with_delay(mut self, feed: Address, delay: Duration) -> Self {
        self.delays.insert(feed, delay);
        self
    }

    /// How many times `feed` was looked up, across clones.
    pub fn calls_for(&self, feed: &Address) -> usize {
        self.calls
            .lock()
            .map(|calls| calls.get(feed).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls
            .lock()
            .map(|calls| calls.values().sum())
            .unwrap_or(0)
    }

    /// Highest number of lookups that were in flight at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn record_call(&self, feed: &Address) -> usize {
        let mut calls = match self.calls.lock() {
            Ok(calls) => calls,
            Err(poisoned) => poisoned.into_inner(),
        };
        let count = calls.entry(feed.clone()).or_insert(0);
        *count += 1;
        *count
    }
}

#[async_trait]
impl PriceOracle for MockPriceOracle {
    async fn current_price(&self, feed: &Address) -> Result<Decimal, OracleError> {
        let attempt = self.record_call(feed);

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delays.get(feed) {
            tokio::time::sleep(*delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.behaviors.get(feed) {
            Some(PriceBehavior::Price(price)) => Ok(*price),
            Some(PriceBehavior::FailThen(failures, price)) => {
                if attempt <= *failures {
                    Err(OracleError::Request(format!("attempt {} failed", attempt)))
                } else {
                    Ok(*price)
                }
            }
            Some(PriceBehavior::AlwaysFail) => {
                Err(OracleError::Request("oracle call reverted".to_string()))
            }
            None => Err(OracleError::Request(format!("unknown feed {}", feed))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn addr(n: u8) -> Address {
        Address::from_str(&format!("0x{:040x}", n)).unwrap()
    }

    #[tokio::test]
    async fn test_mock_ledger_counts_round_trips() {
        let ledger = MockLedger::new();
        let game = ledger.fetch_game(GameId::new(1)).await.unwrap();
        assert!(game.is_none());
        ledger.fetch_players(GameId::new(1)).await.unwrap();
        assert_eq!(ledger.round_trips(), 2);
    }

    #[tokio::test]
    async fn test_mock_ledger_outage() {
        let ledger = MockLedger::new();
        ledger.set_unavailable(true);
        let err = ledger.fetch_game(GameId::new(1)).await.unwrap_err();
        assert!(matches!(err, LedgerError::Network(_)));
    }

    #[tokio::test]
    async fn test_mock_ledger_unset_winner_is_sentinel() {
        let ledger = MockLedger::new();
        let winner = ledger.fetch_winner(GameId::new(1), &addr(1)).await.unwrap();
        assert_eq!(winner.winner_address, Address::ZERO_HEX);
    }

    #[tokio::test]
    async fn test_mock_oracle_transient_failure_then_price() {
        let oracle =
            MockPriceOracle::new().with_transient_failure(addr(1), 1, Decimal::from_i64(5));
        assert!(oracle.current_price(&addr(1)).await.is_err());
        assert_eq!(oracle.current_price(&addr(1)).await.unwrap(), Decimal::from_i64(5));
        assert_eq!(oracle.calls_for(&addr(1)), 2);
    }

    #[tokio::test]
    async fn test_mock_oracle_unknown_feed_fails() {
        let oracle = MockPriceOracle::new();
        assert!(oracle.current_price(&addr(9)).await.is_err());
        assert_eq!(oracle.total_calls(), 1);
    }
}
