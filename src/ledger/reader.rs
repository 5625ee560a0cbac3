//! Batched reads of everything one settlement pass needs from the ledger.

use super::{LedgerSource, RawCoinFeed, RawGame, RawPlayer, RawWinner};
use crate::domain::{Address, GameId};
use crate::error::SettlementError;
use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};

/// Raw ledger state for one game, as read in a single pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerSnapshot {
    pub game_id: GameId,
    pub game: RawGame,
    /// Players in join order.
    pub players: Vec<RawPlayer>,
    /// Non-captain feeds, aligned with `players`.
    pub player_coin_feeds: Vec<Vec<String>>,
    /// Detail of every distinct feed referenced by any player.
    pub coin_feeds: Vec<RawCoinFeed>,
}

/// Reads a game in a fixed number of round trips, independent of player count:
/// game record and player list concurrently, then one batch of coin-feed lists,
/// then one batch of feed details.
#[derive(Debug, Clone)]
pub struct LedgerReader {
    ledger: Arc<dyn LedgerSource>,
}

impl LedgerReader {
    pub fn new(ledger: Arc<dyn LedgerSource>) -> Self {
        Self { ledger }
    }

    pub async fn read_game(&self, game_id: GameId) -> Result<LedgerSnapshot, SettlementError> {
        let (game, players) = tokio::join!(
            self.ledger.fetch_game(game_id),
            self.ledger.fetch_players(game_id)
        );

        let game = game?.ok_or(SettlementError::GameNotFound(game_id))?;
        let players = players?;

        if players.is_empty() {
            debug!(game_id = %game_id, "Game has no players yet");
            return Ok(LedgerSnapshot {
                game_id,
                game,
                players,
                player_coin_feeds: Vec::new(),
                coin_feeds: Vec::new(),
            });
        }

        let indexes: Vec<usize> = (0..players.len()).collect();
        let player_coin_feeds = self
            .ledger
            .fetch_player_coin_feeds(game_id, &indexes)
            .await?;
        if player_coin_feeds.len() != players.len() {
            return Err(SettlementError::MalformedRecord(format!(
                "expected coin feeds for {} players, got {}",
                players.len(),
                player_coin_feeds.len()
            )));
        }

        let feeds = distinct_feeds(&players, &player_coin_feeds)?;
        let coin_feeds = self.ledger.fetch_coin_feeds(game_id, &feeds).await?;
        if coin_feeds.len() != feeds.len() {
            return Err(SettlementError::MalformedRecord(format!(
                "expected {} coin feed details, got {}",
                feeds.len(),
                coin_feeds.len()
            )));
        }

        info!(
            game_id = %game_id,
            players = players.len(),
            feeds = feeds.len(),
            "Read game from ledger"
        );

        Ok(LedgerSnapshot {
            game_id,
            game,
            players,
            player_coin_feeds,
            coin_feeds,
        })
    }

    pub async fn read_winner(
        &self,
        game_id: GameId,
        account: &Address,
    ) -> Result<RawWinner, SettlementError> {
        Ok(self.ledger.fetch_winner(game_id, account).await?)
    }
}

/// Every feed referenced by any player, first-seen order, duplicates collapsed.
fn distinct_feeds(
    players: &[RawPlayer],
    player_coin_feeds: &[Vec<String>],
) -> Result<Vec<Address>, SettlementError> {
    let mut seen = HashSet::new();
    let mut feeds = Vec::new();

    let refs = players
        .iter()
        .zip(player_coin_feeds)
        .flat_map(|(player, coins)| std::iter::once(&player.captain_coin).chain(coins.iter()));

    for raw in refs {
        let feed = Address::from_str(raw)
            .map_err(|e| SettlementError::MalformedRecord(format!("feed address: {}", e)))?;
        if seen.insert(feed.clone()) {
            feeds.push(feed);
        }
    }

    Ok(feeds)
}
