use crate::config::Config;
use crate::domain::{Address, Game, GameId, Timestamp, WinnerRecord};
use crate::engine::{
    assemble_game, assemble_winner, claim_eligibility, lifecycle_report, resolve_settlement,
    ClaimEligibility, LifecycleReport, PriceFeedCache, Settlement,
};
use crate::error::SettlementError;
use crate::ledger::{LedgerReader, LedgerSource, PriceOracle};
use backoff::future::retry;
use backoff::ExponentialBackoff;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Entry point for one settlement request: read, assemble, price, score, rank.
///
/// Holds no state between calls; every pass builds its own price cache.
#[derive(Debug, Clone)]
pub struct SettlementService {
    reader: LedgerReader,
    oracle: Arc<dyn PriceOracle>,
    config: Config,
}

impl SettlementService {
    pub fn new(
        ledger: Arc<dyn LedgerSource>,
        oracle: Arc<dyn PriceOracle>,
        config: Config,
    ) -> Self {
        Self {
            reader: LedgerReader::new(ledger),
            oracle,
            config,
        }
    }

    /// Read and assemble the game without pricing it.
    pub async fn load_game(
        &self,
        game_id: GameId,
        cancel: &CancellationToken,
    ) -> Result<Game, SettlementError> {
        let snapshot = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(SettlementError::Cancelled),
            snapshot = self.reader.read_game(game_id) => snapshot?,
        };
        assemble_game(&snapshot)
    }

    /// One aggregation pass.
    ///
    /// Feed failures do not fail the pass; affected players come back unscored.
    /// A game that has not Ended is still settled, flagged provisional.
    pub async fn aggregate_settlement(
        &self,
        game_id: GameId,
        cancel: &CancellationToken,
    ) -> Result<Settlement, SettlementError> {
        let game = self.load_game(game_id, cancel).await?;

        let mut cache =
            PriceFeedCache::new(Arc::clone(&self.oracle), self.config.price_fetch_concurrency);
        let prices = cache.resolve_all(game.coin_feeds.keys(), cancel).await?;

        let settlement = resolve_settlement(&game, &prices);

        info!(
            game_id = %game_id,
            phase = %settlement.phase,
            feeds = game.coin_feeds.len(),
            ranked = settlement.ranked_players.len(),
            unscored = settlement.unscored_players.len(),
            provisional = settlement.provisional,
            "Settlement pass complete"
        );

        Ok(settlement)
    }

    /// [`Self::aggregate_settlement`] retried with exponential backoff while the ledger
    /// is unavailable. Every other error is returned immediately.
    pub async fn aggregate_settlement_with_retry(
        &self,
        game_id: GameId,
        cancel: &CancellationToken,
    ) -> Result<Settlement, SettlementError> {
        let backoff = ExponentialBackoff {
            max_elapsed_time: Some(self.config.ledger_retry_max_elapsed()),
            ..Default::default()
        };

        retry(backoff, || async {
            match self.aggregate_settlement(game_id, cancel).await {
                Ok(settlement) => Ok(settlement),
                Err(e) if e.is_retryable() && !cancel.is_cancelled() => {
                    warn!(game_id = %game_id, error = %e, "Ledger unavailable, retrying");
                    Err(backoff::Error::transient(e))
                }
                Err(e) => Err(backoff::Error::permanent(e)),
            }
        })
        .await
    }

    pub async fn lifecycle(
        &self,
        game_id: GameId,
        now: Timestamp,
        cancel: &CancellationToken,
    ) -> Result<LifecycleReport, SettlementError> {
        let game = self.load_game(game_id, cancel).await?;
        Ok(lifecycle_report(&game, now))
    }

    /// The account's winner record, or `None` while the ledger reports the zero sentinel.
    pub async fn winner_record(
        &self,
        game_id: GameId,
        account: &Address,
    ) -> Result<Option<WinnerRecord>, SettlementError> {
        let raw = self.reader.read_winner(game_id, account).await?;
        Ok(assemble_winner(&raw)?.into_resolved())
    }

    /// Winner record together with what the account may claim.
    pub async fn claim_status(
        &self,
        game_id: GameId,
        account: &Address,
        cancel: &CancellationToken,
    ) -> Result<(Option<WinnerRecord>, ClaimEligibility), SettlementError> {
        let game = self.load_game(game_id, cancel).await?;
        let winner = self.winner_record(game_id, account).await?;
        let eligibility = claim_eligibility(&game, winner.as_ref(), account);
        Ok((winner, eligibility))
    }
}
