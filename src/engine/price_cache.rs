//! Per-pass memoization of current feed prices.

use crate::domain::{Address, Decimal};
use crate::error::{FeedFailure, SettlementError};
use crate::ledger::PriceOracle;
use futures::stream::{self, StreamExt};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Outcome of resolving each feed of one pass.
pub type PriceTable = BTreeMap<Address, Result<Decimal, FeedFailure>>;

/// Fetches each distinct feed at most once per successful lookup.
///
/// Scoped to a single aggregation pass. Failed lookups are not cached, so asking again
/// within the same pass retries the oracle.
#[derive(Debug)]
pub struct PriceFeedCache {
    oracle: Arc<dyn PriceOracle>,
    concurrency: usize,
    resolved: HashMap<Address, Decimal>,
}

impl PriceFeedCache {
    /// `concurrency` bounds simultaneous oracle calls; values below 1 are treated as 1.
    pub fn new(oracle: Arc<dyn PriceOracle>, concurrency: usize) -> Self {
        Self {
            oracle,
            concurrency: concurrency.max(1),
            resolved: HashMap::new(),
        }
    }

    pub fn cached(&self, feed: &Address) -> Option<Decimal> {
        self.resolved.get(feed).copied()
    }

    pub fn len(&self) -> usize {
        self.resolved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolved.is_empty()
    }

    /// Current price of one feed.
    pub async fn resolve(&mut self, feed: &Address) -> Result<Decimal, FeedFailure> {
        if let Some(price) = self.cached(feed) {
            return Ok(price);
        }

        match self.oracle.current_price(feed).await {
            Ok(price) => {
                self.resolved.insert(feed.clone(), price);
                Ok(price)
            }
            Err(e) => {
                warn!(feed = %feed, error = %e, "Price lookup failed");
                Err(FeedFailure::PriceUnavailable(e.to_string()))
            }
        }
    }

    /// Resolve every listed feed, issuing the uncached lookups concurrently.
    ///
    /// Returns only once every lookup has finished, so the table never depends on
    /// completion order. Cancelling `cancel` drops all in-flight lookups.
    pub async fn resolve_all<'a, I>(
        &mut self,
        feeds: I,
        cancel: &CancellationToken,
    ) -> Result<PriceTable, SettlementError>
    where
        I: IntoIterator<Item = &'a Address>,
    {
        let requested: HashSet<&Address> = feeds.into_iter().collect();
        let missing: Vec<Address> = requested
            .iter()
            .filter(|feed| !self.resolved.contains_key(**feed))
            .map(|feed| (*feed).clone())
            .collect();

        debug!(
            requested = requested.len(),
            fetching = missing.len(),
            concurrency = self.concurrency,
            "Resolving feed prices"
        );

        let oracle = Arc::clone(&self.oracle);
        let lookups = stream::iter(missing)
            .map(move |feed| {
                let oracle = Arc::clone(&oracle);
                async move {
                    let result = oracle.current_price(&feed).await;
                    (feed, result)
                }
            })
            .buffer_unordered(self.concurrency)
            .collect::<Vec<_>>();

        let fetched = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(SettlementError::Cancelled),
            fetched = lookups => fetched,
        };

        let mut failures: HashMap<Address, FeedFailure> = HashMap::new();
        for (feed, result) in fetched {
            match result {
                Ok(price) => {
                    self.resolved.insert(feed, price);
                }
                Err(e) => {
                    warn!(feed = %feed, error = %e, "Price lookup failed");
                    failures.insert(feed, FeedFailure::PriceUnavailable(e.to_string()));
                }
            }
        }

        Ok(requested
            .into_iter()
            .map(|feed| {
                let outcome = match self.resolved.get(feed) {
                    Some(price) => Ok(*price),
                    None => Err(failures.remove(feed).unwrap_or_else(|| {
                        FeedFailure::PriceUnavailable("not resolved".to_string())
                    })),
                };
                (feed.clone(), outcome)
            })
            .collect())
    }
}
