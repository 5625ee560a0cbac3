//! Player scoring from feed price movements.
//!
//! Scores are integer percentages in hundred-thousandths. All arithmetic is checked integer
//! math with division truncating toward zero, so a score depends only on the two prices
//! involved.

use crate::domain::{Address, CoinFeed, Decimal, GameDirection, Player};
use crate::engine::price_cache::PriceTable;
use crate::error::FeedFailure;
use serde::Serialize;
use std::collections::BTreeMap;

/// Scale of a feed score: a move of 1% scores 1000.
pub const SCORE_SCALE: i128 = 100_000;

/// Captain bonus as a ratio, 12/10 = 1.2.
const CAPTAIN_BONUS_NUM: i128 = 12;
const CAPTAIN_BONUS_DEN: i128 = 10;

/// Score of each feed for one pass, keyed by feed address.
pub type FeedScores = BTreeMap<Address, Result<Decimal, FeedFailure>>;

fn overflow() -> FeedFailure {
    FeedFailure::PriceUnavailable("score arithmetic overflow".to_string())
}

fn as_int(value: Decimal) -> Result<i128, FeedFailure> {
    value.to_i128().ok_or_else(|| {
        FeedFailure::PriceUnavailable(format!("price {} is not an integer", value))
    })
}

fn to_decimal(value: i128) -> Result<Decimal, FeedFailure> {
    Decimal::from_i128(value).ok_or_else(overflow)
}

/// `(current - start) * 100000 / current`, truncated toward zero.
///
/// A zero current price is a [`FeedFailure::DivisionByZero`].
pub fn feed_score(start_price: Decimal, current_price: Decimal) -> Result<Decimal, FeedFailure> {
    let start = as_int(start_price)?;
    let current = as_int(current_price)?;
    if current == 0 {
        return Err(FeedFailure::DivisionByZero);
    }

    let score = current
        .checked_sub(start)
        .and_then(|delta| delta.checked_mul(SCORE_SCALE))
        .and_then(|scaled| scaled.checked_div(current))
        .ok_or_else(overflow)?;
    to_decimal(score)
}

/// Applies the 1.2x bonus when the captain moved the way the game rewards.
///
/// High games reward `raw >= 0`, Low games reward `raw <= 0`; anything else is unchanged.
pub fn apply_captain_bonus(
    direction: GameDirection,
    raw_score: Decimal,
) -> Result<Decimal, FeedFailure> {
    let raw = as_int(raw_score)?;
    let rewarded = match direction {
        GameDirection::High => raw >= 0,
        GameDirection::Low => raw <= 0,
    };
    if !rewarded {
        return Ok(raw_score);
    }

    let boosted = raw
        .checked_mul(CAPTAIN_BONUS_NUM)
        .map(|v| v / CAPTAIN_BONUS_DEN)
        .ok_or_else(overflow)?;
    to_decimal(boosted)
}

/// Score every feed of the game against the resolved prices.
pub fn score_feeds(feeds: &BTreeMap<Address, CoinFeed>, prices: &PriceTable) -> FeedScores {
    feeds
        .iter()
        .map(|(address, feed)| {
            let score = match prices.get(address) {
                Some(Ok(price)) => feed_score(feed.start_price, *price),
                Some(Err(failure)) => Err(failure.clone()),
                None => Err(FeedFailure::PriceUnavailable("not resolved".to_string())),
            };
            (address.clone(), score)
        })
        .collect()
}

/// Breakdown of one player's score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerScore {
    /// Captain score after the directional bonus.
    pub captain_score: Decimal,
    pub coins_score: Decimal,
    pub total: Decimal,
}

/// A feed that kept a player from being scored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedIssue {
    pub feed: Address,
    pub failure: FeedFailure,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScoreOutcome {
    Scored(PlayerScore),
    /// Every failing feed of the player, captain first.
    Unavailable(Vec<FeedIssue>),
}

/// Score one player: bonus-adjusted captain score plus the plain sum of coin scores.
pub fn score_player(
    direction: GameDirection,
    player: &Player,
    feed_scores: &FeedScores,
) -> ScoreOutcome {
    let mut issues = Vec::new();
    let mut lookup = |feed: &Address| -> Option<Decimal> {
        let result = feed_scores
            .get(feed)
            .cloned()
            .unwrap_or_else(|| Err(FeedFailure::PriceUnavailable("unknown feed".to_string())));
        match result {
            Ok(score) => Some(score),
            Err(failure) => {
                issues.push(FeedIssue {
                    feed: feed.clone(),
                    failure,
                });
                None
            }
        }
    };

    let captain_raw = lookup(&player.captain_coin);
    let coin_scores: Vec<Option<Decimal>> = player.coin_feeds.iter().map(&mut lookup).collect();

    let (Some(captain_raw), true) = (captain_raw, issues.is_empty()) else {
        return ScoreOutcome::Unavailable(issues);
    };

    let captain_score = match apply_captain_bonus(direction, captain_raw) {
        Ok(score) => score,
        Err(failure) => {
            return ScoreOutcome::Unavailable(vec![FeedIssue {
                feed: player.captain_coin.clone(),
                failure,
            }])
        }
    };

    let coin_scores: Vec<Decimal> = coin_scores.into_iter().flatten().collect();
    match sum_scores(captain_score, &coin_scores) {
        Ok((coins_score, total)) => ScoreOutcome::Scored(PlayerScore {
            captain_score,
            coins_score,
            total,
        }),
        Err(failure) => ScoreOutcome::Unavailable(vec![FeedIssue {
            feed: player.captain_coin.clone(),
            failure,
        }]),
    }
}

/// Returns `(coins_sum, captain + coins_sum)`.
fn sum_scores(captain: Decimal, coins: &[Decimal]) -> Result<(Decimal, Decimal), FeedFailure> {
    let mut coins_sum: i128 = 0;
    for score in coins {
        coins_sum = coins_sum.checked_add(as_int(*score)?).ok_or_else(overflow)?;
    }
    let total = as_int(captain)?
        .checked_add(coins_sum)
        .ok_or_else(overflow)?;
    Ok((to_decimal(coins_sum)?, to_decimal(total)?))
}
