//! Ranking and settlement resolution.

use crate::domain::{
    Address, CoinFeed, Decimal, Game, GameDirection, GameId, Player, WinnerRecord,
};
use crate::engine::lifecycle::{lifecycle_phase, LifecyclePhase};
use crate::engine::price_cache::PriceTable;
use crate::engine::scoring::{
    score_feeds, score_player, FeedIssue, FeedScores, PlayerScore, ScoreOutcome,
};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedPlayer {
    /// 0 = first.
    pub place: u32,
    /// Position in the ledger's player list; breaks score ties.
    pub join_index: usize,
    #[serde(flatten)]
    pub player: Player,
    pub computed_score: Decimal,
    pub captain_score: Decimal,
    pub coins_score: Decimal,
}

/// A player whose score could not be computed this pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnscoredPlayer {
    pub join_index: usize,
    #[serde(flatten)]
    pub player: Player,
    pub issues: Vec<FeedIssue>,
}

/// Output of one aggregation pass. Built fresh every pass; nothing is shared with the input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Settlement {
    pub game_id: GameId,
    pub direction: GameDirection,
    pub phase: LifecyclePhase,
    /// Set unless the game has Ended; scores may still move.
    pub provisional: bool,
    pub ranked_players: Vec<RankedPlayer>,
    pub unscored_players: Vec<UnscoredPlayer>,
    pub coin_feeds: BTreeMap<Address, CoinFeed>,
}

/// Order two scores: Low games ascending, High games descending.
pub fn compare_scores(direction: GameDirection, a: &Decimal, b: &Decimal) -> Ordering {
    if direction.ranks_ascending() {
        a.cmp(b)
    } else {
        b.cmp(a)
    }
}

/// Sort scored players and assign places. Equal scores keep join order.
pub fn rank_players(
    direction: GameDirection,
    mut scored: Vec<(usize, Player, PlayerScore)>,
) -> Vec<RankedPlayer> {
    scored.sort_by(|(index_a, _, a), (index_b, _, b)| {
        compare_scores(direction, &a.total, &b.total).then_with(|| index_a.cmp(index_b))
    });

    scored
        .into_iter()
        .enumerate()
        .map(|(place, (join_index, player, score))| RankedPlayer {
            place: place as u32,
            join_index,
            player,
            computed_score: score.total,
            captain_score: score.captain_score,
            coins_score: score.coins_score,
        })
        .collect()
}

/// New feed set whose end prices and scores are the ones used for ranking.
///
/// Feeds without a usable price carry no end price or score, even if the input had one.
pub fn refresh_coin_feeds(
    feeds: &BTreeMap<Address, CoinFeed>,
    prices: &PriceTable,
    feed_scores: &FeedScores,
) -> BTreeMap<Address, CoinFeed> {
    feeds
        .iter()
        .map(|(address, feed)| {
            let end_price = prices.get(address).and_then(|p| p.as_ref().ok()).copied();
            let score = feed_scores.get(address).and_then(|s| s.as_ref().ok()).copied();
            let refreshed = CoinFeed {
                address: address.clone(),
                start_price: feed.start_price,
                end_price,
                score,
            };
            (address.clone(), refreshed)
        })
        .collect()
}

/// Score, rank and package one game against resolved prices.
pub fn resolve_settlement(game: &Game, prices: &PriceTable) -> Settlement {
    let feed_scores = score_feeds(&game.coin_feeds, prices);

    let mut scored = Vec::with_capacity(game.players.len());
    let mut unscored = Vec::new();
    for (join_index, player) in game.players.iter().enumerate() {
        match score_player(game.direction, player, &feed_scores) {
            ScoreOutcome::Scored(score) => scored.push((join_index, player.clone(), score)),
            ScoreOutcome::Unavailable(issues) => unscored.push(UnscoredPlayer {
                join_index,
                player: player.clone(),
                issues,
            }),
        }
    }

    let phase = lifecycle_phase(game);

    Settlement {
        game_id: game.id,
        direction: game.direction,
        phase,
        provisional: phase != LifecyclePhase::Ended,
        ranked_players: rank_players(game.direction, scored),
        unscored_players: unscored,
        coin_feeds: refresh_coin_feeds(&game.coin_feeds, prices, &feed_scores),
    }
}

/// What an account may do with a game's pot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ClaimEligibility {
    NotEnded,
    NotParticipant,
    NotWinner,
    AlreadyClaimed,
    Claimable { place: u32 },
    /// The game was aborted; the entry may be withdrawn.
    Refundable,
}

/// `winner` must already have the sentinel filtered out.
pub fn claim_eligibility(
    game: &Game,
    winner: Option<&WinnerRecord>,
    account: &Address,
) -> ClaimEligibility {
    let participant = game.player(account).is_some();

    match lifecycle_phase(game) {
        LifecyclePhase::Aborted if participant => ClaimEligibility::Refundable,
        _ if !participant => ClaimEligibility::NotParticipant,
        LifecyclePhase::Waiting | LifecyclePhase::Started => ClaimEligibility::NotEnded,
        _ => match winner {
            Some(record) if &record.winner_address == account => {
                if record.claimed {
                    ClaimEligibility::AlreadyClaimed
                } else {
                    ClaimEligibility::Claimable {
                        place: record.place,
                    }
                }
            }
            _ => ClaimEligibility::NotWinner,
        },
    }
}
