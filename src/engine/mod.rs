//! Settlement computation: assembling ledger records into a game, resolving prices,
//! scoring and ranking.
//!
//! Everything here except the price cache is pure and deterministic for a given input.

pub mod assembler;
pub mod lifecycle;
pub mod price_cache;
pub mod ranking;
pub mod scoring;

pub use assembler::{assemble_game, assemble_winner};
pub use lifecycle::{lifecycle_phase, lifecycle_report, LifecyclePhase, LifecycleReport};
pub use price_cache::{PriceFeedCache, PriceTable};
pub use ranking::{
    claim_eligibility, rank_players, resolve_settlement, ClaimEligibility, RankedPlayer,
    Settlement, UnscoredPlayer,
};
pub use scoring::{
    apply_captain_bonus, feed_score, score_player, FeedIssue, PlayerScore, SCORE_SCALE,
};
