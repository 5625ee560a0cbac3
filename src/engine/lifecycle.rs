//! Game lifecycle derived from ledger flags and timestamps.

use crate::domain::{Game, Timestamp};
use serde::{Deserialize, Serialize};

/// Waiting -> Started -> Ended, with Aborted reachable from Waiting or Started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecyclePhase {
    Waiting,
    Started,
    Ended,
    Aborted,
}

impl LifecyclePhase {
    /// Whether the ledger may move a game from `self` to `next`.
    pub fn can_transition_to(self, next: LifecyclePhase) -> bool {
        matches!(
            (self, next),
            (LifecyclePhase::Waiting, LifecyclePhase::Started)
                | (LifecyclePhase::Started, LifecyclePhase::Ended)
                | (LifecyclePhase::Waiting, LifecyclePhase::Aborted)
                | (LifecyclePhase::Started, LifecyclePhase::Aborted)
        )
    }

    /// Ended and Aborted admit no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, LifecyclePhase::Ended | LifecyclePhase::Aborted)
    }
}

impl std::fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LifecyclePhase::Waiting => "waiting",
            LifecyclePhase::Started => "started",
            LifecyclePhase::Ended => "ended",
            LifecyclePhase::Aborted => "aborted",
        };
        write!(f, "{}", s)
    }
}

/// Phase as recorded by the ledger flags. `aborted` wins over everything else.
pub fn lifecycle_phase(game: &Game) -> LifecyclePhase {
    if game.aborted {
        LifecyclePhase::Aborted
    } else if game.finished {
        LifecyclePhase::Ended
    } else if game.started {
        LifecyclePhase::Started
    } else {
        LifecyclePhase::Waiting
    }
}

/// A started game whose duration has elapsed but that the ledger has not finished yet.
pub fn is_endable(game: &Game, now: Timestamp) -> bool {
    game.started && !game.finished && !game.aborted && now > game.end_timestamp()
}

/// A waiting game whose join window lapsed without it starting.
pub fn is_abortable(game: &Game, now: Timestamp) -> bool {
    !game.started && !game.aborted && now > game.abort_timestamp
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleReport {
    pub phase: LifecyclePhase,
    pub endable: bool,
    pub abortable: bool,
    pub ends_at: Timestamp,
}

pub fn lifecycle_report(game: &Game, now: Timestamp) -> LifecycleReport {
    LifecycleReport {
        phase: lifecycle_phase(game),
        endable: is_endable(game, now),
        abortable: is_abortable(game, now),
        ends_at: game.end_timestamp(),
    }
}
