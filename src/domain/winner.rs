use crate::domain::{Address, Decimal};
use serde::{Deserialize, Serialize};

/// Settlement outcome the ledger holds for one account.
///
/// A zero `winner_address` means nothing has been recorded yet; such a record must not be
/// treated as a winner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WinnerRecord {
    /// Rank, 0 = first.
    pub place: u32,
    pub score: Decimal,
    pub winner_address: Address,
    pub claimed: bool,
}

impl WinnerRecord {
    pub fn unresolved() -> Self {
        Self {
            place: 0,
            score: Decimal::zero(),
            winner_address: Address::zero(),
            claimed: false,
        }
    }

    pub fn is_resolved(&self) -> bool {
        !self.winner_address.is_zero()
    }

    /// Converts the sentinel into absence.
    pub fn into_resolved(self) -> Option<Self> {
        self.is_resolved().then_some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_sentinel_is_not_resolved() {
        let record = WinnerRecord::unresolved();
        assert!(record.winner_address.is_zero());
        assert!(!record.is_resolved());
        assert_eq!(record.into_resolved(), None);
    }

    #[test]
    fn test_real_winner_is_resolved() {
        let record = WinnerRecord {
            place: 0,
            score: Decimal::from_i64(1200),
            winner_address: Address::from_str("0x00000000000000000000000000000000000000a1")
                .unwrap(),
            claimed: false,
        };
        assert!(record.is_resolved());
        assert_eq!(record.clone().into_resolved(), Some(record));
    }
}
