//! Lossless decimal numeric type backed by rust_decimal.
//!
//! Ledger integers (prices, wei amounts, scores) are carried as integral decimals so that
//! every score computation is exact and reproducible.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal as RustDecimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Lossless decimal numeric type for ledger values.
///
/// Serializes to a JSON string so large token amounts survive the trip to a UI intact.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Decimal(#[serde(with = "rust_decimal::serde::str")] RustDecimal);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerIntError {
    #[error("not a number: {0}")]
    Invalid(String),
    #[error("not an integer: {0}")]
    Fractional(String),
}

impl Decimal {
    /// Parse a Decimal from a string losslessly.
    pub fn from_str_canonical(s: &str) -> Result<Self, rust_decimal::Error> {
        RustDecimal::from_str(s).map(Decimal)
    }

    /// Parse an integral ledger value (e.g. a uint256 rendered in base 10).
    ///
    /// Fractional values are rejected: the ledger only ever reports integers.
    pub fn from_ledger_int(s: &str) -> Result<Self, LedgerIntError> {
        let value = RustDecimal::from_str(s.trim())
            .map_err(|_| LedgerIntError::Invalid(s.to_string()))?;
        if !value.fract().is_zero() {
            return Err(LedgerIntError::Fractional(s.to_string()));
        }
        Ok(Decimal(value.normalize()))
    }

    pub fn from_i64(value: i64) -> Self {
        Decimal(RustDecimal::from(value))
    }

    /// Format the Decimal as a canonical string (no exponent notation).
    pub fn to_canonical_string(&self) -> String {
        let normalized = self.0.normalize();
        format!("{}", normalized)
    }

    /// The additive identity (0).
    pub fn zero() -> Self {
        Decimal(RustDecimal::ZERO)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// The value as an i128, if it is integral and in range.
    pub fn to_i128(&self) -> Option<i128> {
        if !self.0.fract().is_zero() {
            return None;
        }
        self.0.to_i128()
    }

    /// `None` if the value exceeds the 96-bit mantissa.
    pub fn from_i128(value: i128) -> Option<Self> {
        RustDecimal::from_i128(value).map(Decimal)
    }

    /// The value as an i64, if it is integral and in range.
    pub fn to_i64(&self) -> Option<i64> {
        if !self.0.fract().is_zero() {
            return None;
        }
        self.0.to_i64()
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_canonical_string())
    }
}

impl FromStr for Decimal {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_canonical(s)
    }
}
