//! Domain primitives: Address, GameId, Timestamp.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Unix timestamp in seconds, the resolution the ledger reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn new(secs: i64) -> Self {
        Timestamp(secs)
    }

    pub fn now() -> Self {
        Timestamp(chrono::Utc::now().timestamp())
    }

    pub fn as_secs(&self) -> i64 {
        self.0
    }

    pub fn saturating_add_secs(self, secs: i64) -> Self {
        Timestamp(self.0.saturating_add(secs))
    }
}

/// Numeric game identifier as assigned by the game factory contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GameId(pub u64);

impl GameId {
    pub fn new(id: u64) -> Self {
        GameId(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for GameId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 20-byte account or contract address, stored as lowercase `0x`-prefixed hex.
///
/// The all-zero address is the ledger's "unset" sentinel; see [`Address::is_zero`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressParseError {
    #[error("address must start with 0x: {0}")]
    MissingPrefix(String),
    #[error("address must be 20 bytes of hex: {0}")]
    InvalidHex(String),
}

impl Address {
    pub const ZERO_HEX: &'static str = "0x0000000000000000000000000000000000000000";

    /// The all-zero sentinel address.
    pub fn zero() -> Self {
        Address(Self::ZERO_HEX.to_string())
    }

    /// Returns true for the sentinel, which never denotes a real participant.
    pub fn is_zero(&self) -> bool {
        self.0 == Self::ZERO_HEX
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let body = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .ok_or_else(|| AddressParseError::MissingPrefix(s.to_string()))?;

        let bytes = hex::decode(body).map_err(|_| AddressParseError::InvalidHex(s.to_string()))?;
        if bytes.len() != 20 {
            return Err(AddressParseError::InvalidHex(s.to_string()));
        }

        Ok(Address(format!("0x{}", hex::encode(bytes))))
    }
}

impl TryFrom<String> for Address {
    type Error = AddressParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Address::from_str(&value)
    }
}

impl From<Address> for String {
    fn from(value: Address) -> Self {
        value.0
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
