//! Domain types for game settlement.
//!
//! This module provides:
//! - Lossless integral numerics via the Decimal wrapper
//! - Domain primitives: Address (with the zero sentinel), GameId, Timestamp
//! - Game, Player, CoinFeed and WinnerRecord entities

pub mod decimal;
pub mod game;
pub mod player;
pub mod primitives;
pub mod winner;

pub use decimal::{Decimal, LedgerIntError};
pub use game::{Game, GameDirection};
pub use player::{CoinFeed, Player};
pub use primitives::{Address, AddressParseError, GameId, Timestamp};
pub use winner::WinnerRecord;
