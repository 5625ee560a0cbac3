pub mod api;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod orchestration;

pub use config::Config;
pub use domain::{
    Address, CoinFeed, Decimal, Game, GameDirection, GameId, Player, Timestamp, WinnerRecord,
};
pub use engine::{ClaimEligibility, LifecyclePhase, LifecycleReport, Settlement};
pub use error::{AppError, FeedFailure, SettlementError};
pub use ledger::{LedgerSource, MockLedger, MockPriceOracle, PriceOracle, RpcLedger, RpcPriceOracle};
pub use orchestration::SettlementService;
