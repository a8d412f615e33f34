//! Jackpot core - domain types, configuration and storage
//!
//! Holds the round, item and trade records shared by the round engine and
//! its front ends, plus the SQLite persistence layer for them.

pub mod config;
pub mod error;
pub mod round;
pub mod storage;
pub mod types;

pub use config::{JackpotConfig, TaxPolicy};
pub use error::{JackpotError, Result};
pub use round::{tickets_for, Participant, Round, RoundStatus, RoundView};
pub use storage::{CompletedPage, ItemStore, RoundStore, Storage, TradeStore};
pub use types::{Item, ItemStatus, Money, TradeKind, TradeRecord, TradeStatus};
