//! Jackpot round engine
//!
//! Users deposit items into a pooled round and receive one ticket per cent
//! deposited. When the round timer runs out a committed secret picks the
//! winning ticket, the platform withholds a small share of the items as tax,
//! and the rest is paid out to the winner.

pub mod broadcast;
pub mod error;
pub mod events;
pub mod fairness;
pub mod ledger;
pub mod machine;
pub mod orchestrator;
pub mod query;
pub mod queue;
pub mod tax;
pub mod trade;

pub use broadcast::{Broadcaster, ChannelBroadcaster, LogBroadcaster};
pub use error::{EngineError, Result};
pub use events::RoundEvent;
pub use fairness::{Commitment, Verdict, VerifyFailure};
pub use machine::{Effect, RoundMachine};
pub use orchestrator::{Command, Orchestrator, OrchestratorHandle};
pub use query::{RoundPage, RoundQuery, VerifyReport};
pub use queue::{Deposit, DepositQueue};
pub use tax::{compute_tax, TaxOutcome};
pub use trade::{PayoutOffer, SimulatedTradeDesk, TradeDesk};

use jackpot_core::{JackpotConfig, Storage};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Starts a round service on `storage` and returns a handle to it.
pub fn start_service(
    config: JackpotConfig,
    storage: Arc<Storage>,
    broadcaster: Arc<dyn Broadcaster>,
    trade_desk: Arc<dyn TradeDesk>,
) -> Result<(OrchestratorHandle, JoinHandle<Result<()>>)> {
    let orchestrator = Orchestrator::new(config, storage, broadcaster, trade_desk)?;
    let handle = orchestrator.handle();
    Ok((handle, orchestrator.spawn()))
}
