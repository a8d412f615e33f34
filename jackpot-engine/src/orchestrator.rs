//! Single-writer round service.
//!
//! One task owns the [`RoundMachine`] and processes [`Command`]s strictly
//! in arrival order. Timers are detached sleeps that post a command back
//! when they fire; the machine drops any that arrive after the round has
//! moved on. Payouts run on their own tasks so a slow trade network never
//! holds up the next round.

use crate::broadcast::Broadcaster;
use crate::machine::{payout_for, Effect, RoundMachine};
use crate::query::{RoundPage, RoundQuery, VerifyReport};
use crate::queue::Deposit;
use crate::trade::TradeDesk;
use crate::{EngineError, Result};
use chrono::Utc;
use jackpot_core::{
    Item, ItemStatus, ItemStore, JackpotConfig, JackpotError, Round, RoundStore, RoundView, Storage, TradeKind,
    TradeRecord, TradeStatus, TradeStore,
};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

#[derive(Debug)]
pub enum Command {
    Deposit(Deposit),
    TimerExpired(Uuid),
    RollingElapsed(Uuid),
    OpenRound,
    Shutdown,
}

/// Cloneable front door to a running [`Orchestrator`].
#[derive(Clone)]
pub struct OrchestratorHandle {
    tx: mpsc::UnboundedSender<Command>,
    storage: Arc<Storage>,
    current: Arc<RwLock<Option<RoundView>>>,
}

impl OrchestratorHandle {
    /// Trade network callback for an accepted deposit offer.
    ///
    /// The trade and its items are stored before the deposit is handed to
    /// the round service, so a crash in between leaves it in the backlog
    /// for the next start. A trade id that is already on record is a
    /// redelivery and is ignored.
    pub async fn deposit_accepted(&self, trade: TradeRecord) -> Result<()> {
        if trade.kind != TradeKind::Deposit || trade.status != TradeStatus::Accepted {
            return Err(EngineError::InvalidState(format!(
                "trade {} is not an accepted deposit",
                trade.id
            )));
        }

        let trades = TradeStore::new(&self.storage);
        match trades.load_trade(trade.id).await {
            Ok(_) => {
                tracing::warn!("Deposit {} was already recorded, ignoring", trade.id);
                return Ok(());
            }
            Err(JackpotError::TradeNotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }

        ItemStore::new(&self.storage).save_items(&trade.items).await?;
        trades.save_trade(&trade).await?;

        tracing::debug!("Deposit {} from {} accepted", trade.id, trade.user_id);
        self.send(Command::Deposit(Deposit::from(&trade)))
    }

    /// Snapshot of the current round as of the last processed command.
    pub fn current_round(&self) -> Option<RoundView> {
        self.current.read().clone()
    }

    pub async fn completed_rounds(&self, page: u32, per_page: u32) -> Result<RoundPage> {
        RoundQuery::new(&self.storage).completed(page, per_page).await
    }

    pub async fn round(&self, round_id: Uuid) -> Result<RoundView> {
        RoundQuery::new(&self.storage).round(round_id).await
    }

    pub async fn verify(
        &self,
        round_id: Uuid,
        server_seed: &str,
        claimed_ticket: u64,
    ) -> Result<VerifyReport> {
        RoundQuery::new(&self.storage)
            .verify(round_id, server_seed, claimed_ticket)
            .await
    }

    pub fn shutdown(&self) -> Result<()> {
        self.send(Command::Shutdown)
    }

    fn send(&self, command: Command) -> Result<()> {
        self.tx
            .send(command)
            .map_err(|_| EngineError::ServiceStopped)
    }
}

pub struct Orchestrator {
    machine: RoundMachine,
    storage: Arc<Storage>,
    broadcaster: Arc<dyn Broadcaster>,
    trade_desk: Arc<dyn TradeDesk>,
    tx: mpsc::UnboundedSender<Command>,
    rx: mpsc::UnboundedReceiver<Command>,
    current: Arc<RwLock<Option<RoundView>>>,
}

impl Orchestrator {
    pub fn new(
        config: JackpotConfig,
        storage: Arc<Storage>,
        broadcaster: Arc<dyn Broadcaster>,
        trade_desk: Arc<dyn TradeDesk>,
    ) -> Result<Self> {
        config.validate()?;
        let (tx, rx) = mpsc::unbounded_channel();

        Ok(Self {
            machine: RoundMachine::new(config),
            storage,
            broadcaster,
            trade_desk,
            tx,
            rx,
            current: Arc::new(RwLock::new(None)),
        })
    }

    pub fn handle(&self) -> OrchestratorHandle {
        OrchestratorHandle {
            tx: self.tx.clone(),
            storage: self.storage.clone(),
            current: self.current.clone(),
        }
    }

    pub fn spawn(self) -> JoinHandle<Result<()>> {
        tokio::spawn(self.run())
    }

    /// Recovers persisted state, then serves commands until shutdown.
    pub async fn run(mut self) -> Result<()> {
        self.recover().await?;

        while let Some(command) = self.rx.recv().await {
            let now = Utc::now();
            let effects = match command {
                Command::Deposit(deposit) => self.machine.submit_deposit(deposit, now),
                Command::TimerExpired(round_id) => self.machine.timer_expired(round_id, now),
                Command::RollingElapsed(round_id) => self.machine.rolling_elapsed(round_id, now),
                Command::OpenRound => self.machine.open_round(now),
                Command::Shutdown => {
                    tracing::info!(
                        "Round service stopping with {} queued deposits",
                        self.machine.backlog().len()
                    );
                    break;
                }
            };
            self.apply(effects).await;
        }

        Ok(())
    }

    async fn recover(&mut self) -> Result<()> {
        let rounds = RoundStore::new(&self.storage);
        let unpaid = rounds.find_unpaid_rounds().await?;
        let current = rounds.find_current_round().await?;
        let pending: Vec<Deposit> = TradeStore::new(&self.storage)
            .load_unassigned_deposits()
            .await?
            .iter()
            .map(Deposit::from)
            .collect();

        if let Some(round) = &current {
            tracing::info!(
                "Found round {} left {} with {} participants",
                round.id,
                round.status.as_str(),
                round.participants.len()
            );
        }
        if !pending.is_empty() {
            tracing::info!("Restoring {} unassigned deposits", pending.len());
        }

        let mut effects = Vec::new();
        for round in &unpaid {
            if let Some(payout) = payout_for(round) {
                tracing::warn!("Round {} has no payout on record, sending it now", round.id);
                effects.push(payout);
            }
        }

        effects.extend(self.machine.resume(current, pending, Utc::now()));
        self.apply(effects).await;
        Ok(())
    }

    async fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            let name = effect.name();
            tracing::debug!("Applying {}", name);
            if let Err(e) = self.execute(effect).await {
                tracing::error!("Failed to apply {}: {}", name, e);
            }
        }

        *self.current.write() = self.machine.current().map(Round::view);
    }

    async fn execute(&self, effect: Effect) -> Result<()> {
        match effect {
            Effect::PersistRound(round) => {
                RoundStore::new(&self.storage).save_round(&round).await?;
            }
            Effect::AssignDeposit { trade_id, round_id } => {
                TradeStore::new(&self.storage)
                    .assign_round(trade_id, round_id)
                    .await?;
            }
            Effect::UpdateItems {
                item_ids,
                status,
                round_id,
            } => {
                ItemStore::new(&self.storage)
                    .update_status(&item_ids, status, round_id)
                    .await?;
            }
            Effect::Broadcast(event) => self.broadcaster.emit(&event),
            Effect::StartTimer { round_id, after } => {
                self.schedule(after, Command::TimerExpired(round_id))
            }
            Effect::StartRolling { round_id, after } => {
                self.schedule(after, Command::RollingElapsed(round_id))
            }
            Effect::ScheduleNextRound { after } => self.schedule(after, Command::OpenRound),
            Effect::Payout {
                round_id,
                user_id,
                items,
            } => self.spawn_payout(round_id, user_id, items),
        }
        Ok(())
    }

    fn schedule(&self, after: Duration, command: Command) {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            // service gone: nothing left to notify
            let _ = tx.send(command);
        });
    }

    fn spawn_payout(&self, round_id: Uuid, user_id: String, items: Vec<Item>) {
        let storage = self.storage.clone();
        let desk = self.trade_desk.clone();

        tokio::spawn(async move {
            if let Err(e) = send_payout(&storage, desk.as_ref(), round_id, user_id, items).await {
                tracing::error!("Payout bookkeeping for round {} failed: {}", round_id, e);
            }
        });
    }
}

/// Records the payout trade, then asks the trade desk to send it. A refused
/// offer marks the trade `error`; the items stay with the completed round.
async fn send_payout(
    storage: &Storage,
    desk: &dyn TradeDesk,
    round_id: Uuid,
    user_id: String,
    items: Vec<Item>,
) -> Result<()> {
    let trades = TradeStore::new(storage);
    let record = TradeRecord::payout(&user_id, round_id, items);
    trades.save_trade(&record).await?;

    let item_ids: Vec<String> = record.items.iter().map(|i| i.id.clone()).collect();
    ItemStore::new(storage)
        .update_status(&item_ids, ItemStatus::Pending, Some(round_id))
        .await?;

    match desk.request_payout(&user_id, &record.items).await {
        Ok(offer_id) => {
            trades
                .update_status(record.id, TradeStatus::Sent, Some(&offer_id), Some(Utc::now()))
                .await?;
            tracing::info!(
                "Round {} payout of {} sent to {} as {}",
                round_id,
                record.value,
                user_id,
                offer_id
            );
        }
        Err(e) => {
            tracing::error!("Round {} payout to {} failed: {}", round_id, user_id, e);
            trades
                .update_status(record.id, TradeStatus::Error, None, Some(Utc::now()))
                .await?;
        }
    }

    Ok(())
}
