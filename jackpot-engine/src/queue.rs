use chrono::{DateTime, Utc};
use jackpot_core::{Item, Money, TradeRecord};
use std::collections::VecDeque;
use uuid::Uuid;

/// An accepted deposit waiting to be credited to a round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deposit {
    pub trade_id: Uuid,
    pub user_id: String,
    pub items: Vec<Item>,
    pub value: Money,
    pub accepted_at: DateTime<Utc>,
}

impl From<&TradeRecord> for Deposit {
    fn from(trade: &TradeRecord) -> Self {
        Self {
            trade_id: trade.id,
            user_id: trade.user_id.clone(),
            items: trade.items.clone(),
            value: trade.value,
            accepted_at: trade.completed_at.unwrap_or(trade.created_at),
        }
    }
}

/// FIFO backlog of deposits that arrived while no round could take them.
///
/// Nothing is ever dropped; past `warn_threshold` every enqueue is logged.
#[derive(Debug)]
pub struct DepositQueue {
    inner: VecDeque<Deposit>,
    warn_threshold: usize,
}

impl DepositQueue {
    pub fn new(warn_threshold: usize) -> Self {
        Self {
            inner: VecDeque::new(),
            warn_threshold,
        }
    }

    pub fn enqueue(&mut self, deposit: Deposit) -> usize {
        tracing::info!(
            "Queued deposit {} from {} ({}) for the next round",
            deposit.trade_id,
            deposit.user_id,
            deposit.value
        );
        self.inner.push_back(deposit);

        let len = self.inner.len();
        if len > self.warn_threshold {
            tracing::warn!(
                "Deposit backlog at {} entries (threshold {})",
                len,
                self.warn_threshold
            );
        }
        len
    }

    /// Pops the head only if `admissible` accepts it, so replay halts at
    /// the first deposit that does not fit and arrival order is kept.
    pub fn pop_front_if(&mut self, admissible: impl FnOnce(&Deposit) -> bool) -> Option<Deposit> {
        if admissible(self.inner.front()?) {
            self.inner.pop_front()
        } else {
            None
        }
    }

    pub fn contains(&self, trade_id: Uuid) -> bool {
        self.inner.iter().any(|d| d.trade_id == trade_id)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Deposit> {
        self.inner.iter()
    }
}
