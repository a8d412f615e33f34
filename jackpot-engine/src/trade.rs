use crate::{EngineError, Result};
use async_trait::async_trait;
use jackpot_core::Item;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

/// Outbound side of the trade network: sends winnings to users.
#[async_trait]
pub trait TradeDesk: Send + Sync {
    /// Returns the trade network's offer id.
    async fn request_payout(&self, user_id: &str, items: &[Item]) -> Result<String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayoutOffer {
    pub offer_id: String,
    pub user_id: String,
    pub item_ids: Vec<String>,
}

/// In-process trade desk that records offers instead of sending them.
#[derive(Debug, Default)]
pub struct SimulatedTradeDesk {
    offers: Mutex<Vec<PayoutOffer>>,
    failing: AtomicBool,
}

impl SimulatedTradeDesk {
    pub fn new() -> Self {
        Self::default()
    }

    /// A desk that rejects every payout.
    pub fn failing() -> Self {
        let desk = Self::default();
        desk.set_failing(true);
        desk
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn offers(&self) -> Vec<PayoutOffer> {
        self.offers.lock().clone()
    }
}

#[async_trait]
impl TradeDesk for SimulatedTradeDesk {
    async fn request_payout(&self, user_id: &str, items: &[Item]) -> Result<String> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(EngineError::PayoutFailed(format!(
                "trade network refused offer to {}",
                user_id
            )));
        }

        let offer = PayoutOffer {
            offer_id: format!("offer_{}", Uuid::new_v4()),
            user_id: user_id.to_string(),
            item_ids: items.iter().map(|i| i.id.clone()).collect(),
        };
        let offer_id = offer.offer_id.clone();
        self.offers.lock().push(offer);

        tracing::info!("Sent payout offer {} to {} ({} items)", offer_id, user_id, items.len());
        Ok(offer_id)
    }
}
