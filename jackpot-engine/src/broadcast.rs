use crate::events::RoundEvent;
use tokio::sync::broadcast;

/// Fire-and-forget sink for round lifecycle events.
pub trait Broadcaster: Send + Sync {
    fn emit(&self, event: &RoundEvent);
}

/// Writes every event to the log as JSON.
#[derive(Debug, Default)]
pub struct LogBroadcaster;

impl Broadcaster for LogBroadcaster {
    fn emit(&self, event: &RoundEvent) {
        match serde_json::to_string(event) {
            Ok(payload) => tracing::info!(event = event.name(), "{}", payload),
            Err(e) => tracing::warn!("Failed to encode {} event: {}", event.name(), e),
        }
    }
}

/// Fans events out to in-process subscribers. Events emitted while nobody
/// is subscribed are dropped.
#[derive(Debug, Clone)]
pub struct ChannelBroadcaster {
    tx: broadcast::Sender<RoundEvent>,
}

impl ChannelBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RoundEvent> {
        self.tx.subscribe()
    }
}

impl Broadcaster for ChannelBroadcaster {
    fn emit(&self, event: &RoundEvent) {
        let _ = self.tx.send(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_channel_delivers_in_order() {
        let broadcaster = ChannelBroadcaster::new(8);
        let mut rx = broadcaster.subscribe();
        let round_id = Uuid::new_v4();

        broadcaster.emit(&RoundEvent::RoundRolling { round_id });
        broadcaster.emit(&RoundEvent::RoundCompleted {
            round_id,
            message: "done".into(),
        });

        assert_eq!(rx.recv().await.unwrap().name(), "roundRolling");
        assert_eq!(rx.recv().await.unwrap().name(), "roundCompleted");
    }

    #[test]
    fn test_emit_without_subscribers_is_silent() {
        let broadcaster = ChannelBroadcaster::new(1);
        broadcaster.emit(&RoundEvent::RoundRolling {
            round_id: Uuid::new_v4(),
        });
        LogBroadcaster.emit(&RoundEvent::RoundRolling {
            round_id: Uuid::new_v4(),
        });
    }
}
