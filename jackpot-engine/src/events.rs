use chrono::{DateTime, Utc};
use jackpot_core::{Item, Money};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle notifications for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum RoundEvent {
    RoundCreated {
        round_id: Uuid,
        secret_hash: String,
        start_time: DateTime<Utc>,
        /// Seconds on the clock once the first deposit lands.
        time_left: u64,
    },
    ParticipantUpdated {
        round_id: Uuid,
        user_id: String,
        items_value: Money,
        tickets: u64,
        total_value: Money,
        deposited_items: Vec<Item>,
    },
    RoundRolling {
        round_id: Uuid,
    },
    RoundWinner {
        round_id: Uuid,
        winner: String,
        winning_ticket: u64,
        total_tickets: u64,
        secret: String,
        secret_hash: String,
        tax_value: Money,
    },
    RoundCompleted {
        round_id: Uuid,
        message: String,
    },
}

impl RoundEvent {
    pub fn name(&self) -> &'static str {
        match self {
            RoundEvent::RoundCreated { .. } => "roundCreated",
            RoundEvent::ParticipantUpdated { .. } => "participantUpdated",
            RoundEvent::RoundRolling { .. } => "roundRolling",
            RoundEvent::RoundWinner { .. } => "roundWinner",
            RoundEvent::RoundCompleted { .. } => "roundCompleted",
        }
    }

    pub fn round_id(&self) -> Uuid {
        match self {
            RoundEvent::RoundCreated { round_id, .. }
            | RoundEvent::ParticipantUpdated { round_id, .. }
            | RoundEvent::RoundRolling { round_id }
            | RoundEvent::RoundWinner { round_id, .. }
            | RoundEvent::RoundCompleted { round_id, .. } => *round_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names_are_camel_case() {
        let event = RoundEvent::RoundWinner {
            round_id: Uuid::nil(),
            winner: "alice".into(),
            winning_ticket: 7,
            total_tickets: 10,
            secret: "s".into(),
            secret_hash: "h".into(),
            tax_value: Money::from_cents(50),
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "roundWinner");
        assert_eq!(json["winningTicket"], 7);
        assert_eq!(json["totalTickets"], 10);
        assert_eq!(json["taxValue"], 50);
        assert_eq!(json["event"], event.name());
    }
}
