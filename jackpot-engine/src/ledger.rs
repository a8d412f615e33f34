use crate::{EngineError, Result};
use jackpot_core::{tickets_for, Money, Participant, Round, RoundStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    NotActive,
    Full,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// Carries the participant's entry after accumulation.
    Admitted {
        participant: Participant,
        new_participant: bool,
    },
    Rejected(Rejection),
}

/// Whether `user_id` could deposit into `round` right now.
pub fn check_admission(round: &Round, user_id: &str, max_participants: usize) -> Option<Rejection> {
    if round.status != RoundStatus::Active {
        return Some(Rejection::NotActive);
    }
    if round.participant(user_id).is_none() && round.participants.len() >= max_participants {
        return Some(Rejection::Full);
    }
    None
}

/// Credits `items_value` to `user_id`, appending a new entry or
/// accumulating into the user's existing one.
pub fn admit(
    round: &mut Round,
    user_id: &str,
    items_value: Money,
    max_participants: usize,
) -> Admission {
    if let Some(rejection) = check_admission(round, user_id, max_participants) {
        return Admission::Rejected(rejection);
    }

    let tickets = tickets_for(items_value);
    round.total_value += items_value;

    match round.participants.iter_mut().find(|p| p.user_id == user_id) {
        Some(entry) => {
            entry.items_value += items_value;
            entry.tickets += tickets;
            Admission::Admitted {
                participant: entry.clone(),
                new_participant: false,
            }
        }
        None => {
            let entry = Participant {
                user_id: user_id.to_string(),
                items_value,
                tickets,
            };
            round.participants.push(entry.clone());
            Admission::Admitted {
                participant: entry,
                new_participant: true,
            }
        }
    }
}

/// Maps a ticket index onto the participant whose half-open range
/// `[before, before + tickets)` contains it, walking in stored order.
pub fn resolve_winner(round: &Round, winning_ticket: u64) -> Result<&Participant> {
    let total = round.total_tickets();
    if total == 0 {
        return Err(EngineError::NoTickets(round.id));
    }

    let mut cumulative = 0u64;
    for participant in &round.participants {
        cumulative += participant.tickets;
        if cumulative > winning_ticket {
            return Ok(participant);
        }
    }

    Err(EngineError::TicketOutOfRange {
        ticket: winning_ticket,
        total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn active_round() -> Round {
        let mut round = Round::new(Uuid::new_v4(), "s".into(), "h".into(), Utc::now());
        round.status = RoundStatus::Active;
        round
    }

    #[test]
    fn test_repeat_depositor_collapses_into_one_entry() {
        let mut round = active_round();
        admit(&mut round, "alice", Money::from_cents(250), 20);
        admit(&mut round, "bob", Money::from_cents(100), 20);
        let second = admit(&mut round, "alice", Money::from_cents(1), 20);

        assert_eq!(
            second,
            Admission::Admitted {
                participant: Participant {
                    user_id: "alice".into(),
                    items_value: Money::from_cents(251),
                    tickets: 251,
                },
                new_participant: false,
            }
        );
        assert_eq!(round.participants.len(), 2);
        assert_eq!(round.total_value, Money::from_cents(351));
        assert_eq!(round.total_tickets(), round.total_value.cents());
    }

    #[test]
    fn test_cap_only_blocks_new_users() {
        let mut round = active_round();
        for i in 0..20 {
            admit(&mut round, &format!("user-{}", i), Money::from_cents(100), 20);
        }

        let newcomer = admit(&mut round, "user-20", Money::from_cents(100), 20);
        assert_eq!(newcomer, Admission::Rejected(Rejection::Full));
        assert!(round.participant("user-20").is_none());

        let existing = admit(&mut round, "user-3", Money::from_cents(100), 20);
        assert!(matches!(existing, Admission::Admitted { .. }));
        assert_eq!(round.participants.len(), 20);
    }

    #[test]
    fn test_rolling_round_is_frozen() {
        let mut round = active_round();
        admit(&mut round, "alice", Money::from_cents(100), 20);
        round.status = RoundStatus::Rolling;

        let result = admit(&mut round, "alice", Money::from_cents(100), 20);
        assert_eq!(result, Admission::Rejected(Rejection::NotActive));
        assert_eq!(round.total_value, Money::from_cents(100));
    }

    #[test]
    fn test_ticket_ranges_are_half_open() {
        let mut round = active_round();
        admit(&mut round, "a", Money::from_units(10), 20);
        admit(&mut round, "b", Money::from_units(5), 20);
        assert_eq!(round.total_tickets(), 1500);

        assert_eq!(resolve_winner(&round, 0).unwrap().user_id, "a");
        assert_eq!(resolve_winner(&round, 999).unwrap().user_id, "a");
        assert_eq!(resolve_winner(&round, 1000).unwrap().user_id, "b");
        assert_eq!(resolve_winner(&round, 1499).unwrap().user_id, "b");
        assert!(matches!(
            resolve_winner(&round, 1500),
            Err(EngineError::TicketOutOfRange { ticket: 1500, total: 1500 })
        ));
    }

    #[test]
    fn test_zero_tickets_has_no_winner() {
        let mut round = active_round();
        admit(&mut round, "a", Money::ZERO, 20);
        assert!(matches!(
            resolve_winner(&round, 0),
            Err(EngineError::NoTickets(_))
        ));
    }
}
