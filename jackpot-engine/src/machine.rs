//! Round state machine.
//!
//! `pending -> active -> rolling -> completed`. Every transition mutates the
//! machine's own state and returns the side effects it needs performed; the
//! machine itself never touches storage, clocks or the network. Timed
//! transitions carry the round id they were scheduled for and are ignored
//! if the round has moved on.

use crate::events::RoundEvent;
use crate::fairness::{self, Commitment};
use crate::ledger::{self, Admission};
use crate::queue::{Deposit, DepositQueue};
use crate::tax::compute_tax;
use chrono::{DateTime, Utc};
use jackpot_core::{Item, ItemStatus, JackpotConfig, Round, RoundStatus};
use std::collections::HashSet;
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    PersistRound(Round),
    AssignDeposit {
        trade_id: Uuid,
        round_id: Uuid,
    },
    UpdateItems {
        item_ids: Vec<String>,
        status: ItemStatus,
        round_id: Option<Uuid>,
    },
    Broadcast(RoundEvent),
    StartTimer {
        round_id: Uuid,
        after: Duration,
    },
    StartRolling {
        round_id: Uuid,
        after: Duration,
    },
    ScheduleNextRound {
        after: Duration,
    },
    Payout {
        round_id: Uuid,
        user_id: String,
        items: Vec<Item>,
    },
}

impl Effect {
    pub fn name(&self) -> &'static str {
        match self {
            Effect::PersistRound(_) => "persist-round",
            Effect::AssignDeposit { .. } => "assign-deposit",
            Effect::UpdateItems { .. } => "update-items",
            Effect::Broadcast(_) => "broadcast",
            Effect::StartTimer { .. } => "start-timer",
            Effect::StartRolling { .. } => "start-rolling",
            Effect::ScheduleNextRound { .. } => "schedule-next-round",
            Effect::Payout { .. } => "payout",
        }
    }
}

pub struct RoundMachine {
    config: JackpotConfig,
    current: Option<Round>,
    backlog: DepositQueue,
    /// Trade ids already credited to a round by this machine.
    credited: HashSet<Uuid>,
}

impl RoundMachine {
    pub fn new(config: JackpotConfig) -> Self {
        let backlog = DepositQueue::new(config.queue_warn_threshold);
        Self {
            config,
            current: None,
            backlog,
            credited: HashSet::new(),
        }
    }

    pub fn config(&self) -> &JackpotConfig {
        &self.config
    }

    pub fn current(&self) -> Option<&Round> {
        self.current.as_ref()
    }

    pub fn backlog(&self) -> &DepositQueue {
        &self.backlog
    }

    pub fn open_round(&mut self, now: DateTime<Utc>) -> Vec<Effect> {
        self.open_round_with(fairness::commit(), now)
    }

    /// Opens a round on a given commitment. No-op while another round is
    /// still `active` or `rolling`.
    pub fn open_round_with(&mut self, commitment: Commitment, now: DateTime<Utc>) -> Vec<Effect> {
        if let Some(round) = &self.current {
            if round.status.is_live() {
                tracing::warn!(
                    "Ignoring round creation: round {} is still {}",
                    round.id,
                    round.status.as_str()
                );
                return Vec::new();
            }
        }

        let mut round = Round::new(
            Uuid::new_v4(),
            commitment.secret,
            commitment.secret_hash,
            now,
        );
        round.status = RoundStatus::Active;

        tracing::info!("Round {} opened, secret hash {}", round.id, round.secret_hash);

        let mut effects = vec![
            Effect::PersistRound(round.clone()),
            Effect::Broadcast(RoundEvent::RoundCreated {
                round_id: round.id,
                secret_hash: round.secret_hash.clone(),
                start_time: round.start_time,
                time_left: self.config.round_duration.as_secs(),
            }),
        ];
        self.current = Some(round);

        effects.extend(self.replay_backlog(now));
        effects
    }

    /// Credits a deposit to the current round, or queues it when there is
    /// no active round with room for the depositor.
    pub fn submit_deposit(&mut self, deposit: Deposit, now: DateTime<Utc>) -> Vec<Effect> {
        if self.credited.contains(&deposit.trade_id) || self.backlog.contains(deposit.trade_id) {
            tracing::warn!("Ignoring repeated deposit {}", deposit.trade_id);
            return Vec::new();
        }

        if self.can_admit(&deposit) {
            self.admit(deposit, now)
        } else {
            self.backlog.enqueue(deposit);
            Vec::new()
        }
    }

    pub fn timer_expired(&mut self, round_id: Uuid, now: DateTime<Utc>) -> Vec<Effect> {
        let delay = self.config.rolling_delay;
        let Some(round) = self.guard(round_id, RoundStatus::Active, "timer expiry") else {
            return Vec::new();
        };

        round.status = RoundStatus::Rolling;
        round.end_time = Some(now);

        tracing::info!(
            "Round {} closed with {} participants, pot {}",
            round.id,
            round.participants.len(),
            round.total_value
        );

        vec![
            Effect::PersistRound(round.clone()),
            Effect::Broadcast(RoundEvent::RoundRolling { round_id }),
            Effect::StartRolling {
                round_id,
                after: delay,
            },
        ]
    }

    pub fn rolling_elapsed(&mut self, round_id: Uuid, now: DateTime<Utc>) -> Vec<Effect> {
        if self
            .guard(round_id, RoundStatus::Rolling, "winner determination")
            .is_none()
        {
            return Vec::new();
        }
        self.determine_outcome(now)
    }

    /// Restores state after a restart.
    ///
    /// `round` is the persisted `active`/`rolling` round, if any; `pending`
    /// holds accepted deposits that were never assigned to a round, oldest
    /// first. Deposits whose items already sit in the restored round were
    /// credited before the crash and are only marked assigned.
    pub fn resume(
        &mut self,
        round: Option<Round>,
        pending: Vec<Deposit>,
        now: DateTime<Utc>,
    ) -> Vec<Effect> {
        let mut effects = Vec::new();

        for deposit in pending {
            if let Some(round) = &round {
                let credited = deposit
                    .items
                    .iter()
                    .any(|item| round.items.iter().any(|r| r.id == item.id));
                if credited {
                    tracing::warn!(
                        "Deposit {} was already credited to round {}",
                        deposit.trade_id,
                        round.id
                    );
                    self.credited.insert(deposit.trade_id);
                    effects.push(Effect::AssignDeposit {
                        trade_id: deposit.trade_id,
                        round_id: round.id,
                    });
                    continue;
                }
            }
            if !self.backlog.contains(deposit.trade_id) {
                self.backlog.enqueue(deposit);
            }
        }

        match round {
            Some(round) => effects.extend(self.resume_round(round, now)),
            None => effects.extend(self.open_round(now)),
        }
        effects
    }

    fn resume_round(&mut self, round: Round, now: DateTime<Utc>) -> Vec<Effect> {
        let round_id = round.id;

        match round.status {
            RoundStatus::Active => {
                let anchor = round.timer_started_at.unwrap_or(round.start_time);
                let timer_running = !round.participants.is_empty();
                self.current = Some(round);

                let mut effects = Vec::new();
                if timer_running {
                    let elapsed = (now - anchor).to_std().unwrap_or_default();
                    let duration = self.config.round_duration;
                    if elapsed >= duration {
                        tracing::info!(
                            "Round {} timer ran out while offline ({}s elapsed)",
                            round_id,
                            elapsed.as_secs()
                        );
                        return self.timer_expired(round_id, now);
                    }

                    let remaining = duration - elapsed;
                    tracing::info!(
                        "Resuming round {} with {}s left",
                        round_id,
                        remaining.as_secs()
                    );
                    effects.push(Effect::StartTimer {
                        round_id,
                        after: remaining,
                    });
                } else {
                    tracing::info!("Resuming empty round {}", round_id);
                }

                effects.extend(self.replay_backlog(now));
                effects
            }
            RoundStatus::Rolling => {
                tracing::info!("Resuming round {} at winner determination", round_id);
                self.current = Some(round);
                self.determine_outcome(now)
            }
            RoundStatus::Pending | RoundStatus::Completed => {
                tracing::warn!(
                    "Round {} is {}, not resumable; opening a new round",
                    round_id,
                    round.status.as_str()
                );
                self.current = Some(round);
                self.open_round(now)
            }
        }
    }

    fn can_admit(&self, deposit: &Deposit) -> bool {
        self.current.as_ref().map_or(false, |round| {
            ledger::check_admission(round, &deposit.user_id, self.config.max_participants).is_none()
        })
    }

    fn admit(&mut self, deposit: Deposit, now: DateTime<Utc>) -> Vec<Effect> {
        let max_participants = self.config.max_participants;
        let duration = self.config.round_duration;

        let Some(round) = self.current.as_mut() else {
            self.backlog.enqueue(deposit);
            return Vec::new();
        };

        let participant = match ledger::admit(round, &deposit.user_id, deposit.value, max_participants)
        {
            Admission::Admitted { participant, .. } => participant,
            Admission::Rejected(reason) => {
                tracing::debug!("Deposit {} rejected: {:?}", deposit.trade_id, reason);
                self.backlog.enqueue(deposit);
                return Vec::new();
            }
        };

        let deposited: Vec<Item> = deposit
            .items
            .iter()
            .cloned()
            .map(|mut item| {
                item.status = ItemStatus::InRound;
                item.round_id = Some(round.id);
                item
            })
            .collect();
        round.items.extend(deposited.iter().cloned());

        self.credited.insert(deposit.trade_id);

        let starts_timer = round.timer_started_at.is_none();
        if starts_timer {
            round.timer_started_at = Some(now);
        }

        tracing::info!(
            "{} deposited {} into round {} ({} tickets, pot {})",
            deposit.user_id,
            deposit.value,
            round.id,
            participant.tickets,
            round.total_value
        );

        let mut effects = vec![
            Effect::PersistRound(round.clone()),
            Effect::AssignDeposit {
                trade_id: deposit.trade_id,
                round_id: round.id,
            },
            Effect::UpdateItems {
                item_ids: deposited.iter().map(|i| i.id.clone()).collect(),
                status: ItemStatus::InRound,
                round_id: Some(round.id),
            },
            Effect::Broadcast(RoundEvent::ParticipantUpdated {
                round_id: round.id,
                user_id: participant.user_id,
                items_value: participant.items_value,
                tickets: participant.tickets,
                total_value: round.total_value,
                deposited_items: deposited,
            }),
        ];

        if starts_timer {
            effects.push(Effect::StartTimer {
                round_id: round.id,
                after: duration,
            });
        }
        effects
    }

    /// Admits queued deposits in arrival order until one does not fit.
    fn replay_backlog(&mut self, now: DateTime<Utc>) -> Vec<Effect> {
        let max_participants = self.config.max_participants;
        let mut effects = Vec::new();
        let mut replayed = 0;

        loop {
            let Some(round) = self.current.as_ref() else {
                break;
            };
            let next = self.backlog.pop_front_if(|d| {
                ledger::check_admission(round, &d.user_id, max_participants).is_none()
            });
            match next {
                Some(deposit) => {
                    effects.extend(self.admit(deposit, now));
                    replayed += 1;
                }
                None => break,
            }
        }

        if replayed > 0 {
            tracing::info!(
                "Replayed {} queued deposits, {} still waiting",
                replayed,
                self.backlog.len()
            );
        }
        effects
    }

    fn guard(&mut self, round_id: Uuid, expected: RoundStatus, action: &str) -> Option<&mut Round> {
        match self.current.as_mut() {
            Some(round) if round.id == round_id && round.status == expected => Some(round),
            Some(round) => {
                tracing::warn!(
                    "Ignoring {} for round {}: current round {} is {}",
                    action,
                    round_id,
                    round.id,
                    round.status.as_str()
                );
                None
            }
            None => {
                tracing::warn!("Ignoring {} for round {}: no current round", action, round_id);
                None
            }
        }
    }

    fn determine_outcome(&mut self, now: DateTime<Utc>) -> Vec<Effect> {
        let policy = self.config.tax.clone();
        let cooldown = self.config.next_round_delay;

        let Some(round) = self.current.as_mut() else {
            return self.open_round(now);
        };

        let total_tickets = round.total_tickets();
        let outcome = if total_tickets == 0 {
            Err("no tickets in play".to_string())
        } else {
            fairness::derive_winning_ticket(&round.secret, round.id, total_tickets)
                .and_then(|ticket| {
                    ledger::resolve_winner(round, ticket).map(|p| (ticket, p.user_id.clone()))
                })
                .map_err(|e| e.to_string())
        };

        let (winning_ticket, winner) = match outcome {
            Ok(resolved) => resolved,
            Err(reason) => return self.complete_without_winner(&reason, now),
        };

        let tax = compute_tax(&round.items, round.total_value, &policy);

        round.winner = Some(winner.clone());
        round.winning_ticket = Some(winning_ticket);
        round.tax_items = tax.items.clone();
        round.tax_value = tax.value;
        round.completed_time = Some(now);
        round.status = RoundStatus::Completed;

        tracing::info!(
            "Round {} won by {} with ticket {}/{} (pot {}, tax {})",
            round.id,
            winner,
            winning_ticket,
            total_tickets,
            round.total_value,
            round.tax_value
        );

        let mut effects = vec![Effect::PersistRound(round.clone())];
        if !tax.items.is_empty() {
            effects.push(Effect::UpdateItems {
                item_ids: tax.items.iter().map(|i| i.id.clone()).collect(),
                status: ItemStatus::Withdrawn,
                round_id: Some(round.id),
            });
        }
        effects.extend(payout_for(round));
        effects.push(Effect::Broadcast(RoundEvent::RoundWinner {
            round_id: round.id,
            winner: winner.clone(),
            winning_ticket,
            total_tickets,
            secret: round.secret.clone(),
            secret_hash: round.secret_hash.clone(),
            tax_value: round.tax_value,
        }));
        effects.push(Effect::Broadcast(RoundEvent::RoundCompleted {
            round_id: round.id,
            message: format!(
                "{} won {} with ticket {}",
                winner, round.total_value, winning_ticket
            ),
        }));
        effects.push(Effect::ScheduleNextRound { after: cooldown });
        effects
    }

    /// Degenerate rounds end with no winner and the next round opens at once.
    fn complete_without_winner(&mut self, reason: &str, now: DateTime<Utc>) -> Vec<Effect> {
        let Some(round) = self.current.as_mut() else {
            return self.open_round(now);
        };

        round.status = RoundStatus::Completed;
        round.completed_time = Some(now);

        tracing::info!("Round {} completed without a winner: {}", round.id, reason);

        let mut effects = vec![Effect::PersistRound(round.clone())];
        if !round.items.is_empty() {
            effects.push(Effect::UpdateItems {
                item_ids: round.items.iter().map(|i| i.id.clone()).collect(),
                status: ItemStatus::Available,
                round_id: None,
            });
        }
        effects.push(Effect::Broadcast(RoundEvent::RoundCompleted {
            round_id: round.id,
            message: "Round ended without a winner".to_string(),
        }));

        effects.extend(self.open_round(now));
        effects
    }
}

/// The payout owed to a completed round's winner: every item that was not
/// withheld as tax. `None` when there is no winner or nothing left to send.
pub fn payout_for(round: &Round) -> Option<Effect> {
    if round.status != RoundStatus::Completed {
        return None;
    }
    let winner = round.winner.clone()?;

    let items: Vec<Item> = round
        .items
        .iter()
        .filter(|item| !round.tax_items.iter().any(|t| t.id == item.id))
        .cloned()
        .collect();
    if items.is_empty() {
        return None;
    }

    Some(Effect::Payout {
        round_id: round.id,
        user_id: winner,
        items,
    })
}
