use crate::error::JackpotError;
use crate::types::{Item, Money};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Tickets granted for a deposit value: one ticket per cent.
pub fn tickets_for(value: Money) -> u64 {
    value.cents()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundStatus {
    Pending,
    Active,
    Rolling,
    Completed,
}

impl RoundStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoundStatus::Pending => "pending",
            RoundStatus::Active => "active",
            RoundStatus::Rolling => "rolling",
            RoundStatus::Completed => "completed",
        }
    }

    /// `active` or `rolling`: the round still owns the pot.
    pub fn is_live(&self) -> bool {
        matches!(self, RoundStatus::Active | RoundStatus::Rolling)
    }
}

impl FromStr for RoundStatus {
    type Err = JackpotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RoundStatus::Pending),
            "active" => Ok(RoundStatus::Active),
            "rolling" => Ok(RoundStatus::Rolling),
            "completed" => Ok(RoundStatus::Completed),
            other => Err(JackpotError::corrupt(format!("unknown round status '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub user_id: String,
    pub items_value: Money,
    pub tickets: u64,
}

/// One pooled wagering event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Round {
    pub id: Uuid,
    pub status: RoundStatus,
    pub start_time: DateTime<Utc>,
    pub timer_started_at: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub completed_time: Option<DateTime<Utc>>,
    pub total_value: Money,
    pub participants: Vec<Participant>,
    pub items: Vec<Item>,
    pub secret: String,
    pub secret_hash: String,
    pub winner: Option<String>,
    pub winning_ticket: Option<u64>,
    pub tax_items: Vec<Item>,
    pub tax_value: Money,
}

impl Round {
    pub fn new(id: Uuid, secret: String, secret_hash: String, now: DateTime<Utc>) -> Self {
        Self {
            id,
            status: RoundStatus::Pending,
            start_time: now,
            timer_started_at: None,
            end_time: None,
            completed_time: None,
            total_value: Money::ZERO,
            participants: Vec::new(),
            items: Vec::new(),
            secret,
            secret_hash,
            winner: None,
            winning_ticket: None,
            tax_items: Vec::new(),
            tax_value: Money::ZERO,
        }
    }

    pub fn total_tickets(&self) -> u64 {
        self.participants.iter().map(|p| p.tickets).sum()
    }

    pub fn participant(&self, user_id: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.user_id == user_id)
    }

    /// Public projection. The secret is withheld until the round completes.
    pub fn view(&self) -> RoundView {
        let revealed = self.status == RoundStatus::Completed;
        RoundView {
            id: self.id,
            status: self.status,
            start_time: self.start_time,
            end_time: self.end_time,
            completed_time: self.completed_time,
            total_value: self.total_value,
            total_tickets: self.total_tickets(),
            participants: self.participants.clone(),
            items: self.items.clone(),
            secret_hash: self.secret_hash.clone(),
            secret: revealed.then(|| self.secret.clone()),
            winner: self.winner.clone(),
            winning_ticket: self.winning_ticket,
            tax_items: self.tax_items.clone(),
            tax_value: self.tax_value,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundView {
    pub id: Uuid,
    pub status: RoundStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub completed_time: Option<DateTime<Utc>>,
    pub total_value: Money,
    pub total_tickets: u64,
    pub participants: Vec<Participant>,
    pub items: Vec<Item>,
    pub secret_hash: String,
    pub secret: Option<String>,
    pub winner: Option<String>,
    pub winning_ticket: Option<u64>,
    pub tax_items: Vec<Item>,
    pub tax_value: Money,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_hidden_until_completed() {
        let mut round = Round::new(Uuid::new_v4(), "s3cret".into(), "hash".into(), Utc::now());
        round.status = RoundStatus::Active;
        assert!(round.view().secret.is_none());

        round.status = RoundStatus::Completed;
        assert_eq!(round.view().secret.as_deref(), Some("s3cret"));
    }

    #[test]
    fn test_status_round_trip_through_text() {
        for status in [
            RoundStatus::Pending,
            RoundStatus::Active,
            RoundStatus::Rolling,
            RoundStatus::Completed,
        ] {
            assert_eq!(status.as_str().parse::<RoundStatus>().unwrap(), status);
        }
        assert!("paused".parse::<RoundStatus>().is_err());
    }
}
