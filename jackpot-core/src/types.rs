use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};
use std::str::FromStr;
use uuid::Uuid;

use crate::error::JackpotError;

/// Currency amount held as whole cents.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(u64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    pub const fn from_units(units: u64) -> Self {
        Self(units * 100)
    }

    pub fn cents(&self) -> u64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn saturating_sub(self, other: Money) -> Money {
        Money(self.0.saturating_sub(other.0))
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, m| acc + *m)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}.{:02}", self.0 / 100, self.0 % 100)
    }
}

/// Parses a decimal amount such as `12`, `12.5` or `$0.07`.
/// Digits past the second decimal place are truncated.
impl FromStr for Money {
    type Err = JackpotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim().trim_start_matches('$');
        let invalid = || JackpotError::config(format!("Invalid amount: {}", s));

        let (whole, frac) = match raw.split_once('.') {
            Some((w, f)) => (w, f),
            None => (raw, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(invalid());
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit())
        {
            return Err(invalid());
        }

        let whole: u64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid())?
        };
        let mut cents_str: String = frac.chars().take(2).collect();
        while cents_str.len() < 2 {
            cents_str.push('0');
        }
        let cents: u64 = cents_str.parse().map_err(|_| invalid())?;

        whole
            .checked_mul(100)
            .and_then(|c| c.checked_add(cents))
            .map(Money)
            .ok_or_else(invalid)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Available,
    InRound,
    Withdrawn,
    Pending,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Available => "available",
            ItemStatus::InRound => "in_round",
            ItemStatus::Withdrawn => "withdrawn",
            ItemStatus::Pending => "pending",
        }
    }
}

impl FromStr for ItemStatus {
    type Err = JackpotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(ItemStatus::Available),
            "in_round" => Ok(ItemStatus::InRound),
            "withdrawn" => Ok(ItemStatus::Withdrawn),
            "pending" => Ok(ItemStatus::Pending),
            other => Err(JackpotError::corrupt(format!("unknown item status '{}'", other))),
        }
    }
}

/// A priced asset owned by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: String,
    pub name: String,
    pub price: Money,
    pub owner: String,
    pub status: ItemStatus,
    pub round_id: Option<Uuid>,
}

impl Item {
    pub fn new(id: impl Into<String>, name: impl Into<String>, price: Money, owner: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price,
            owner: owner.into(),
            status: ItemStatus::Available,
            round_id: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeKind {
    Deposit,
    Payout,
}

impl TradeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeKind::Deposit => "deposit",
            TradeKind::Payout => "payout",
        }
    }
}

impl FromStr for TradeKind {
    type Err = JackpotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deposit" => Ok(TradeKind::Deposit),
            "payout" => Ok(TradeKind::Payout),
            other => Err(JackpotError::corrupt(format!("unknown trade kind '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeStatus {
    Pending,
    Accepted,
    Sent,
    Declined,
    Error,
}

impl TradeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeStatus::Pending => "pending",
            TradeStatus::Accepted => "accepted",
            TradeStatus::Sent => "sent",
            TradeStatus::Declined => "declined",
            TradeStatus::Error => "error",
        }
    }
}

impl FromStr for TradeStatus {
    type Err = JackpotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TradeStatus::Pending),
            "accepted" => Ok(TradeStatus::Accepted),
            "sent" => Ok(TradeStatus::Sent),
            "declined" => Ok(TradeStatus::Declined),
            "error" => Ok(TradeStatus::Error),
            other => Err(JackpotError::corrupt(format!("unknown trade status '{}'", other))),
        }
    }
}

/// A transfer of items between a user and the site.
///
/// Deposit records are value-stamped when the trade network reports them
/// accepted; after that only `status`, `completed_at` and the round
/// assignment change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeRecord {
    pub id: Uuid,
    pub kind: TradeKind,
    pub user_id: String,
    pub items: Vec<Item>,
    pub value: Money,
    pub status: TradeStatus,
    pub offer_id: Option<String>,
    pub round_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl TradeRecord {
    pub fn accepted_deposit(user_id: impl Into<String>, items: Vec<Item>) -> Self {
        let now = Utc::now();
        let value = items.iter().map(|i| i.price).sum();
        Self {
            id: Uuid::new_v4(),
            kind: TradeKind::Deposit,
            user_id: user_id.into(),
            items,
            value,
            status: TradeStatus::Accepted,
            offer_id: None,
            round_id: None,
            created_at: now,
            completed_at: Some(now),
        }
    }

    pub fn payout(user_id: impl Into<String>, round_id: Uuid, items: Vec<Item>) -> Self {
        let value = items.iter().map(|i| i.price).sum();
        Self {
            id: Uuid::new_v4(),
            kind: TradeKind::Payout,
            user_id: user_id.into(),
            items,
            value,
            status: TradeStatus::Pending,
            offer_id: None,
            round_id: Some(round_id),
            created_at: Utc::now(),
            completed_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_parsing() {
        assert_eq!("12".parse::<Money>().unwrap(), Money::from_cents(1200));
        assert_eq!("12.5".parse::<Money>().unwrap(), Money::from_cents(1250));
        assert_eq!("$0.07".parse::<Money>().unwrap(), Money::from_cents(7));
        assert_eq!("9.999".parse::<Money>().unwrap(), Money::from_cents(999));
        assert_eq!(".29".parse::<Money>().unwrap(), Money::from_cents(29));
        assert!("abc".parse::<Money>().is_err());
        assert!("-1".parse::<Money>().is_err());
        assert!(".".parse::<Money>().is_err());
    }

    #[test]
    fn test_money_display() {
        assert_eq!(Money::from_cents(1005).to_string(), "$10.05");
        assert_eq!(Money::ZERO.to_string(), "$0.00");
    }

    #[test]
    fn test_deposit_is_value_stamped() {
        let items = vec![
            Item::new("a", "Knife", Money::from_cents(250), "alice"),
            Item::new("b", "Gloves", Money::from_cents(125), "alice"),
        ];
        let trade = TradeRecord::accepted_deposit("alice", items);
        assert_eq!(trade.value, Money::from_cents(375));
        assert_eq!(trade.status, TradeStatus::Accepted);
        assert!(trade.round_id.is_none());
    }
}
