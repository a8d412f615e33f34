use crate::fairness;
use crate::{EngineError, Result};
use jackpot_core::{RoundStatus, RoundStore, RoundView, Storage};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundPage {
    pub rounds: Vec<RoundView>,
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyReport {
    pub round_id: Uuid,
    pub verified: bool,
    pub reason: Option<String>,
}

/// Read-only access to round history for transparency pages.
pub struct RoundQuery<'a> {
    storage: &'a Storage,
}

impl<'a> RoundQuery<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    pub async fn completed(&self, page: u32, per_page: u32) -> Result<RoundPage> {
        let listing = RoundStore::new(self.storage)
            .list_completed(page, per_page)
            .await?;

        Ok(RoundPage {
            rounds: listing.rounds.iter().map(|r| r.view()).collect(),
            page: listing.page,
            per_page: listing.per_page,
            total: listing.total,
        })
    }

    pub async fn round(&self, round_id: Uuid) -> Result<RoundView> {
        let round = RoundStore::new(self.storage).load_round(round_id).await?;
        Ok(round.view())
    }

    /// Checks a claimed outcome against the stored commitment. Total tickets
    /// come from the stored round, not the caller.
    pub async fn verify(
        &self,
        round_id: Uuid,
        server_seed: &str,
        claimed_ticket: u64,
    ) -> Result<VerifyReport> {
        let round = RoundStore::new(self.storage).load_round(round_id).await?;
        if round.status != RoundStatus::Completed {
            return Err(EngineError::InvalidState(format!(
                "round {} is {}, its seed is not revealed yet",
                round_id,
                round.status.as_str()
            )));
        }

        if round.winner.is_none() || round.total_tickets() == 0 {
            return Ok(VerifyReport {
                round_id,
                verified: false,
                reason: Some("round ended without a winner, no ticket was drawn".to_string()),
            });
        }

        let verdict = fairness::verify(
            server_seed.trim(),
            &round.secret_hash,
            round.id,
            round.total_tickets(),
            claimed_ticket,
        )?;

        Ok(VerifyReport {
            round_id,
            verified: verdict.is_verified(),
            reason: verdict.reason(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fairness::{commit, derive_winning_ticket};
    use chrono::Utc;
    use jackpot_core::{Money, Participant, Round};
    use tempfile::tempdir;

    fn completed_round() -> Round {
        let commitment = commit();
        let mut round = Round::new(
            Uuid::new_v4(),
            commitment.secret,
            commitment.secret_hash,
            Utc::now(),
        );
        round.status = RoundStatus::Completed;
        round.completed_time = Some(Utc::now());
        round
    }

    #[tokio::test]
    async fn test_verify_round_without_winner_fails_with_reason() {
        let temp_dir = tempdir().unwrap();
        let storage = Storage::new(&temp_dir.path().join("jackpot.db")).await.unwrap();
        let round = completed_round();
        RoundStore::new(&storage).save_round(&round).await.unwrap();

        let report = RoundQuery::new(&storage)
            .verify(round.id, &round.secret, 0)
            .await
            .unwrap();
        assert!(!report.verified);
        assert!(report.reason.unwrap().contains("without a winner"));
    }

    #[tokio::test]
    async fn test_verify_uses_stored_ticket_total() {
        let temp_dir = tempdir().unwrap();
        let storage = Storage::new(&temp_dir.path().join("jackpot.db")).await.unwrap();

        let mut round = completed_round();
        round.total_value = Money::from_cents(1500);
        round.participants.push(Participant {
            user_id: "alice".into(),
            items_value: Money::from_cents(1500),
            tickets: 1500,
        });
        let ticket = derive_winning_ticket(&round.secret, round.id, 1500).unwrap();
        round.winner = Some("alice".into());
        round.winning_ticket = Some(ticket);
        RoundStore::new(&storage).save_round(&round).await.unwrap();

        let query = RoundQuery::new(&storage);
        assert!(query.verify(round.id, &round.secret, ticket).await.unwrap().verified);
        let wrong = query
            .verify(round.id, &round.secret, (ticket + 1) % 1500)
            .await
            .unwrap();
        assert!(!wrong.verified);
        assert!(wrong.reason.is_some());
    }
}
