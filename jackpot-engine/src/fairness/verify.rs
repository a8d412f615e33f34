use super::{derive_winning_ticket, hash_secret};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerifyFailure {
    HashMismatch,
    TicketMismatch { expected: u64, claimed: u64 },
}

impl fmt::Display for VerifyFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerifyFailure::HashMismatch => {
                write!(f, "server seed does not match the published hash")
            }
            VerifyFailure::TicketMismatch { expected, claimed } => write!(
                f,
                "seed yields ticket {} but ticket {} was claimed",
                expected, claimed
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Verified,
    Failed(VerifyFailure),
}

impl Verdict {
    pub fn is_verified(&self) -> bool {
        matches!(self, Verdict::Verified)
    }

    pub fn reason(&self) -> Option<String> {
        match self {
            Verdict::Verified => None,
            Verdict::Failed(failure) => Some(failure.to_string()),
        }
    }
}

/// Checks a revealed secret against its commitment and the claimed outcome.
///
/// The hash is checked first; a seed that does not match the commitment is
/// reported as a hash mismatch even if it happens to produce the same ticket.
pub fn verify(
    secret: &str,
    secret_hash: &str,
    round_id: Uuid,
    total_tickets: u64,
    claimed_ticket: u64,
) -> Result<Verdict> {
    if !hash_secret(secret).eq_ignore_ascii_case(secret_hash) {
        return Ok(Verdict::Failed(VerifyFailure::HashMismatch));
    }

    let expected = derive_winning_ticket(secret, round_id, total_tickets)?;
    if expected != claimed_ticket {
        return Ok(Verdict::Failed(VerifyFailure::TicketMismatch {
            expected,
            claimed: claimed_ticket,
        }));
    }

    Ok(Verdict::Verified)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fairness::commit;

    #[test]
    fn test_honest_outcome_verifies() {
        let commitment = commit();
        let round_id = Uuid::new_v4();
        let ticket = derive_winning_ticket(&commitment.secret, round_id, 1500).unwrap();

        let verdict = verify(&commitment.secret, &commitment.secret_hash, round_id, 1500, ticket)
            .unwrap();
        assert!(verdict.is_verified());
        assert!(verdict.reason().is_none());
    }

    #[test]
    fn test_swapped_secret_is_hash_mismatch() {
        let published = commit();
        let other = commit();

        let verdict = verify(&other.secret, &published.secret_hash, Uuid::new_v4(), 10, 0).unwrap();
        assert_eq!(verdict, Verdict::Failed(VerifyFailure::HashMismatch));
    }

    #[test]
    fn test_wrong_ticket_reports_expected() {
        let commitment = commit();
        let round_id = Uuid::new_v4();
        let ticket = derive_winning_ticket(&commitment.secret, round_id, 1000).unwrap();
        let claimed = (ticket + 1) % 1000;

        let verdict =
            verify(&commitment.secret, &commitment.secret_hash, round_id, 1000, claimed).unwrap();
        assert_eq!(
            verdict,
            Verdict::Failed(VerifyFailure::TicketMismatch {
                expected: ticket,
                claimed
            })
        );
    }
}
