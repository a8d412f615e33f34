//! Provably-fair commitments.
//!
//! Each round gets a random secret at creation. Only `SHA-256(secret)` is
//! published while the round is open; the winning ticket is
//! `HMAC-SHA256(key = secret, msg = round id)` reduced modulo the ticket
//! count, so anyone holding the revealed secret can recompute it.

pub mod verify;

pub use verify::{verify, Verdict, VerifyFailure};

use crate::{EngineError, Result};
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

const SECRET_SIZE: usize = 32;

/// A round secret together with its published hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Commitment {
    pub secret: String,
    pub secret_hash: String,
}

/// Fresh 256-bit secret (hex encoded) and its hash.
pub fn commit() -> Commitment {
    let mut bytes = [0u8; SECRET_SIZE];
    OsRng.fill_bytes(&mut bytes);

    let secret = hex::encode(bytes);
    let secret_hash = hash_secret(&secret);
    Commitment {
        secret,
        secret_hash,
    }
}

pub fn hash_secret(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Winning ticket index in `[0, total_tickets)`.
pub fn derive_winning_ticket(secret: &str, round_id: Uuid, total_tickets: u64) -> Result<u64> {
    if total_tickets == 0 {
        return Err(EngineError::ZeroTickets);
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| EngineError::Crypto(format!("Invalid HMAC key: {}", e)))?;
    mac.update(round_id.to_string().as_bytes());
    let digest = mac.finalize().into_bytes();

    let prefix = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
    Ok(u64::from(prefix) % total_tickets)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ZERO_SECRET: &str = "0000000000000000000000000000000000000000000000000000000000000000";

    fn fixed_round() -> Uuid {
        Uuid::parse_str("6f1c2a3b-4d5e-4f60-8a7b-9c0d1e2f3a4b").unwrap()
    }

    #[test]
    fn test_commitment_hash_matches_secret() {
        let commitment = commit();
        assert_eq!(commitment.secret.len(), SECRET_SIZE * 2);
        assert_eq!(hash_secret(&commitment.secret), commitment.secret_hash);
        assert_ne!(commit().secret, commitment.secret);
    }

    #[test]
    fn test_known_answer() {
        assert_eq!(
            hash_secret(ZERO_SECRET),
            "60e05bd1b195af2f94112fa7197a5c88289058840ce7c6df9693756bc6250f55"
        );
        // digest prefix 0x99962bae = 2576755630
        assert_eq!(derive_winning_ticket(ZERO_SECRET, fixed_round(), 1500).unwrap(), 130);
        assert_eq!(
            derive_winning_ticket(ZERO_SECRET, fixed_round(), 1_000_000).unwrap(),
            755630
        );
    }

    #[test]
    fn test_ticket_is_deterministic_and_in_range() {
        let commitment = commit();
        let round_id = Uuid::new_v4();
        for total in [1u64, 2, 7, 1500, 123_456_789] {
            let a = derive_winning_ticket(&commitment.secret, round_id, total).unwrap();
            let b = derive_winning_ticket(&commitment.secret, round_id, total).unwrap();
            assert_eq!(a, b);
            assert!(a < total);
        }
    }

    #[test]
    fn test_zero_tickets_rejected() {
        assert!(matches!(
            derive_winning_ticket(ZERO_SECRET, fixed_round(), 0),
            Err(EngineError::ZeroTickets)
        ));
    }
}
