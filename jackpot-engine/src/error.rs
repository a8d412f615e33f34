use thiserror::Error;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Jackpot core error: {0}")]
    Core(#[from] jackpot_core::JackpotError),

    #[error("Invalid round state: {0}")]
    InvalidState(String),

    #[error("Round {0} has no tickets")]
    NoTickets(Uuid),

    #[error("Ticket {ticket} is not covered by any of {total} tickets")]
    TicketOutOfRange { ticket: u64, total: u64 },

    #[error("Total tickets must be greater than 0")]
    ZeroTickets,

    #[error("Cryptographic error: {0}")]
    Crypto(String),

    #[error("Payout failed: {0}")]
    PayoutFailed(String),

    #[error("Round service stopped")]
    ServiceStopped,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
