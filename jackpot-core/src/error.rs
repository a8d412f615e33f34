use thiserror::Error;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, JackpotError>;

#[derive(Error, Debug)]
pub enum JackpotError {
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Round not found: {0}")]
    RoundNotFound(Uuid),

    #[error("Item not found: {0}")]
    ItemNotFound(String),

    #[error("Trade not found: {0}")]
    TradeNotFound(Uuid),

    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl JackpotError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::Corrupt(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
