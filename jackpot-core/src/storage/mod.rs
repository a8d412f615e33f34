pub mod item_store;
pub mod round_store;
pub mod trade_store;

pub use item_store::ItemStore;
pub use round_store::{CompletedPage, RoundStore};
pub use trade_store::TradeStore;

use crate::error::{JackpotError, Result};
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use std::path::Path;
use tokio::sync::Mutex;

pub struct Storage {
    conn: Mutex<Connection>,
}

impl Storage {
    pub async fn new(db_path: &Path) -> Result<Self> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                JackpotError::internal(format!("Failed to create directory: {}", e))
            })?;
        }

        let conn = Connection::open(db_path)?;
        let storage = Self {
            conn: Mutex::new(conn),
        };

        storage.init_schema().await?;
        Ok(storage)
    }

    async fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock().await;

        // Rounds; participants and item lists are embedded as JSON
        conn.execute(
            "CREATE TABLE IF NOT EXISTS rounds (
                id TEXT PRIMARY KEY,
                status TEXT NOT NULL,
                start_time INTEGER NOT NULL,
                timer_started_at INTEGER,
                end_time INTEGER,
                completed_time INTEGER,
                total_value INTEGER NOT NULL,
                secret TEXT NOT NULL,
                secret_hash TEXT NOT NULL,
                winner TEXT,
                winning_ticket INTEGER,
                tax_value INTEGER NOT NULL,
                participants TEXT NOT NULL,
                items TEXT NOT NULL,
                tax_items TEXT NOT NULL
            )",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS rounds_status ON rounds (status, completed_time)",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS items (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                price INTEGER NOT NULL,
                owner TEXT NOT NULL,
                status TEXT NOT NULL,
                round_id TEXT
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS trades (
                id TEXT PRIMARY KEY,
                kind TEXT NOT NULL,
                user_id TEXT NOT NULL,
                items TEXT NOT NULL,
                value INTEGER NOT NULL,
                status TEXT NOT NULL,
                offer_id TEXT,
                round_id TEXT,
                created_at INTEGER NOT NULL,
                completed_at INTEGER
            )",
            [],
        )?;

        Ok(())
    }

    pub async fn get_connection(&self) -> tokio::sync::MutexGuard<'_, Connection> {
        self.conn.lock().await
    }
}

pub(crate) fn to_millis(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}

pub(crate) fn from_millis(ms: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| JackpotError::corrupt(format!("timestamp out of range: {}", ms)))
}

pub(crate) fn from_millis_opt(ms: Option<i64>) -> Result<Option<DateTime<Utc>>> {
    ms.map(from_millis).transpose()
}
