use crate::error::{JackpotError, Result};
use crate::round::{Round, RoundStatus};
use crate::storage::{from_millis, from_millis_opt, to_millis, Storage};
use crate::types::Money;
use rusqlite::{params, OptionalExtension, Row};
use uuid::Uuid;

const ROUND_COLUMNS: &str = "id, status, start_time, timer_started_at, end_time, completed_time,
     total_value, secret, secret_hash, winner, winning_ticket, tax_value,
     participants, items, tax_items";

/// Raw column values, decoded into a [`Round`] outside the rusqlite closure.
struct RoundRow {
    id: String,
    status: String,
    start_time: i64,
    timer_started_at: Option<i64>,
    end_time: Option<i64>,
    completed_time: Option<i64>,
    total_value: i64,
    secret: String,
    secret_hash: String,
    winner: Option<String>,
    winning_ticket: Option<i64>,
    tax_value: i64,
    participants: String,
    items: String,
    tax_items: String,
}

impl RoundRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            status: row.get(1)?,
            start_time: row.get(2)?,
            timer_started_at: row.get(3)?,
            end_time: row.get(4)?,
            completed_time: row.get(5)?,
            total_value: row.get(6)?,
            secret: row.get(7)?,
            secret_hash: row.get(8)?,
            winner: row.get(9)?,
            winning_ticket: row.get(10)?,
            tax_value: row.get(11)?,
            participants: row.get(12)?,
            items: row.get(13)?,
            tax_items: row.get(14)?,
        })
    }

    fn into_round(self) -> Result<Round> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| JackpotError::corrupt(format!("round id '{}': {}", self.id, e)))?;

        Ok(Round {
            id,
            status: self.status.parse::<RoundStatus>()?,
            start_time: from_millis(self.start_time)?,
            timer_started_at: from_millis_opt(self.timer_started_at)?,
            end_time: from_millis_opt(self.end_time)?,
            completed_time: from_millis_opt(self.completed_time)?,
            total_value: Money::from_cents(self.total_value as u64),
            participants: serde_json::from_str(&self.participants)?,
            items: serde_json::from_str(&self.items)?,
            secret: self.secret,
            secret_hash: self.secret_hash,
            winner: self.winner,
            winning_ticket: self.winning_ticket.map(|t| t as u64),
            tax_items: serde_json::from_str(&self.tax_items)?,
            tax_value: Money::from_cents(self.tax_value as u64),
        })
    }
}

/// One page of completed rounds, newest first.
#[derive(Debug, Clone)]
pub struct CompletedPage {
    pub rounds: Vec<Round>,
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
}

pub struct RoundStore<'a> {
    storage: &'a Storage,
}

impl<'a> RoundStore<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Writes the whole round in one statement, so a row is never left
    /// half-updated.
    pub async fn save_round(&self, round: &Round) -> Result<()> {
        let conn = self.storage.get_connection().await;

        let participants_json = serde_json::to_string(&round.participants)?;
        let items_json = serde_json::to_string(&round.items)?;
        let tax_items_json = serde_json::to_string(&round.tax_items)?;

        conn.execute(
            &format!(
                "INSERT OR REPLACE INTO rounds ({})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
                ROUND_COLUMNS
            ),
            params![
                round.id.to_string(),
                round.status.as_str(),
                to_millis(round.start_time),
                round.timer_started_at.map(to_millis),
                round.end_time.map(to_millis),
                round.completed_time.map(to_millis),
                round.total_value.cents() as i64,
                round.secret,
                round.secret_hash,
                round.winner,
                round.winning_ticket.map(|t| t as i64),
                round.tax_value.cents() as i64,
                participants_json,
                items_json,
                tax_items_json,
            ],
        )?;

        tracing::debug!("Saved round {} ({})", round.id, round.status.as_str());
        Ok(())
    }

    pub async fn load_round(&self, round_id: Uuid) -> Result<Round> {
        let conn = self.storage.get_connection().await;

        let row = conn
            .query_row(
                &format!("SELECT {} FROM rounds WHERE id = ?1", ROUND_COLUMNS),
                params![round_id.to_string()],
                RoundRow::from_row,
            )
            .optional()?;

        row.ok_or(JackpotError::RoundNotFound(round_id))?
            .into_round()
    }

    /// The round still holding the pot, if any: `active` or `rolling`.
    pub async fn find_current_round(&self) -> Result<Option<Round>> {
        let conn = self.storage.get_connection().await;

        let row = conn
            .query_row(
                &format!(
                    "SELECT {} FROM rounds WHERE status IN ('active', 'rolling')
                     ORDER BY start_time DESC LIMIT 1",
                    ROUND_COLUMNS
                ),
                [],
                RoundRow::from_row,
            )
            .optional()?;

        row.map(RoundRow::into_round).transpose()
    }

    /// Completed rounds sorted by completion time, newest first. `page`
    /// starts at 1.
    pub async fn list_completed(&self, page: u32, per_page: u32) -> Result<CompletedPage> {
        let page = page.max(1);
        let per_page = per_page.max(1);
        let offset = (page as i64 - 1) * per_page as i64;

        let conn = self.storage.get_connection().await;

        let total: i64 = conn.query_row(
            "SELECT COUNT(*) FROM rounds WHERE status = 'completed'",
            [],
            |row| row.get(0),
        )?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM rounds WHERE status = 'completed'
             ORDER BY completed_time DESC LIMIT ?1 OFFSET ?2",
            ROUND_COLUMNS
        ))?;

        let row_iter = stmt.query_map(params![per_page as i64, offset], RoundRow::from_row)?;

        let mut rounds = Vec::new();
        for row in row_iter {
            rounds.push(row?.into_round()?);
        }

        Ok(CompletedPage {
            rounds,
            page,
            per_page,
            total: total as u64,
        })
    }

    /// Completed rounds with a winner but no payout trade on record, oldest
    /// first.
    pub async fn find_unpaid_rounds(&self) -> Result<Vec<Round>> {
        let conn = self.storage.get_connection().await;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM rounds r
             WHERE r.status = 'completed' AND r.winner IS NOT NULL
               AND NOT EXISTS (
                   SELECT 1 FROM trades t WHERE t.round_id = r.id AND t.kind = 'payout'
               )
             ORDER BY r.completed_time ASC",
            ROUND_COLUMNS
        ))?;

        let row_iter = stmt.query_map([], RoundRow::from_row)?;

        let mut rounds = Vec::new();
        for row in row_iter {
            rounds.push(row?.into_round()?);
        }

        Ok(rounds)
    }
}
