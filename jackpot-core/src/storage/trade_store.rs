use crate::error::{JackpotError, Result};
use crate::storage::{from_millis, from_millis_opt, to_millis, Storage};
use crate::types::{Money, TradeRecord, TradeStatus};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use uuid::Uuid;

const TRADE_COLUMNS: &str =
    "id, kind, user_id, items, value, status, offer_id, round_id, created_at, completed_at";

struct TradeRow {
    id: String,
    kind: String,
    user_id: String,
    items: String,
    value: i64,
    status: String,
    offer_id: Option<String>,
    round_id: Option<String>,
    created_at: i64,
    completed_at: Option<i64>,
}

impl TradeRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            kind: row.get(1)?,
            user_id: row.get(2)?,
            items: row.get(3)?,
            value: row.get(4)?,
            status: row.get(5)?,
            offer_id: row.get(6)?,
            round_id: row.get(7)?,
            created_at: row.get(8)?,
            completed_at: row.get(9)?,
        })
    }

    fn into_trade(self) -> Result<TradeRecord> {
        let parse_id = |raw: &str| {
            Uuid::parse_str(raw).map_err(|e| JackpotError::corrupt(format!("trade uuid '{}': {}", raw, e)))
        };

        Ok(TradeRecord {
            id: parse_id(&self.id)?,
            kind: self.kind.parse()?,
            user_id: self.user_id,
            items: serde_json::from_str(&self.items)?,
            value: Money::from_cents(self.value as u64),
            status: self.status.parse()?,
            offer_id: self.offer_id,
            round_id: self.round_id.as_deref().map(parse_id).transpose()?,
            created_at: from_millis(self.created_at)?,
            completed_at: from_millis_opt(self.completed_at)?,
        })
    }
}

pub struct TradeStore<'a> {
    storage: &'a Storage,
}

impl<'a> TradeStore<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    pub async fn save_trade(&self, trade: &TradeRecord) -> Result<()> {
        let conn = self.storage.get_connection().await;

        let items_json = serde_json::to_string(&trade.items)?;

        conn.execute(
            &format!(
                "INSERT OR REPLACE INTO trades ({})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                TRADE_COLUMNS
            ),
            params![
                trade.id.to_string(),
                trade.kind.as_str(),
                trade.user_id,
                items_json,
                trade.value.cents() as i64,
                trade.status.as_str(),
                trade.offer_id,
                trade.round_id.map(|r| r.to_string()),
                to_millis(trade.created_at),
                trade.completed_at.map(to_millis),
            ],
        )?;

        Ok(())
    }

    pub async fn load_trade(&self, trade_id: Uuid) -> Result<TradeRecord> {
        let conn = self.storage.get_connection().await;

        let row = conn
            .query_row(
                &format!("SELECT {} FROM trades WHERE id = ?1", TRADE_COLUMNS),
                params![trade_id.to_string()],
                TradeRow::from_row,
            )
            .optional()?;

        row.ok_or(JackpotError::TradeNotFound(trade_id))?
            .into_trade()
    }

    pub async fn update_status(
        &self,
        trade_id: Uuid,
        status: TradeStatus,
        offer_id: Option<&str>,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let conn = self.storage.get_connection().await;

        let updated = conn.execute(
            "UPDATE trades SET status = ?1, offer_id = COALESCE(?2, offer_id),
                 completed_at = COALESCE(?3, completed_at)
             WHERE id = ?4",
            params![
                status.as_str(),
                offer_id,
                completed_at.map(to_millis),
                trade_id.to_string(),
            ],
        )?;

        if updated == 0 {
            return Err(JackpotError::TradeNotFound(trade_id));
        }
        Ok(())
    }

    pub async fn assign_round(&self, trade_id: Uuid, round_id: Uuid) -> Result<()> {
        let conn = self.storage.get_connection().await;

        let updated = conn.execute(
            "UPDATE trades SET round_id = ?1 WHERE id = ?2",
            params![round_id.to_string(), trade_id.to_string()],
        )?;

        if updated == 0 {
            return Err(JackpotError::TradeNotFound(trade_id));
        }
        Ok(())
    }

    pub async fn load_round_trades(&self, round_id: Uuid) -> Result<Vec<TradeRecord>> {
        let conn = self.storage.get_connection().await;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM trades WHERE round_id = ?1 ORDER BY created_at ASC, rowid ASC",
            TRADE_COLUMNS
        ))?;

        let row_iter = stmt.query_map(params![round_id.to_string()], TradeRow::from_row)?;

        let mut trades = Vec::new();
        for row in row_iter {
            trades.push(row?.into_trade()?);
        }

        Ok(trades)
    }

    /// Accepted deposits that never made it into a round, oldest first.
    pub async fn load_unassigned_deposits(&self) -> Result<Vec<TradeRecord>> {
        let conn = self.storage.get_connection().await;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM trades
             WHERE kind = 'deposit' AND status = 'accepted' AND round_id IS NULL
             ORDER BY created_at ASC, rowid ASC",
            TRADE_COLUMNS
        ))?;

        let row_iter = stmt.query_map([], TradeRow::from_row)?;

        let mut trades = Vec::new();
        for row in row_iter {
            trades.push(row?.into_trade()?);
        }

        Ok(trades)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Item;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_unassigned_deposits_in_arrival_order() {
        let temp_dir = tempdir().unwrap();
        let storage = Storage::new(&temp_dir.path().join("jackpot.db")).await.unwrap();
        let store = TradeStore::new(&storage);

        let first = TradeRecord::accepted_deposit(
            "alice",
            vec![Item::new("a", "Case", Money::from_cents(100), "alice")],
        );
        let second = TradeRecord::accepted_deposit(
            "bob",
            vec![Item::new("b", "Key", Money::from_cents(250), "bob")],
        );
        store.save_trade(&first).await.unwrap();
        store.save_trade(&second).await.unwrap();

        let pending = store.load_unassigned_deposits().await.unwrap();
        let ids: Vec<Uuid> = pending.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![first.id, second.id]);

        store.assign_round(first.id, Uuid::new_v4()).await.unwrap();
        let pending = store.load_unassigned_deposits().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, second.id);
        assert_eq!(pending[0].items, second.items);
    }

    #[tokio::test]
    async fn test_payout_status_update() {
        let temp_dir = tempdir().unwrap();
        let storage = Storage::new(&temp_dir.path().join("jackpot.db")).await.unwrap();
        let store = TradeStore::new(&storage);

        let payout = TradeRecord::payout("carol", Uuid::new_v4(), Vec::new());
        store.save_trade(&payout).await.unwrap();

        store
            .update_status(payout.id, TradeStatus::Sent, Some("offer-9"), Some(Utc::now()))
            .await
            .unwrap();

        let loaded = store.load_trade(payout.id).await.unwrap();
        assert_eq!(loaded.status, TradeStatus::Sent);
        assert_eq!(loaded.offer_id.as_deref(), Some("offer-9"));
        assert!(loaded.completed_at.is_some());

        let missing = store
            .update_status(Uuid::new_v4(), TradeStatus::Error, None, None)
            .await;
        assert!(matches!(missing, Err(JackpotError::TradeNotFound(_))));
    }
}
