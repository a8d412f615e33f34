use crate::error::{JackpotError, Result};
use crate::storage::Storage;
use crate::types::{Item, ItemStatus, Money};
use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

pub struct ItemStore<'a> {
    storage: &'a Storage,
}

impl<'a> ItemStore<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    pub async fn save_items(&self, items: &[Item]) -> Result<()> {
        let mut conn = self.storage.get_connection().await;
        let tx = conn.transaction()?;

        for item in items {
            tx.execute(
                "INSERT OR REPLACE INTO items (id, name, price, owner, status, round_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    item.id,
                    item.name,
                    item.price.cents() as i64,
                    item.owner,
                    item.status.as_str(),
                    item.round_id.map(|id| id.to_string()),
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    pub async fn load_item(&self, item_id: &str) -> Result<Item> {
        let conn = self.storage.get_connection().await;

        let row = conn
            .query_row(
                "SELECT id, name, price, owner, status, round_id FROM items WHERE id = ?1",
                params![item_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, Option<String>>(5)?,
                    ))
                },
            )
            .optional()?;

        let (id, name, price, owner, status, round_id) =
            row.ok_or_else(|| JackpotError::ItemNotFound(item_id.to_string()))?;

        let round_id = round_id
            .map(|r| Uuid::parse_str(&r))
            .transpose()
            .map_err(|e| JackpotError::corrupt(format!("item {} round id: {}", id, e)))?;

        Ok(Item {
            id,
            name,
            price: Money::from_cents(price as u64),
            owner,
            status: status.parse()?,
            round_id,
        })
    }

    /// Moves a batch of items to `status` in one transaction.
    pub async fn update_status(
        &self,
        item_ids: &[String],
        status: ItemStatus,
        round_id: Option<Uuid>,
    ) -> Result<usize> {
        let mut conn = self.storage.get_connection().await;
        let tx = conn.transaction()?;

        let mut updated = 0;
        for id in item_ids {
            updated += tx.execute(
                "UPDATE items SET status = ?1, round_id = ?2 WHERE id = ?3",
                params![status.as_str(), round_id.map(|r| r.to_string()), id],
            )?;
        }

        tx.commit()?;
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_item_status_lifecycle() {
        let temp_dir = tempdir().unwrap();
        let storage = Storage::new(&temp_dir.path().join("jackpot.db")).await.unwrap();
        let store = ItemStore::new(&storage);

        let item = Item::new("i-1", "Sticker", Money::from_cents(42), "bob");
        store.save_items(&[item.clone()]).await.unwrap();
        assert_eq!(store.load_item("i-1").await.unwrap(), item);

        let round_id = Uuid::new_v4();
        let updated = store
            .update_status(&["i-1".to_string()], ItemStatus::InRound, Some(round_id))
            .await
            .unwrap();
        assert_eq!(updated, 1);

        let loaded = store.load_item("i-1").await.unwrap();
        assert_eq!(loaded.status, ItemStatus::InRound);
        assert_eq!(loaded.round_id, Some(round_id));

        assert!(matches!(
            store.load_item("missing").await,
            Err(JackpotError::ItemNotFound(_))
        ));
    }
}
