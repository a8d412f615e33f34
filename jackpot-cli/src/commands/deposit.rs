use anyhow::{bail, Result};
use jackpot_core::{tickets_for, Item, ItemStore, Money, Storage, TradeRecord, TradeStore};
use uuid::Uuid;

/// Stores an accepted deposit with no round assigned. The next `serve`
/// picks it up from the backlog.
pub async fn record_deposit(storage: &Storage, user: &str, prices: &[String]) -> Result<()> {
    if prices.is_empty() {
        bail!("A deposit needs at least one item");
    }

    let mut items = Vec::with_capacity(prices.len());
    for (index, raw) in prices.iter().enumerate() {
        let price: Money = raw.parse()?;
        items.push(Item::new(
            Uuid::new_v4().to_string(),
            format!("Item #{}", index + 1),
            price,
            user,
        ));
    }

    let trade = TradeRecord::accepted_deposit(user, items);
    ItemStore::new(storage).save_items(&trade.items).await?;
    TradeStore::new(storage).save_trade(&trade).await?;

    println!("Recorded deposit {}", trade.id);
    println!("User: {}", trade.user_id);
    println!("Items: {}", trade.items.len());
    println!("Value: {} ({} tickets)", trade.value, tickets_for(trade.value));

    Ok(())
}
