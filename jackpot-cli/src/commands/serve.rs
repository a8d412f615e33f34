use anyhow::Result;
use jackpot_core::{Item, JackpotConfig, Money, Storage, TradeRecord};
use jackpot_engine::{start_service, LogBroadcaster, OrchestratorHandle, SimulatedTradeDesk};
use rand::seq::SliceRandom;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

const DEMO_USERS: &[&str] = &["alice", "bob", "carol", "dave", "erin", "frank"];
const DEMO_SKINS: &[&str] = &["AK-47 | Redline", "AWP | Asiimov", "Glock | Fade", "M4A4 | Howl"];

pub async fn serve(config: JackpotConfig, storage: Arc<Storage>, deposits: usize) -> Result<()> {
    let pace = config.round_duration / 4;
    let (handle, service) = start_service(
        config,
        storage,
        Arc::new(LogBroadcaster),
        Arc::new(SimulatedTradeDesk::new()),
    )?;

    println!("Round service running. Press Ctrl-C to stop.");

    if deposits > 0 {
        tokio::spawn(feed_demo_deposits(handle.clone(), deposits, pace));
    }

    tokio::signal::ctrl_c().await?;
    println!("Shutting down...");
    handle.shutdown()?;
    service.await??;

    Ok(())
}

async fn feed_demo_deposits(handle: OrchestratorHandle, count: usize, pace: Duration) {
    for _ in 0..count {
        let (trade, pause) = {
            let mut rng = rand::thread_rng();
            let user = DEMO_USERS.choose(&mut rng).copied().unwrap_or("alice");
            let items = (0..rng.gen_range(1..=3))
                .map(|_| {
                    let name = DEMO_SKINS.choose(&mut rng).copied().unwrap_or("Case");
                    let price = Money::from_cents(rng.gen_range(25..=5_000));
                    Item::new(Uuid::new_v4().to_string(), name, price, user)
                })
                .collect();
            let pause = pace.mul_f64(rng.gen_range(0.1..1.0));
            (TradeRecord::accepted_deposit(user, items), pause)
        };

        if let Err(e) = handle.deposit_accepted(trade).await {
            tracing::warn!("Demo deposit rejected: {}", e);
            return;
        }
        tokio::time::sleep(pause).await;
    }
}
