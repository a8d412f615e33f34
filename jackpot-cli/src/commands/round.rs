use anyhow::Result;
use comfy_table::{presets::UTF8_FULL, Table};
use jackpot_core::{RoundView, Storage};
use jackpot_engine::RoundQuery;
use uuid::Uuid;

pub async fn list_rounds(storage: &Storage, page: u32, per_page: u32) -> Result<()> {
    let listing = RoundQuery::new(storage).completed(page, per_page).await?;

    if listing.rounds.is_empty() {
        println!("No completed rounds.");
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec![
        "Round ID",
        "Completed",
        "Players",
        "Pot",
        "Tax",
        "Winner",
        "Ticket",
    ]);

    for round in &listing.rounds {
        table.add_row(vec![
            round.id.to_string()[..8].to_string(),
            round
                .completed_time
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_default(),
            round.participants.len().to_string(),
            round.total_value.to_string(),
            round.tax_value.to_string(),
            round.winner.clone().unwrap_or_else(|| "-".to_string()),
            round
                .winning_ticket
                .map(|t| t.to_string())
                .unwrap_or_else(|| "-".to_string()),
        ]);
    }

    println!(
        "Completed rounds (page {} of {}, {} total):",
        listing.page,
        listing.total.div_ceil(listing.per_page as u64).max(1),
        listing.total
    );
    println!("{}", table);

    Ok(())
}

pub async fn show_round(storage: &Storage, round_id: Uuid) -> Result<()> {
    let round = RoundQuery::new(storage).round(round_id).await?;
    print_round(&round);
    Ok(())
}

pub async fn verify_round(
    storage: &Storage,
    round_id: Uuid,
    server_seed: &str,
    ticket: u64,
) -> Result<()> {
    let report = RoundQuery::new(storage)
        .verify(round_id, server_seed, ticket)
        .await?;

    if report.verified {
        println!("Round {} verified: ticket {} is correct", round_id, ticket);
    } else {
        println!(
            "Round {} NOT verified: {}",
            round_id,
            report.reason.unwrap_or_default()
        );
    }

    Ok(())
}

fn print_round(round: &RoundView) {
    println!("Round: {}", round.id);
    println!("Status: {}", round.status.as_str());
    println!("Started: {}", round.start_time.format("%Y-%m-%d %H:%M:%S"));
    if let Some(completed) = round.completed_time {
        println!("Completed: {}", completed.format("%Y-%m-%d %H:%M:%S"));
    }
    println!("Pot: {} ({} tickets)", round.total_value, round.total_tickets);
    println!("Secret hash: {}", round.secret_hash);
    if let Some(secret) = &round.secret {
        println!("Server seed: {}", secret);
    }
    if let (Some(winner), Some(ticket)) = (&round.winner, round.winning_ticket) {
        println!("Winner: {} (ticket {})", winner, ticket);
    }
    if !round.tax_items.is_empty() {
        println!("Tax: {} ({} items)", round.tax_value, round.tax_items.len());
    }

    if round.participants.is_empty() {
        return;
    }

    println!();
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["User", "Value", "Tickets", "Chance"]);

    let mut first_ticket = 0u64;
    for participant in &round.participants {
        let chance = if round.total_tickets == 0 {
            0.0
        } else {
            participant.tickets as f64 * 100.0 / round.total_tickets as f64
        };
        table.add_row(vec![
            participant.user_id.clone(),
            participant.items_value.to_string(),
            format!(
                "{}..{}",
                first_ticket,
                first_ticket + participant.tickets
            ),
            format!("{:.2}%", chance),
        ]);
        first_ticket += participant.tickets;
    }

    println!("{}", table);
}
