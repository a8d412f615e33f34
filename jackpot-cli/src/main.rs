mod commands;
mod config;

use clap::{Parser, Subcommand};
use config::CliConfig;
use jackpot_core::Storage;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "jackpot")]
#[command(about = "Provably-fair jackpot rounds")]
#[command(version)]
struct Cli {
    /// Data directory for the round database
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// Engine config (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the round service until Ctrl-C
    Serve {
        /// Feed this many random demo deposits
        #[arg(long, default_value = "0")]
        deposits: usize,
    },
    /// Record an accepted deposit for the next serve
    Deposit {
        /// User id
        user: String,
        /// Item prices, e.g. 12.50 or $0.99
        #[arg(required = true)]
        prices: Vec<String>,
    },
    /// List completed rounds, newest first
    Rounds {
        #[arg(short, long, default_value = "1")]
        page: u32,
        #[arg(long, default_value = "10")]
        per_page: u32,
    },
    /// Show a single round
    Show {
        /// Round ID
        round_id: Uuid,
    },
    /// Check a completed round's outcome
    Verify {
        /// Round ID
        round_id: Uuid,
        /// Revealed server seed
        server_seed: String,
        /// Claimed winning ticket
        ticket: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!(
            "jackpot={},jackpot_engine={},jackpot_core={}",
            log_level, log_level, log_level
        )))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = CliConfig::load(cli.data_dir, cli.config.as_deref()).await?;
    tokio::fs::create_dir_all(&config.data_dir).await?;
    let storage = Arc::new(Storage::new(&config.db_path()).await?);

    let result = match cli.command {
        Commands::Serve { deposits } => {
            commands::serve(config.engine.clone(), storage, deposits).await
        }
        Commands::Deposit { user, prices } => {
            commands::record_deposit(&storage, &user, &prices).await
        }
        Commands::Rounds { page, per_page } => {
            commands::list_rounds(&storage, page, per_page).await
        }
        Commands::Show { round_id } => commands::show_round(&storage, round_id).await,
        Commands::Verify {
            round_id,
            server_seed,
            ticket,
        } => commands::verify_round(&storage, round_id, &server_seed, ticket).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}
