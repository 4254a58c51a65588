use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use ibba_sync::{
    MemorySink, RecordSink, RetentionPolicy, RunOutcome, ScrapeConfig, ScrapeKind, ScrapeRunner,
    StoreClient,
};

#[derive(Parser)]
#[command(
    name = "ibba-sync",
    about = "Scrape IBBA league standings and schedules into the app store"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scrape once (or on an interval) and persist the result
    Run {
        #[arg(value_enum)]
        kind: KindArg,

        /// Parse and normalize but keep the records in memory
        #[arg(long)]
        dry_run: bool,

        /// Keep running, repeating the scrape every N hours
        #[arg(long)]
        every_hours: Option<u64>,
    },
    /// Delete every stored row of one kind
    Clear {
        #[arg(value_enum)]
        kind: KindArg,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum KindArg {
    Standings,
    Schedule,
}

impl From<KindArg> for ScrapeKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Standings => ScrapeKind::Standings,
            KindArg::Schedule => ScrapeKind::Schedule,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = ScrapeConfig::from_env();

    match cli.command {
        Command::Run {
            kind,
            dry_run: true,
            ..
        } => {
            let runner = ScrapeRunner::new(config, MemorySink::new());
            let outcome = runner.run(kind.into()).await;
            print_outcome(&outcome)?;

            match kind.into() {
                ScrapeKind::Standings => println!(
                    "{}",
                    serde_json::to_string_pretty(&runner.sink().standings())?
                ),
                ScrapeKind::Schedule => {
                    println!("{}", serde_json::to_string_pretty(&runner.sink().games())?)
                }
            }
            exit_on_failure(outcome)
        }
        Command::Run {
            kind,
            dry_run: false,
            every_hours,
        } => {
            let runner = ScrapeRunner::new(config, store_from_env()?);
            loop {
                let outcome = runner.run(kind.into()).await;
                print_outcome(&outcome)?;

                let Some(hours) = every_hours else {
                    return exit_on_failure(outcome);
                };
                tokio::time::sleep(Duration::from_secs(hours * 3600)).await;
            }
        }
        Command::Clear { kind } => {
            let store = store_from_env()?;
            store
                .clear(kind.into())
                .await
                .with_context(|| format!("failed to clear {} table", ScrapeKind::from(kind)))?;
            println!("cleared {}", ScrapeKind::from(kind));
            Ok(())
        }
    }
}

fn store_from_env() -> Result<StoreClient> {
    let base_url = std::env::var("SUPABASE_URL").context("SUPABASE_URL not set in .env file")?;
    let api_key = std::env::var("SUPABASE_SERVICE_ROLE_KEY")
        .context("SUPABASE_SERVICE_ROLE_KEY not set in .env file")?;
    let policy = match std::env::var("IBBA_RETENTION").as_deref() {
        Ok("replace") => RetentionPolicy::ReplaceAll,
        _ => RetentionPolicy::UpsertByKey,
    };
    Ok(StoreClient::new(base_url, api_key, policy))
}

fn print_outcome(outcome: &RunOutcome) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(outcome)?);
    Ok(())
}

fn exit_on_failure(outcome: RunOutcome) -> Result<()> {
    if outcome.success {
        Ok(())
    } else {
        anyhow::bail!(
            "scrape failed: {}",
            outcome.error.unwrap_or_else(|| "unknown error".to_string())
        )
    }
}
