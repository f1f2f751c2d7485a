mod config;
mod error;
mod metrics;
mod models;
mod pipeline;
mod scheduler;
mod screen;
mod source;
mod utils;
mod watchlist;

use anyhow::{Context, Result};
use chrono::Datelike;
use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::AppConfig;
use crate::pipeline::Pipeline;
use crate::scheduler::{Scheduler, TradingHours};
use crate::source::YahooChartSource;
use crate::utils::fmt_pct;

#[derive(Parser)]
#[command(
    name = "momentum-scanner",
    about = "Market-hours momentum scanner for a stock watch-list",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Scan on the market-hours schedule until interrupted (default)
    Run,

    /// Run a single scan cycle now, whatever the time, and print the ranking
    Once,

    /// Evaluate one symbol and show its metrics without touching the output list
    Check {
        symbol: String,

        /// Print the record as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "momentum_scanner=info,warn",
        1 => "momentum_scanner=debug,info",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    let config = AppConfig::load()?;
    let hours = TradingHours::from_config(&config.schedule)?;
    let source = YahooChartSource::new(&config.source, hours.tz)
        .context("Failed to build market-data source")?;
    let pipeline = Pipeline::new(source, &config);

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => {
            let (tx, rx) = watch::channel(false);
            tokio::spawn(async move {
                shutdown_signal().await;
                info!("Shutdown signal received");
                tx.send(true).ok();
            });

            Scheduler::new(hours, pipeline, &config.schedule).run(rx).await;
        }

        Command::Once => {
            let stats = pipeline.run_cycle(hours.now()).await?;
            println!("─────────────────────────────────");
            println!("  Momentum candidates ({} of {})", stats.ranked.len(), stats.symbols_scanned);
            println!("─────────────────────────────────");
            if stats.ranked.is_empty() {
                println!("  No symbol cleared every filter.");
            }
            for (i, entry) in stats.ranked.iter().enumerate() {
                println!("  {:>2}. {:<8} {:>9}", i + 1, entry.symbol, fmt_pct(entry.one_day));
            }
            if stats.skipped > 0 {
                println!("  ({} symbols skipped, see log)", stats.skipped);
            }
            println!("─────────────────────────────────");
        }

        Command::Check { symbol, json } => {
            let now = hours.now();
            let record = pipeline.evaluate(&symbol, now.month(), now.year()).await?;
            let passes = pipeline.rules().passes(&record, now.month());

            if json {
                println!("{}", serde_json::to_string_pretty(&record)?);
            } else {
                println!("─────────────────────────────────");
                println!("  {}", record.symbol);
                println!("─────────────────────────────────");
                for (period, change) in record.windows() {
                    println!("  {:<6}: {:>9}", period, fmt_pct(change));
                }
                for key in pipeline.rules().required_months(now.month()) {
                    let label = key.map_or("?".to_string(), |k| k.to_string());
                    let value = key
                        .and_then(|k| record.monthly.get(&k))
                        .map_or("n/a".to_string(), |&v| fmt_pct(v));
                    println!("  m{:<5}: {:>9}", label, value);
                }
                println!("  Passes: {}", if passes { "yes" } else { "no" });
                println!("─────────────────────────────────");
            }
        }
    }

    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
