//! Scan-cycle orchestrator: ties watch-list → source → metrics → screen → output.
//!
//! ## One cycle
//!
//! 1. Re-read the watch-list (edits apply without a restart).
//! 2. For each symbol, strictly one after another, fetch the four short windows
//!    plus one year of daily bars and build a `SymbolRecord`, then pause for the
//!    configured inter-symbol delay. A symbol with any fetch or compute fault is
//!    skipped for this cycle; the rest of the batch carries on.
//! 3. Screen and rank the records, then replace the output list in one rename.
//!
//! Nothing is written unless the whole cycle completes.

use crate::config::{AppConfig, FilesConfig};
use crate::error::{EvalError, SymbolFault};
use crate::metrics::{EMPTY_WINDOW_CHANGE, monthly_changes, window_change};
use crate::models::{MonthlyChangeMap, Period, RankedList, SymbolRecord};
use crate::screen::ScreenRules;
use crate::source::MarketDataSource;
use crate::utils::{Timer, fmt_pct};
use crate::watchlist::{read_symbols, write_ranked};
use anyhow::{Context, Result};
use chrono::{DateTime, Datelike};
use chrono_tz::Tz;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

pub struct Pipeline<S> {
    source: S,
    rules: ScreenRules,
    files: FilesConfig,
    symbol_delay: Duration,
}

impl<S: MarketDataSource> Pipeline<S> {
    pub fn new(source: S, config: &AppConfig) -> Self {
        Self {
            source,
            rules: ScreenRules::from(&config.screen),
            files: config.files.clone(),
            symbol_delay: Duration::from_millis(config.source.symbol_delay_ms),
        }
    }

    pub fn rules(&self) -> &ScreenRules {
        &self.rules
    }

    /// Fetch and measure one symbol.
    ///
    /// Every window is attempted even after an earlier one fails, so the
    /// returned fault lists everything that went wrong for the symbol.
    pub async fn evaluate(
        &self,
        symbol: &str,
        current_month: u32,
        current_year: i32,
    ) -> Result<SymbolRecord, SymbolFault> {
        let mut faults = Vec::new();
        let mut changes = [EMPTY_WINDOW_CHANGE; 4];

        for (slot, period) in Period::WINDOWS.into_iter().enumerate() {
            let bars = match self.source.fetch_history(symbol, period).await {
                Ok(bars) => bars,
                Err(source) => {
                    faults.push(EvalError::Fetch { period, source });
                    continue;
                }
            };

            if bars.is_empty() {
                debug!("{}: no {} bars, using {}", symbol, period, EMPTY_WINDOW_CHANGE);
            }

            match window_change(&bars) {
                Ok(change) => changes[slot] = change,
                Err(source) => faults.push(EvalError::Metric { period, source }),
            }
        }

        let monthly = match self.source.fetch_history(symbol, Period::OneYear).await {
            Ok(history) => monthly_changes(&history, current_month, current_year)
                .unwrap_or_else(|source| {
                    faults.push(EvalError::Metric {
                        period: Period::OneYear,
                        source,
                    });
                    MonthlyChangeMap::new()
                }),
            Err(source) => {
                faults.push(EvalError::Fetch {
                    period: Period::OneYear,
                    source,
                });
                MonthlyChangeMap::new()
            }
        };

        if !faults.is_empty() {
            return Err(SymbolFault {
                symbol: symbol.to_string(),
                faults,
            });
        }

        let [one_day, one_week, fourteen_days, one_month] = changes;
        Ok(SymbolRecord {
            symbol: symbol.to_string(),
            one_day,
            one_week,
            fourteen_days,
            one_month,
            monthly,
        })
    }

    /// Run one full scan cycle with `now` fixing the month context.
    pub async fn run_cycle(&self, now: DateTime<Tz>) -> Result<CycleStats> {
        let mut timer = Timer::start("Scan cycle");

        let symbols = read_symbols(&self.files.input_path)?;
        let (month, year) = (now.month(), now.year());
        info!("=== Scanning {} symbols ({}-{:02}) ===", symbols.len(), year, month);

        let mut records = BTreeMap::new();
        let mut skipped = 0usize;

        for symbol in &symbols {
            info!("Downloading the historical data for {}...", symbol);

            match self.evaluate(symbol, month, year).await {
                Ok(record) => {
                    debug!(
                        "{}: 1d {} | 1wk {} | 14d {} | 1mo {} | months {:?}",
                        symbol,
                        fmt_pct(record.one_day),
                        fmt_pct(record.one_week),
                        fmt_pct(record.fourteen_days),
                        fmt_pct(record.one_month),
                        record.monthly
                    );
                    records.insert(symbol.clone(), record);
                }
                Err(fault) => {
                    warn!("Skipping {:#}", fault);
                    skipped += 1;
                }
            }

            sleep(self.symbol_delay).await;
        }

        let ranked = self.rules.select(&records, month);

        write_ranked(&self.files.output_path, &ranked)
            .context("Failed to write candidate list")?;

        for (i, entry) in ranked.iter().enumerate() {
            debug!("  {:>2}. {:<8} {}", i + 1, entry.symbol, fmt_pct(entry.one_day));
        }
        info!(
            "Candidate list updated: {} selected | {} scanned | {} skipped → {:?}",
            ranked.len(),
            symbols.len(),
            skipped,
            self.files.output_path
        );

        timer.complete();
        Ok(CycleStats {
            symbols_scanned: symbols.len(),
            skipped,
            ranked,
        })
    }
}

#[derive(Debug)]
pub struct CycleStats {
    pub symbols_scanned: usize,
    pub skipped: usize,
    pub ranked: RankedList,
}
