use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub screen: ScreenConfig,
    #[serde(default)]
    pub files: FilesConfig,
}

/// Upstream market-data source configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Pause after every symbol so the upstream does not throttle us.
    #[serde(default = "default_symbol_delay_ms")]
    pub symbol_delay_ms: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Market-hours scheduling configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScheduleConfig {
    /// IANA zone all eligibility and wake-time math is done in.
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// "HH:MM", inclusive.
    #[serde(default = "default_market_open")]
    pub market_open: String,

    /// "HH:MM", inclusive.
    #[serde(default = "default_market_close")]
    pub market_close: String,

    #[serde(default = "default_next_day_buffer_mins")]
    pub next_day_buffer_mins: i64,

    #[serde(default = "default_poll_interval_mins")]
    pub poll_interval_mins: i64,

    #[serde(default = "default_error_backoff_secs")]
    pub error_backoff_secs: u64,
}

/// Filter & rank thresholds
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScreenConfig {
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Every short window must be at least this many percent.
    #[serde(default = "default_min_window_change")]
    pub min_window_change: f64,

    /// Every required month must be strictly above this many percent.
    #[serde(default)]
    pub min_monthly_change: f64,

    #[serde(default)]
    pub month_keys: MonthKeys,
}

/// How the screen resolves the month numbers it requires from a record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MonthKeys {
    /// Same year-rollover resolution the monthly extractor uses.
    #[default]
    Rolled,
    /// Bare `current_month - k`; keys below January never match.
    Raw,
}

/// Watch-list and candidate-list file locations
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FilesConfig {
    #[serde(default = "default_input_path")]
    pub input_path: PathBuf,

    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,
}

// ── Defaults ─────────────────────────────────────────────────────────────────

fn default_base_url() -> String {
    "https://query1.finance.yahoo.com/v8/finance/chart".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    3
}
fn default_retry_delay_ms() -> u64 {
    1000
}
fn default_symbol_delay_ms() -> u64 {
    2000
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (X11; Linux x86_64) momentum-scanner/0.1".to_string()
}
fn default_timezone() -> String {
    "America/New_York".to_string()
}
fn default_market_open() -> String {
    "08:30".to_string()
}
fn default_market_close() -> String {
    "15:59".to_string()
}
fn default_next_day_buffer_mins() -> i64 {
    30
}
fn default_poll_interval_mins() -> i64 {
    5
}
fn default_error_backoff_secs() -> u64 {
    300
}
fn default_top_n() -> usize {
    28
}
fn default_min_window_change() -> f64 {
    1.0
}
fn default_input_path() -> PathBuf {
    PathBuf::from("list-of-stock-symbols-to-scan.txt")
}
fn default_output_path() -> PathBuf {
    PathBuf::from("electricity-or-utility-stocks-to-buy-list.txt")
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            symbol_delay_ms: default_symbol_delay_ms(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            market_open: default_market_open(),
            market_close: default_market_close(),
            next_day_buffer_mins: default_next_day_buffer_mins(),
            poll_interval_mins: default_poll_interval_mins(),
            error_backoff_secs: default_error_backoff_secs(),
        }
    }
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            top_n: default_top_n(),
            min_window_change: default_min_window_change(),
            min_monthly_change: 0.0,
            month_keys: MonthKeys::default(),
        }
    }
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            input_path: default_input_path(),
            output_path: default_output_path(),
        }
    }
}

// ── Loader ───────────────────────────────────────────────────────────────────

impl AppConfig {
    /// Load configuration from file + environment overrides
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let cfg = config::Config::builder()
            .add_source(
                config::File::with_name("config/default")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(
                config::File::with_name("config/local")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(config::Environment::with_prefix("SCANNER").separator("__"))
            .build()
            .context("Failed to read configuration sources")?;

        cfg.try_deserialize()
            .context("Invalid configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_constants() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.screen.top_n, 28);
        assert_eq!(cfg.screen.min_window_change, 1.0);
        assert_eq!(cfg.screen.month_keys, MonthKeys::Rolled);
        assert_eq!(cfg.schedule.market_open, "08:30");
        assert_eq!(cfg.schedule.market_close, "15:59");
        assert_eq!(cfg.schedule.error_backoff_secs, 300);
        assert_eq!(cfg.source.symbol_delay_ms, 2000);
    }

    #[test]
    fn test_partial_toml_keeps_section_defaults() {
        let cfg: AppConfig = config::Config::builder()
            .add_source(config::File::from_str(
                "[screen]\ntop_n = 5\nmonth_keys = \"raw\"\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(cfg.screen.top_n, 5);
        assert_eq!(cfg.screen.month_keys, MonthKeys::Raw);
        assert_eq!(cfg.screen.min_window_change, 1.0);
        assert_eq!(cfg.schedule.timezone, "America/New_York");
    }
}
