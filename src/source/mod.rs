pub mod chart;
pub mod http_client;

use crate::config::SourceConfig;
use crate::error::SourceError;
use crate::models::{Period, PriceHistory};
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use tracing::{debug, warn};
use url::Url;

use self::chart::parse_chart;
use self::http_client::HttpClient;

// ── Source trait ──────────────────────────────────────────────────────────────

/// Swappable market-data source.
///
/// Returns ascending bars for `symbol` over `period`, an empty history when
/// the upstream has nothing, or a fault.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    async fn fetch_history(&self, symbol: &str, period: Period)
    -> Result<PriceHistory, SourceError>;
}

// ── Yahoo chart source ────────────────────────────────────────────────────────

pub struct YahooChartSource {
    client: HttpClient,
    base_url: Url,
    tz: Tz,
}

impl YahooChartSource {
    pub fn new(config: &SourceConfig, tz: Tz) -> Result<Self> {
        let base_url = Url::parse(config.base_url.trim_end_matches('/'))
            .with_context(|| format!("Invalid source base_url {:?}", config.base_url))?;
        if base_url.cannot_be_a_base() {
            bail!("Source base_url {:?} cannot carry a path", config.base_url);
        }

        Ok(Self {
            client: HttpClient::new(config)?,
            base_url,
            tz,
        })
    }

    /// Chart URL for `symbol`. e.g. DUK, 1y → /v8/finance/chart/DUK?interval=1d&range=1y
    fn chart_url(&self, symbol: &str, period: Period, now: DateTime<Utc>) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(symbol);
        }

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("interval", "1d");
            match native_range(period) {
                Some(range) => {
                    query.append_pair("range", range);
                }
                None => {
                    let start = now - Duration::days(period.lookback_days());
                    query
                        .append_pair("period1", &start.timestamp().to_string())
                        .append_pair("period2", &now.timestamp().to_string());
                }
            }
        }

        url
    }
}

/// Ranges the chart endpoint understands directly.
fn native_range(period: Period) -> Option<&'static str> {
    match period {
        Period::OneDay => Some("1d"),
        Period::OneMonth => Some("1mo"),
        Period::OneYear => Some("1y"),
        Period::OneWeek | Period::FourteenDays => None,
    }
}

#[async_trait]
impl MarketDataSource for YahooChartSource {
    async fn fetch_history(
        &self,
        symbol: &str,
        period: Period,
    ) -> Result<PriceHistory, SourceError> {
        let url = self.chart_url(symbol, period, Utc::now());

        let Some(body) = self.client.get_text(&url).await? else {
            warn!("{}: symbol not found upstream", symbol);
            return Ok(Vec::new());
        };

        let bars = parse_chart(&body, self.tz)?;
        debug!("{} {}: {} bars", symbol, period, bars.len());
        Ok(bars)
    }
}
