//! Decoder for the Yahoo Finance v8 chart payload.

use crate::error::SourceError;
use crate::models::{Bar, PriceHistory};
use chrono::{TimeZone, Utc};
use chrono_tz::Tz;
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    // Absent when the range holds no sessions.
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
}

// high, low and volume are not needed for window changes.
#[derive(Debug, Default, Deserialize)]
struct Quote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
}

/// Decode a chart response into ascending bars stamped in `tz`.
///
/// Rows missing an open or a close are dropped. A "Not Found" error payload
/// or a missing result decodes to an empty history.
pub fn parse_chart(body: &str, tz: Tz) -> Result<PriceHistory, SourceError> {
    let envelope: ChartEnvelope =
        serde_json::from_str(body).map_err(|e| SourceError::Decode(e.to_string()))?;

    if let Some(err) = envelope.chart.error {
        if err.code == "Not Found" {
            return Ok(Vec::new());
        }
        return Err(SourceError::Upstream {
            code: err.code,
            description: err.description.unwrap_or_default(),
        });
    }

    let Some(result) = envelope.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(Vec::new());
    };

    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();
    let mut bars = Vec::with_capacity(result.timestamp.len());
    let mut dropped = 0usize;

    for (i, &ts) in result.timestamp.iter().enumerate() {
        let open = quote.open.get(i).copied().flatten();
        let close = quote.close.get(i).copied().flatten();
        let stamp = Utc.timestamp_opt(ts, 0).single();

        let (Some(open), Some(close), Some(stamp)) = (open, close, stamp) else {
            dropped += 1;
            continue;
        };

        bars.push(Bar {
            timestamp: stamp.with_timezone(&tz),
            open,
            close,
        });
    }

    if dropped > 0 {
        debug!("dropped {} incomplete rows", dropped);
    }

    bars.sort_by_key(|b| b.timestamp);
    Ok(bars)
}
