use chrono::DateTime;
use chrono_tz::Tz;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

// ── Bar ───────────────────────────────────────────────────────────────────────

/// One daily OHLC observation, stamped in the reference time zone.
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub timestamp: DateTime<Tz>,
    pub open: f64,
    pub close: f64,
}

/// Chronologically ascending bars.
pub type PriceHistory = Vec<Bar>;

// ── Period ────────────────────────────────────────────────────────────────────

/// Lookback requested from the upstream source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Period {
    OneDay,
    OneWeek,
    FourteenDays,
    OneMonth,
    OneYear,
}

impl Period {
    /// The short windows that feed the threshold filter, in record order.
    pub const WINDOWS: [Period; 4] = [
        Period::OneDay,
        Period::OneWeek,
        Period::FourteenDays,
        Period::OneMonth,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Period::OneDay => "1d",
            Period::OneWeek => "1wk",
            Period::FourteenDays => "14d",
            Period::OneMonth => "1mo",
            Period::OneYear => "1y",
        }
    }

    /// Calendar days covered when the upstream has no native range for it.
    pub fn lookback_days(self) -> i64 {
        match self {
            Period::OneDay => 1,
            Period::OneWeek => 7,
            Period::FourteenDays => 14,
            Period::OneMonth => 30,
            Period::OneYear => 365,
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Per-symbol record ─────────────────────────────────────────────────────────

/// Percent change keyed by bare month number (1-12).
pub type MonthlyChangeMap = BTreeMap<u32, f64>;

/// Everything one scan cycle learned about a symbol.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SymbolRecord {
    pub symbol: String,
    pub one_day: f64,
    pub one_week: f64,
    pub fourteen_days: f64,
    pub one_month: f64,
    pub monthly: MonthlyChangeMap,
}

impl SymbolRecord {
    /// Short-window changes in `Period::WINDOWS` order.
    pub fn windows(&self) -> [(Period, f64); 4] {
        [
            (Period::OneDay, self.one_day),
            (Period::OneWeek, self.one_week),
            (Period::FourteenDays, self.fourteen_days),
            (Period::OneMonth, self.one_month),
        ]
    }
}

// ── Ranked output ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct RankedEntry {
    pub symbol: String,
    pub one_day: f64,
}

/// Survivors of the screen, best 1-day change first.
pub type RankedList = Vec<RankedEntry>;
