use crate::models::Period;
use thiserror::Error;

/// Faults raised by the upstream market-data source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("rate limited (HTTP {0})")]
    RateLimited(u16),

    #[error("HTTP error {status} from {url}")]
    Status { status: u16, url: String },

    #[error("malformed chart payload: {0}")]
    Decode(String),

    #[error("upstream error {code}: {description}")]
    Upstream { code: String, description: String },
}

impl SourceError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            SourceError::Http(e) => e.is_timeout() || e.is_connect(),
            SourceError::RateLimited(_) => true,
            SourceError::Status { status, .. } => *status >= 500,
            SourceError::Decode(_) | SourceError::Upstream { .. } => false,
        }
    }
}

/// A window change that cannot be computed.
#[derive(Debug, Error, PartialEq)]
pub enum MetricError {
    #[error("opening price is zero on {0}")]
    ZeroOpen(String),
}

/// One window of one symbol that could not be evaluated.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("{period} fetch failed: {source}")]
    Fetch {
        period: Period,
        #[source]
        source: SourceError,
    },

    #[error("{period} change undefined: {source}")]
    Metric {
        period: Period,
        #[source]
        source: MetricError,
    },
}

/// Every fault for a symbol; the symbol is left out of the cycle.
#[derive(Debug, Error)]
#[error("{symbol}: {}", join_faults(.faults))]
pub struct SymbolFault {
    pub symbol: String,
    pub faults: Vec<EvalError>,
}

fn join_faults(faults: &[EvalError]) -> String {
    faults
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
