//! Exchange source trait and structured error types.
//!
//! `CandleSource` is the per-exchange capability set: symbol and timeframe
//! formatting, the raw row layout, the page size, and the two REST calls.
//! Pagination, normalization and caching sit above this trait; sources know
//! nothing about them.

use super::normalize::RawLayout;
use thiserror::Error;

/// One raw candle row exactly as the exchange returned it (positional array).
pub type RawCandle = Vec<serde_json::Value>;

/// Structured error types for data operations.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("unknown timeframe: {0}")]
    UnknownTimeframe(String),

    #[error("cache error: {0}")]
    CacheError(String),

    #[error("frame error: {0}")]
    FrameError(String),

    #[error("config error: {0}")]
    ConfigError(String),
}

impl From<polars::prelude::PolarsError> for DataError {
    fn from(e: polars::prelude::PolarsError) -> Self {
        DataError::FrameError(e.to_string())
    }
}

/// Outcome of a single exchange call that reached the exchange.
#[derive(Debug, Clone, PartialEq)]
pub enum Page {
    /// Success status; rows are in whatever order the exchange sent them.
    Rows(Vec<RawCandle>),
    /// Non-success status reported by the exchange.
    Rejected { code: String, message: String },
}

impl Page {
    /// Rows of a successful page, or an empty slice for a rejection.
    pub fn rows(&self) -> &[RawCandle] {
        match self {
            Page::Rows(rows) => rows,
            Page::Rejected { .. } => &[],
        }
    }
}

/// Parameters for one history call.
///
/// Sources return up to `limit` candles with `after <= open_time < before`,
/// most recent first. `after = None` leaves the lower bound open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryQuery {
    pub after: Option<i64>,
    pub before: i64,
    pub limit: usize,
}

/// An exchange REST backend.
pub trait CandleSource: Send + Sync {
    /// Short name used in logs, e.g. `"okx"`.
    fn name(&self) -> &str;

    /// Exchange instrument id for a `BASE/QUOTE` symbol.
    fn format_symbol(&self, symbol: &str) -> String;

    /// Exchange bar code for a canonical timeframe token.
    fn format_timeframe(&self, timeframe: &str) -> String;

    /// Where each canonical field sits in a raw row; absent fields are zero-filled.
    fn layout(&self) -> &RawLayout;

    /// Maximum rows the history endpoint returns per call.
    fn page_size(&self) -> usize;

    /// Most recent `limit` candles.
    fn latest(&self, inst: &str, bar: &str, limit: usize) -> Result<Page, DataError>;

    /// One page of history (see [`HistoryQuery`]).
    fn history(&self, inst: &str, bar: &str, query: HistoryQuery) -> Result<Page, DataError>;
}

/// Build the blocking HTTP client shared by the REST sources.
pub(crate) fn http_client(timeout_secs: u64) -> Result<reqwest::blocking::Client, DataError> {
    reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .user_agent(concat!("klinefeed/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| DataError::NetworkUnreachable(format!("failed to build HTTP client: {e}")))
}

/// Map a reqwest transport failure onto [`DataError`].
pub(crate) fn transport_error(e: reqwest::Error) -> DataError {
    if e.is_decode() {
        DataError::ResponseFormatChanged(e.to_string())
    } else {
        DataError::NetworkUnreachable(e.to_string())
    }
}
