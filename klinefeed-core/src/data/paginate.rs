//! Cursor-driven history pagination.
//!
//! History endpoints return at most one page of the most recent candles
//! before a cursor. To cover `[start, end]` we walk backwards: each page's
//! oldest timestamp becomes the next cursor. Every call depends on the
//! previous result, so pages are strictly sequential.

use super::normalize::coerce_i64;
use super::provider::{CandleSource, HistoryQuery, Page, RawCandle};

/// Why the loop stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The exchange answered with a non-success status.
    Rejected { code: String, message: String },
    /// The call failed before the exchange answered.
    TransportFailed(String),
    /// A page came back empty.
    EmptyPage,
    /// The oldest candle reached the requested start.
    ReachedStart,
    /// A page shorter than the page size: nothing older exists.
    ShortPage,
    /// No timestamp in the page could be parsed.
    NoTimestamps,
    /// The oldest timestamp did not move the cursor backwards.
    CursorStalled,
}

/// Raw rows collected by one pagination run.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    /// Rows in arrival order (newest page first).
    pub rows: Vec<RawCandle>,
    pub pages: usize,
    pub stop: StopReason,
}

/// Drives a [`CandleSource`] history endpoint across a time range.
pub struct PaginatedFetcher<'a> {
    source: &'a dyn CandleSource,
    page_size: usize,
    time_index: usize,
}

impl<'a> PaginatedFetcher<'a> {
    pub fn new(source: &'a dyn CandleSource) -> Self {
        Self {
            source,
            page_size: source.page_size().max(1),
            time_index: source.layout().open_time,
        }
    }

    /// Collect raw rows covering `[start_ms, end_ms]`.
    ///
    /// Never fails: a rejected or failed call ends the loop and whatever was
    /// accumulated so far is returned.
    pub fn fetch(&self, inst: &str, bar: &str, start_ms: i64, end_ms: i64) -> FetchOutcome {
        let mut rows = Vec::new();
        let mut cursor = end_ms;
        let mut pages = 0;

        let stop = loop {
            let query = HistoryQuery {
                after: Some(start_ms),
                before: cursor,
                limit: self.page_size,
            };
            pages += 1;

            let page = match self.source.history(inst, bar, query) {
                Ok(Page::Rows(page)) => page,
                Ok(Page::Rejected { code, message }) => {
                    tracing::warn!(
                        source = self.source.name(),
                        inst,
                        %code,
                        %message,
                        "history page rejected"
                    );
                    break StopReason::Rejected { code, message };
                }
                Err(e) => {
                    tracing::warn!(
                        source = self.source.name(),
                        inst,
                        error = %e,
                        "history page failed"
                    );
                    break StopReason::TransportFailed(e.to_string());
                }
            };

            if page.is_empty() {
                break StopReason::EmptyPage;
            }

            let page_len = page.len();
            let oldest = page
                .iter()
                .filter_map(|row| coerce_i64(row.get(self.time_index)))
                .min();
            rows.extend(page);

            let Some(oldest) = oldest else {
                break StopReason::NoTimestamps;
            };
            if oldest <= start_ms {
                break StopReason::ReachedStart;
            }
            if page_len < self.page_size {
                break StopReason::ShortPage;
            }
            if oldest >= cursor {
                break StopReason::CursorStalled;
            }
            cursor = oldest;
        };

        tracing::debug!(
            source = self.source.name(),
            inst,
            bar,
            pages,
            rows = rows.len(),
            stop = ?stop,
            "pagination finished"
        );

        FetchOutcome { rows, pages, stop }
    }
}
