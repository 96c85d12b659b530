//! Deterministic in-process exchange for integration tests.
#![allow(dead_code)]

use klinefeed_core::data::{CandleSource, DataError, HistoryQuery, Page, RawCandle, RawLayout};
use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

pub const HOUR_MS: i64 = 3_600_000;

/// 2024-01-01T00:00:00Z
pub const JAN_1_2024_MS: i64 = 1_704_067_200_000;

/// Serves a fixed candle series in OKX wire format and counts calls.
pub struct StubExchange {
    candles: Mutex<Vec<i64>>,
    page_size: usize,
    reject: AtomicBool,
    pub history_calls: AtomicUsize,
    pub latest_calls: AtomicUsize,
}

impl StubExchange {
    pub fn new(open_times: Vec<i64>, page_size: usize) -> Self {
        Self {
            candles: Mutex::new(open_times),
            page_size,
            reject: AtomicBool::new(false),
            history_calls: AtomicUsize::new(0),
            latest_calls: AtomicUsize::new(0),
        }
    }

    /// `count` candles spaced `step_ms` apart starting at `first_ms`.
    pub fn series(first_ms: i64, step_ms: i64, count: usize, page_size: usize) -> Self {
        let times = (0..count as i64).map(|i| first_ms + i * step_ms).collect();
        Self::new(times, page_size)
    }

    pub fn calls(&self) -> usize {
        self.history_calls.load(Ordering::SeqCst) + self.latest_calls.load(Ordering::SeqCst)
    }

    pub fn set_reject(&self, reject: bool) {
        self.reject.store(reject, Ordering::SeqCst);
    }

    pub fn push_candle(&self, open_ms: i64) {
        self.candles.lock().unwrap().push(open_ms);
    }

    fn row(open_ms: i64) -> RawCandle {
        // Prices derived from the timestamp so every row is distinct.
        let base = 40_000.0 + ((open_ms / HOUR_MS) % 1_000) as f64;
        vec![
            json!(open_ms.to_string()),
            json!(format!("{base}")),
            json!(format!("{}", base + 50.0)),
            json!(format!("{}", base - 50.0)),
            json!(format!("{}", base + 10.5)),
            json!("12.5"),
            json!(format!("{}", 12.5 * base)),
            json!(format!("{}", 12.5 * base)),
            json!("1"),
        ]
    }

    fn rejection() -> Page {
        Page::Rejected {
            code: "50011".into(),
            message: "Too Many Requests".into(),
        }
    }

    /// Newest-first rows in `[after, before)`, at most `limit`.
    fn window(&self, after: Option<i64>, before: i64, limit: usize) -> Vec<RawCandle> {
        let mut times: Vec<i64> = self
            .candles
            .lock()
            .unwrap()
            .iter()
            .copied()
            .filter(|t| *t < before && after.map_or(true, |a| *t >= a))
            .collect();
        times.sort_unstable_by(|a, b| b.cmp(a));
        times.into_iter().take(limit).map(Self::row).collect()
    }
}

impl CandleSource for StubExchange {
    fn name(&self) -> &str {
        "stub"
    }

    fn format_symbol(&self, symbol: &str) -> String {
        symbol.replace('/', "-")
    }

    fn format_timeframe(&self, timeframe: &str) -> String {
        klinefeed_core::timeframe::bar_code(timeframe)
    }

    fn layout(&self) -> &RawLayout {
        &RawLayout::OKX
    }

    fn page_size(&self) -> usize {
        self.page_size
    }

    fn latest(&self, _inst: &str, _bar: &str, limit: usize) -> Result<Page, DataError> {
        self.latest_calls.fetch_add(1, Ordering::SeqCst);
        if self.reject.load(Ordering::SeqCst) {
            return Ok(Self::rejection());
        }
        Ok(Page::Rows(self.window(None, i64::MAX, limit)))
    }

    fn history(&self, _inst: &str, _bar: &str, query: HistoryQuery) -> Result<Page, DataError> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        if self.reject.load(Ordering::SeqCst) {
            return Ok(Self::rejection());
        }
        let limit = query.limit.min(self.page_size);
        Ok(Page::Rows(self.window(query.after, query.before, limit)))
    }
}
