//! Binance spot market-data source.
//!
//! `GET /api/v3/klines` serves both the latest candles and history. The body
//! is a bare array of 12-field rows, oldest first; errors are non-2xx
//! responses carrying `{"code": -1121, "msg": "Invalid symbol."}`.
//!
//! With only `endTime` set, Binance returns the `limit` most recent candles
//! opening at or before it, which is exactly the "page before the cursor"
//! the paginator expects. Rows older than the lower bound are dropped here.

use super::normalize::{coerce_i64, RawLayout};
use super::provider::{
    http_client, transport_error, CandleSource, DataError, HistoryQuery, Page, RawCandle,
};
use crate::timeframe::Timeframe;
use serde::Deserialize;

pub const DEFAULT_BASE_URL: &str = "https://api.binance.com";
pub const HISTORY_PAGE_SIZE: usize = 1000;

#[derive(Debug, Deserialize)]
struct ApiError {
    code: i64,
    #[serde(default)]
    msg: String,
}

/// Interpret a Binance klines response body.
pub fn parse_response(status: u16, body: &str) -> Result<Page, DataError> {
    if (200..300).contains(&status) {
        let rows: Vec<RawCandle> = serde_json::from_str(body).map_err(|e| {
            DataError::ResponseFormatChanged(format!("unparseable Binance klines response: {e}"))
        })?;
        return Ok(Page::Rows(rows));
    }

    Ok(match serde_json::from_str::<ApiError>(body) {
        Ok(err) => Page::Rejected {
            code: err.code.to_string(),
            message: err.msg,
        },
        Err(_) => Page::Rejected {
            code: status.to_string(),
            message: body.chars().take(200).collect(),
        },
    })
}

/// Binance REST candle source.
pub struct BinanceSource {
    client: reqwest::blocking::Client,
    base_url: String,
    page_size: usize,
}

impl BinanceSource {
    pub fn new(
        base_url: impl Into<String>,
        page_size: usize,
        timeout_secs: u64,
    ) -> Result<Self, DataError> {
        Ok(Self {
            client: http_client(timeout_secs)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            page_size,
        })
    }

    fn klines(&self, params: &[(&str, String)]) -> Result<Page, DataError> {
        let url = format!("{}/api/v3/klines", self.base_url);
        let resp = self
            .client
            .get(&url)
            .query(params)
            .send()
            .map_err(transport_error)?;
        let status = resp.status().as_u16();
        let body = resp.text().map_err(transport_error)?;
        parse_response(status, &body)
    }
}

/// Keep rows opening at or after `after`.
pub(crate) fn drop_older_than(page: Page, after: i64) -> Page {
    match page {
        Page::Rows(rows) => Page::Rows(
            rows.into_iter()
                .filter(|row| coerce_i64(row.first()).is_some_and(|t| t >= after))
                .collect(),
        ),
        rejected => rejected,
    }
}

impl CandleSource for BinanceSource {
    fn name(&self) -> &str {
        "binance"
    }

    fn format_symbol(&self, symbol: &str) -> String {
        symbol.replace(['/', '-'], "").to_uppercase()
    }

    fn format_timeframe(&self, timeframe: &str) -> String {
        match Timeframe::lookup(timeframe) {
            Some(tf) => tf.binance_interval().to_string(),
            None => {
                tracing::warn!(
                    token = timeframe,
                    "unknown timeframe, passing token through as interval"
                );
                timeframe.to_string()
            }
        }
    }

    fn layout(&self) -> &RawLayout {
        &RawLayout::BINANCE
    }

    fn page_size(&self) -> usize {
        self.page_size
    }

    fn latest(&self, inst: &str, bar: &str, limit: usize) -> Result<Page, DataError> {
        self.klines(&[
            ("symbol", inst.to_string()),
            ("interval", bar.to_string()),
            ("limit", limit.to_string()),
        ])
    }

    fn history(&self, inst: &str, bar: &str, query: HistoryQuery) -> Result<Page, DataError> {
        let page = self.klines(&history_params(inst, bar, query))?;
        Ok(match query.after {
            Some(after) => drop_older_than(page, after),
            None => page,
        })
    }
}

/// Query string for one history page.
///
/// `endTime` is inclusive on Binance while the cursor is exclusive. No
/// `startTime` is sent: with it Binance would answer with the oldest chunk.
pub fn history_params(
    inst: &str,
    bar: &str,
    query: HistoryQuery,
) -> Vec<(&'static str, String)> {
    vec![
        ("symbol", inst.to_string()),
        ("interval", bar.to_string()),
        ("endTime", (query.before - 1).to_string()),
        ("limit", query.limit.to_string()),
    ]
}
