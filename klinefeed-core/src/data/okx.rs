//! OKX market-data source.
//!
//! Public REST endpoints, no authentication:
//! - `GET /api/v5/market/candles`: most recent candles
//! - `GET /api/v5/market/history-candles`: older candles, 100 per call
//!
//! Every response is wrapped in `{"code": "0", "msg": "", "data": [...]}`;
//! any code other than `"0"` is a rejection. Rows are string arrays
//! `[ts, o, h, l, c, vol, volCcy, volCcyQuote, confirm]`, newest first.
//!
//! OKX names its cursors from the point of view of the result set: `after`
//! returns records *older* than the timestamp, `before` records *newer* than
//! it. Both bounds are exclusive.

use super::normalize::RawLayout;
use super::provider::{
    http_client, transport_error, CandleSource, DataError, HistoryQuery, Page, RawCandle,
};
use crate::timeframe;
use serde::Deserialize;

pub const DEFAULT_BASE_URL: &str = "https://www.okx.com";
pub const HISTORY_PAGE_SIZE: usize = 100;

#[derive(Debug, Deserialize)]
struct Envelope {
    code: String,
    #[serde(default)]
    msg: String,
    #[serde(default)]
    data: Vec<RawCandle>,
}

impl Envelope {
    fn into_page(self) -> Page {
        if self.code == "0" {
            Page::Rows(self.data)
        } else {
            Page::Rejected {
                code: self.code,
                message: self.msg,
            }
        }
    }
}

/// Interpret an OKX response body.
///
/// OKX also answers 4xx requests with an envelope, so the body wins over the
/// HTTP status whenever it parses.
pub fn parse_response(status: u16, body: &str) -> Result<Page, DataError> {
    match serde_json::from_str::<Envelope>(body) {
        Ok(envelope) => Ok(envelope.into_page()),
        Err(_) if !(200..300).contains(&status) => Ok(Page::Rejected {
            code: status.to_string(),
            message: body.chars().take(200).collect(),
        }),
        Err(e) => Err(DataError::ResponseFormatChanged(format!(
            "unparseable OKX candle response: {e}"
        ))),
    }
}

/// OKX REST candle source.
pub struct OkxSource {
    client: reqwest::blocking::Client,
    base_url: String,
    page_size: usize,
}

impl OkxSource {
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

    fn get(&self, path: &str, params: &[(&str, String)]) -> Result<Page, DataError> {
        let url = format!("{}{path}", self.base_url);
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

impl CandleSource for OkxSource {
    fn name(&self) -> &str {
        "okx"
    }

    fn format_symbol(&self, symbol: &str) -> String {
        symbol.replace('/', "-")
    }

    fn format_timeframe(&self, timeframe: &str) -> String {
        timeframe::bar_code(timeframe)
    }

    fn layout(&self) -> &RawLayout {
        &RawLayout::OKX
    }

    fn page_size(&self) -> usize {
        self.page_size
    }

    fn latest(&self, inst: &str, bar: &str, limit: usize) -> Result<Page, DataError> {
        self.get(
            "/api/v5/market/candles",
            &[
                ("instId", inst.to_string()),
                ("bar", bar.to_string()),
                ("limit", limit.to_string()),
            ],
        )
    }

    fn history(&self, inst: &str, bar: &str, query: HistoryQuery) -> Result<Page, DataError> {
        self.get(
            "/api/v5/market/history-candles",
            &history_params(inst, bar, query),
        )
    }
}

/// Query string for `history-candles`.
///
/// OKX `after` is our exclusive upper bound as-is. OKX `before` is exclusive
/// too, so it is sent one millisecond below the inclusive lower bound.
pub fn history_params(
    inst: &str,
    bar: &str,
    query: HistoryQuery,
) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("instId", inst.to_string()),
        ("bar", bar.to_string()),
        ("after", query.before.to_string()),
        ("limit", query.limit.to_string()),
    ];
    if let Some(after) = query.after {
        params.push(("before", (after - 1).to_string()));
    }
    params
}
