//! Raw exchange rows -> canonical candle table.
//!
//! Exchanges send candles as positional arrays whose length and field order
//! differ per venue. A [`RawLayout`] says where each canonical field lives;
//! fields a venue does not publish are zero-filled. Individual values that do
//! not parse become nulls, so a malformed field never aborts the batch.

use super::provider::RawCandle;
use super::schema::{CandleSchema, COLUMNS};
use crate::timeframe;
use polars::prelude::*;
use serde_json::Value;

/// Positions of the canonical fields inside a raw row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLayout {
    pub open_time: usize,
    pub open: usize,
    pub high: usize,
    pub low: usize,
    pub close: usize,
    pub volume: usize,
    pub quote_volume: Option<usize>,
    pub count: Option<usize>,
    pub taker_buy_volume: Option<usize>,
    pub taker_buy_quote_volume: Option<usize>,
    pub ignore: Option<usize>,
}

impl RawLayout {
    /// OKX: `[ts, o, h, l, c, vol, volCcy, volCcyQuote, confirm]`.
    pub const OKX: RawLayout = RawLayout {
        open_time: 0,
        open: 1,
        high: 2,
        low: 3,
        close: 4,
        volume: 5,
        quote_volume: Some(6),
        count: None,
        taker_buy_volume: None,
        taker_buy_quote_volume: None,
        ignore: None,
    };

    /// Binance: `[open_time, o, h, l, c, vol, close_time, quote_vol, trades,
    /// taker_base, taker_quote, ignore]`. The exchange close time is not used.
    pub const BINANCE: RawLayout = RawLayout {
        open_time: 0,
        open: 1,
        high: 2,
        low: 3,
        close: 4,
        volume: 5,
        quote_volume: Some(7),
        count: Some(8),
        taker_buy_volume: Some(9),
        taker_buy_quote_volume: Some(10),
        ignore: Some(11),
    };

    /// Raw position of a non-time column; `None` means zero-fill.
    fn position(&self, column: &str) -> Option<usize> {
        match column {
            "open" => Some(self.open),
            "high" => Some(self.high),
            "low" => Some(self.low),
            "close" => Some(self.close),
            "volume" => Some(self.volume),
            "quote_volume" => self.quote_volume,
            "count" => self.count,
            "taker_buy_volume" => self.taker_buy_volume,
            "taker_buy_quote_volume" => self.taker_buy_quote_volume,
            "ignore" => self.ignore,
            _ => None,
        }
    }
}

/// Coerce a JSON number or numeric string to `f64`.
pub fn coerce_f64(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Coerce a JSON number or numeric string to `i64`, truncating fractions.
pub fn coerce_i64(value: Option<&Value>) -> Option<i64> {
    let truncate = |f: f64| f.is_finite().then_some(f as i64);
    match value? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(truncate)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(truncate))
        }
        _ => None,
    }
}

/// Build the canonical table from raw rows.
///
/// Row order is preserved; sorting is the caller's business. `close_time`
/// is always `open_time + duration(timeframe)`.
///
/// Row content never produces an `Err`: bad values become nulls. An error
/// can only come from polars itself while assembling the frame.
pub fn normalize(
    rows: &[RawCandle],
    layout: &RawLayout,
    timeframe: &str,
) -> PolarsResult<DataFrame> {
    let duration = timeframe::duration_ms(timeframe);

    let open_ms: Vec<Option<i64>> = rows
        .iter()
        .map(|row| coerce_i64(row.get(layout.open_time)))
        .collect();
    let close_ms: Vec<Option<i64>> = open_ms
        .iter()
        .map(|t| t.and_then(|t| t.checked_add(duration)))
        .collect();

    let columns = COLUMNS
        .iter()
        .map(|&name| match name {
            "open_time" => time_column(name, open_ms.clone()),
            "close_time" => time_column(name, close_ms.clone()),
            "count" => Ok(int_column(name, rows, layout.position(name))),
            _ => Ok(float_column(name, rows, layout.position(name))),
        })
        .collect::<PolarsResult<Vec<Column>>>()?;

    DataFrame::new(columns)
}

fn time_column(name: &str, ms: Vec<Option<i64>>) -> PolarsResult<Column> {
    Column::new(name.into(), ms).cast(&CandleSchema::time_dtype())
}

fn float_column(name: &str, rows: &[RawCandle], position: Option<usize>) -> Column {
    let values: Vec<Option<f64>> = rows
        .iter()
        .map(|row| match position {
            Some(i) => coerce_f64(row.get(i)),
            None => Some(0.0),
        })
        .collect();
    Column::new(name.into(), values)
}

fn int_column(name: &str, rows: &[RawCandle], position: Option<usize>) -> Column {
    let values: Vec<Option<i64>> = rows
        .iter()
        .map(|row| match position {
            Some(i) => coerce_i64(row.get(i)),
            None => Some(0),
        })
        .collect();
    Column::new(name.into(), values)
}
