//! klinefeed core: historical and live OHLCV candles from OKX or Binance.
//!
//! This crate contains:
//! - Timeframe tokens and their exchange bar codes
//! - Raw exchange rows -> canonical candle table (polars)
//! - Cursor-driven pagination over history endpoints
//! - Write-once range cache behind a key-value trait
//! - `ExchangeDataProvider`, the facade the trading pipeline calls

pub mod config;
pub mod data;
pub mod market;
pub mod timeframe;

pub use config::{Exchange, Settings};
pub use data::{CacheKey, CandleSchema, CandleSource, CandleStore, DataError, COLUMNS};
pub use market::ExchangeDataProvider;
pub use timeframe::Timeframe;
