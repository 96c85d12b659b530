//! Exchange data provider: the three entry points the pipeline calls.
//!
//! - `get_latest_data()`: most recent N candles, uncached.
//! - `get_history_klines_with_end_time()`: up to N candles before a time, uncached.
//! - `get_historical_klines()`: a full date range, paginated and cached.
//!
//! Every entry point returns a canonical candle table and never an error.
//! Rejections, transport failures and internal frame errors are logged and
//! surface as a zero-row table; cache failures only cost the cache.

use crate::config::{Exchange, Settings};
use crate::data::normalize::normalize;
use crate::data::{
    BinanceSource, CacheKey, CandleSchema, CandleSource, CandleStore, Canonicalizer,
    CsvCandleStore, DataError, HistoryQuery, OkxSource, Page, PaginatedFetcher, RawCandle,
};
use chrono::{DateTime, Duration, Utc};
use polars::prelude::{DataFrame, PolarsResult};
use std::sync::Arc;

/// Range used when `get_historical_klines` is called without a start date.
pub const DEFAULT_LOOKBACK_DAYS: i64 = 30;

/// Uniform candle access over one exchange backend.
///
/// Built once by the process entry point and shared by reference.
pub struct ExchangeDataProvider {
    source: Arc<dyn CandleSource>,
    store: Arc<dyn CandleStore>,
}

impl ExchangeDataProvider {
    pub fn new(source: Arc<dyn CandleSource>, store: Arc<dyn CandleStore>) -> Self {
        Self { source, store }
    }

    /// Build the backend named in `settings`, caching to `settings.cache_dir`.
    pub fn from_settings(settings: &Settings) -> Result<Self, DataError> {
        let source: Arc<dyn CandleSource> = match settings.exchange() {
            Exchange::Okx => Arc::new(OkxSource::new(
                settings.okx.base_url.clone(),
                settings.okx.page_size,
                settings.http_timeout_secs,
            )?),
            Exchange::Binance => Arc::new(BinanceSource::new(
                settings.binance.base_url.clone(),
                settings.binance.page_size,
                settings.http_timeout_secs,
            )?),
        };
        let store = Arc::new(CsvCandleStore::new(settings.cache_dir.clone()));
        tracing::info!(
            exchange = source.name(),
            cache_dir = %settings.cache_dir.display(),
            "data provider ready"
        );
        Ok(Self::new(source, store))
    }

    /// Name of the backing exchange.
    pub fn exchange(&self) -> &str {
        self.source.name()
    }

    /// Most recent `limit` candles (possibly fewer).
    pub fn get_latest_data(&self, symbol: &str, timeframe: &str, limit: usize) -> DataFrame {
        let inst = self.source.format_symbol(symbol);
        let bar = self.source.format_timeframe(timeframe);
        let result = self.source.latest(&inst, &bar, limit);
        self.single_call("latest", &inst, timeframe, result)
    }

    /// Up to `limit` candles opening before `end_time`.
    pub fn get_history_klines_with_end_time(
        &self,
        symbol: &str,
        timeframe: &str,
        end_time: DateTime<Utc>,
        limit: usize,
    ) -> DataFrame {
        let inst = self.source.format_symbol(symbol);
        let bar = self.source.format_timeframe(timeframe);
        let query = HistoryQuery {
            after: None,
            before: end_time.timestamp_millis(),
            limit,
        };
        let result = self.source.history(&inst, &bar, query);
        self.single_call("history", &inst, timeframe, result)
    }

    /// Candles covering `[start_date, end_date]`.
    ///
    /// Defaults to the last 30 days. With `use_cache`, a stored entry for the
    /// same symbol, timeframe and calendar days is returned as-is without any
    /// network access; otherwise the range is paginated and a non-empty result
    /// is stored.
    pub fn get_historical_klines(
        &self,
        symbol: &str,
        timeframe: &str,
        start_date: Option<DateTime<Utc>>,
        end_date: Option<DateTime<Utc>>,
        use_cache: bool,
    ) -> DataFrame {
        let inst = self.source.format_symbol(symbol);
        let (start, end) = resolve_range(start_date, end_date, Utc::now());
        let key = CacheKey::new(
            inst.clone(),
            timeframe,
            start.date_naive(),
            end.date_naive(),
        );

        if use_cache {
            match self.store.get(&key) {
                Ok(Some(table)) => {
                    tracing::debug!(%key, rows = table.height(), "cache hit");
                    return table;
                }
                Ok(None) => {}
                Err(e) => tracing::warn!(%key, error = %e, "unreadable cache entry, refetching"),
            }
        }

        let bar = self.source.format_timeframe(timeframe);
        let outcome = PaginatedFetcher::new(self.source.as_ref()).fetch(
            &inst,
            &bar,
            start.timestamp_millis(),
            end.timestamp_millis(),
        );
        let table = self.to_table(&outcome.rows, timeframe);

        if use_cache && table.height() > 0 {
            if let Err(e) = self.store.put(&key, &table) {
                tracing::warn!(%key, error = %e, "failed to cache candle range");
            }
        }

        tracing::info!(
            exchange = self.source.name(),
            %key,
            pages = outcome.pages,
            rows = table.height(),
            "fetched historical candles"
        );
        table
    }

    fn single_call(
        &self,
        endpoint: &str,
        inst: &str,
        timeframe: &str,
        result: Result<Page, DataError>,
    ) -> DataFrame {
        match result {
            Ok(Page::Rows(rows)) => self.to_table(&rows, timeframe),
            Ok(Page::Rejected { code, message }) => {
                tracing::warn!(
                    exchange = self.source.name(),
                    endpoint,
                    inst,
                    %code,
                    %message,
                    "request rejected"
                );
                CandleSchema::empty()
            }
            Err(e) => {
                tracing::warn!(
                    exchange = self.source.name(),
                    endpoint,
                    inst,
                    error = %e,
                    "request failed"
                );
                CandleSchema::empty()
            }
        }
    }

    /// Normalize, then order ascending by open time without duplicates.
    ///
    /// Rows whose open time does not parse are dropped with a warning.
    fn to_table(&self, rows: &[RawCandle], timeframe: &str) -> DataFrame {
        self.build_table(rows, timeframe).unwrap_or_else(|e| {
            tracing::error!(
                exchange = self.source.name(),
                error = %e,
                "failed to build candle table"
            );
            CandleSchema::empty()
        })
    }

    fn build_table(&self, rows: &[RawCandle], timeframe: &str) -> PolarsResult<DataFrame> {
        let df = normalize(rows, self.source.layout(), timeframe)?;
        let untimed = df.column("open_time")?.null_count();
        if untimed > 0 {
            tracing::warn!(
                exchange = self.source.name(),
                dropped = untimed,
                "dropping candles without a parseable open time"
            );
        }
        Canonicalizer::canonicalize_frame(df)
    }
}

/// Fill in missing range bounds relative to `now`.
pub fn resolve_range(
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = start_date.unwrap_or_else(|| now - Duration::days(DEFAULT_LOOKBACK_DAYS));
    let end = end_date.unwrap_or(now);
    (start, end)
}
