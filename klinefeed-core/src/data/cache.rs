//! Range cache for completed history queries.
//!
//! Layout: `{cache_dir}/{symbol}_{timeframe}_{YYYYMMDD}_{YYYYMMDD}.csv`
//!
//! Entries are write-once: there is no expiry, no merge with newer data and
//! no negative caching (empty tables are never stored). Timestamps are kept
//! on disk as epoch milliseconds and come back as datetime columns.
//! Writes land in a `.tmp` file and are renamed into place; there is no
//! locking between processes, so the last writer wins.

use super::provider::DataError;
use super::schema::{CandleSchema, COLUMNS, TIME_COLUMNS};
use chrono::NaiveDate;
use polars::prelude::*;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Identity of one cached range query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Exchange-formatted symbol (`BTC-USDT`, `BTCUSDT`).
    pub symbol: String,
    pub timeframe: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl CacheKey {
    pub fn new(
        symbol: impl Into<String>,
        timeframe: impl Into<String>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe: timeframe.into(),
            start,
            end,
        }
    }

    /// Stable identifier, e.g. `BTC-USDT_1h_20240101_20240102`.
    pub fn file_stem(&self) -> String {
        let symbol = self.symbol.replace(['/', '\\'], "-");
        format!(
            "{symbol}_{}_{}_{}",
            self.timeframe,
            self.start.format("%Y%m%d"),
            self.end.format("%Y%m%d")
        )
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.file_stem())
    }
}

/// Key-value store for candle tables.
pub trait CandleStore: Send + Sync {
    /// Stored table for `key`, verbatim, or `None` on a miss.
    fn get(&self, key: &CacheKey) -> Result<Option<DataFrame>, DataError>;

    /// Store `table` under `key`. Empty tables are ignored.
    fn put(&self, key: &CacheKey, table: &DataFrame) -> Result<(), DataError>;
}

/// CSV-file store, one file per key.
pub struct CsvCandleStore {
    cache_dir: PathBuf,
}

impl CsvCandleStore {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    /// Root directory of the cache.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Path of the file backing `key`.
    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.cache_dir.join(format!("{}.csv", key.file_stem()))
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.path_for(key).exists()
    }
}

impl CandleStore for CsvCandleStore {
    fn get(&self, key: &CacheKey) -> Result<Option<DataFrame>, DataError> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        read_candle_csv(&path).map(Some)
    }

    fn put(&self, key: &CacheKey, table: &DataFrame) -> Result<(), DataError> {
        if table.height() == 0 {
            return Ok(());
        }

        fs::create_dir_all(&self.cache_dir)
            .map_err(|e| DataError::CacheError(format!("failed to create dir: {e}")))?;

        let mut stored = to_storage(table)?;
        let path = self.path_for(key);
        let tmp_path = path.with_extension("csv.tmp");

        write_csv(&mut stored, &tmp_path)?;

        fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            DataError::CacheError(format!("atomic rename failed: {e}"))
        })?;

        tracing::debug!(path = %path.display(), rows = table.height(), "cached candle range");
        Ok(())
    }
}

/// In-process store; nothing survives the process.
#[derive(Default)]
pub struct MemoryCandleStore {
    entries: Mutex<HashMap<CacheKey, DataFrame>>,
}

impl MemoryCandleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CandleStore for MemoryCandleStore {
    fn get(&self, key: &CacheKey) -> Result<Option<DataFrame>, DataError> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| DataError::CacheError("memory store lock poisoned".into()))?;
        Ok(entries.get(key).cloned())
    }

    fn put(&self, key: &CacheKey, table: &DataFrame) -> Result<(), DataError> {
        if table.height() == 0 {
            return Ok(());
        }
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| DataError::CacheError("memory store lock poisoned".into()))?;
        entries.insert(key.clone(), table.clone());
        Ok(())
    }
}

// ── CSV I/O helpers ─────────────────────────────────────────────────

/// Canonical column order with timestamps as epoch milliseconds.
fn to_storage(table: &DataFrame) -> Result<DataFrame, DataError> {
    let casts: Vec<Expr> = TIME_COLUMNS
        .iter()
        .map(|name| col(*name).cast(DataType::Int64))
        .collect();
    table
        .select(COLUMNS)?
        .lazy()
        .with_columns(casts)
        .collect()
        .map_err(|e| DataError::CacheError(format!("storage conversion: {e}")))
}

fn io_error(action: &str, e: std::io::Error) -> DataError {
    DataError::CacheError(format!("{action}: {e}"))
}

fn write_csv(df: &mut DataFrame, path: &Path) -> Result<(), DataError> {
    let mut file = fs::File::create(path).map_err(|e| io_error("create file", e))?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(df)
        .map_err(|e| DataError::CacheError(format!("write csv: {e}")))
}

/// Read a cache file back into the canonical schema.
fn read_candle_csv(path: &Path) -> Result<DataFrame, DataError> {
    let map_err = |e: PolarsError| DataError::CacheError(format!("read {}: {e}", path.display()));

    let raw = CsvReadOptions::default()
        .with_has_header(true)
        .with_schema(Some(Arc::new(CandleSchema::storage_schema())))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .map_err(map_err)?
        .finish()
        .map_err(map_err)?;

    let casts: Vec<Expr> = TIME_COLUMNS
        .iter()
        .map(|name| col(*name).cast(CandleSchema::time_dtype()))
        .collect();
    raw.lazy().with_columns(casts).collect().map_err(map_err)
}
