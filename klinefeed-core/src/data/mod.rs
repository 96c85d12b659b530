//! Candle acquisition: exchange sources, normalization, pagination, caching

pub mod binance;
pub mod cache;
pub mod canonicalize;
pub mod normalize;
pub mod okx;
pub mod paginate;
pub mod provider;
pub mod schema;

pub use binance::BinanceSource;
pub use cache::{CacheKey, CandleStore, CsvCandleStore, MemoryCandleStore};
pub use canonicalize::Canonicalizer;
pub use normalize::{normalize, RawLayout};
pub use okx::OkxSource;
pub use paginate::{FetchOutcome, PaginatedFetcher, StopReason};
pub use provider::{CandleSource, DataError, HistoryQuery, Page, RawCandle};
pub use schema::{CandleSchema, SchemaError, COLUMNS};
