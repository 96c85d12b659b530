//! klinefeed CLI: query OHLCV candles from OKX or Binance.
//!
//! Commands:
//! - `latest`: most recent N candles
//! - `before`: up to N candles opening before a given time
//! - `history`: a full date range, paginated and cached
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use klinefeed_core::{ExchangeDataProvider, Settings, Timeframe};
use polars::prelude::DataFrame;
use std::path::PathBuf;
use std::str::FromStr;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "klinefeed",
    about = "klinefeed CLI: OHLCV candles from OKX or Binance"
)]
struct Cli {
    /// Path to a TOML settings file. Defaults to ./klinefeed.toml if present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Exchange to query (okx or binance). Overrides the settings file.
    #[arg(long, global = true)]
    exchange: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Most recent candles.
    Latest {
        /// Symbol, e.g. BTC/USDT.
        symbol: String,

        /// Timeframe token: 1m 3m 5m 15m 30m 1h 2h 4h 6h 12h 1d 1w 1M.
        #[arg(long, short = 't', default_value = "1h")]
        timeframe: String,

        /// Number of candles.
        #[arg(long, default_value_t = 100)]
        limit: usize,
    },
    /// Candles opening before a given time.
    Before {
        symbol: String,

        #[arg(long, short = 't', default_value = "1h")]
        timeframe: String,

        /// End time (YYYY-MM-DD or RFC 3339), exclusive.
        #[arg(long)]
        end: String,

        #[arg(long, default_value_t = 100)]
        limit: usize,
    },
    /// Every candle in a date range.
    History {
        symbol: String,

        #[arg(long, short = 't', default_value = "1h")]
        timeframe: String,

        /// Start date (YYYY-MM-DD or RFC 3339). Defaults to 30 days ago.
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD or RFC 3339). Defaults to now.
        #[arg(long)]
        end: Option<String>,

        /// Skip the range cache for both reading and writing.
        #[arg(long, default_value_t = false)]
        no_cache: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let settings = Settings::load(cli.config.as_deref())?.with_exchange_override(cli.exchange);
    let provider = ExchangeDataProvider::from_settings(&settings)
        .with_context(|| format!("failed to set up {} provider", settings.exchange()))?;

    let table = match cli.command {
        Commands::Latest {
            symbol,
            timeframe,
            limit,
        } => {
            check_timeframe(&timeframe)?;
            provider.get_latest_data(&symbol, &timeframe, limit)
        }
        Commands::Before {
            symbol,
            timeframe,
            end,
            limit,
        } => {
            check_timeframe(&timeframe)?;
            let end_time = parse_time(&end)?;
            provider.get_history_klines_with_end_time(&symbol, &timeframe, end_time, limit)
        }
        Commands::History {
            symbol,
            timeframe,
            start,
            end,
            no_cache,
        } => {
            check_timeframe(&timeframe)?;
            let start = start.as_deref().map(parse_time).transpose()?;
            let end = end.as_deref().map(parse_time).transpose()?;
            if let (Some(s), Some(e)) = (start, end) {
                if s > e {
                    bail!("--start {s} is after --end {e}");
                }
            }
            provider.get_historical_klines(&symbol, &timeframe, start, end, !no_cache)
        }
    };

    print_table(provider.exchange(), &table);
    Ok(())
}

/// The library accepts unknown tokens leniently; the CLI rejects them up front.
fn check_timeframe(token: &str) -> Result<Timeframe> {
    Ok(Timeframe::from_str(token)?)
}

/// `YYYY-MM-DD` (midnight UTC) or a full RFC 3339 timestamp.
fn parse_time(s: &str) -> Result<DateTime<Utc>> {
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .with_context(|| format!("invalid time '{s}': expected YYYY-MM-DD or RFC 3339"))
}

fn print_table(exchange: &str, table: &DataFrame) {
    println!("{table}");
    println!("{} candles from {exchange}", table.height());
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_plain_dates_as_utc_midnight() {
        let t = parse_time("2024-01-01").unwrap();
        assert_eq!(t, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn parses_rfc3339_with_offset() {
        let t = parse_time("2024-01-01T02:00:00+02:00").unwrap();
        assert_eq!(t, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn rejects_garbage_time() {
        assert!(parse_time("last tuesday").is_err());
    }

    #[test]
    fn unknown_timeframe_is_rejected() {
        assert!(check_timeframe("7m").is_err());
        assert_eq!(check_timeframe("4h").unwrap(), Timeframe::H4);
    }

    #[test]
    fn cli_parses_history_flags() {
        let cli = Cli::try_parse_from([
            "klinefeed",
            "--exchange",
            "okx",
            "history",
            "BTC/USDT",
            "-t",
            "1d",
            "--start",
            "2024-01-01",
            "--no-cache",
        ])
        .unwrap();
        assert_eq!(cli.exchange.as_deref(), Some("okx"));
        match cli.command {
            Commands::History {
                symbol,
                timeframe,
                start,
                end,
                no_cache,
            } => {
                assert_eq!(symbol, "BTC/USDT");
                assert_eq!(timeframe, "1d");
                assert_eq!(start.as_deref(), Some("2024-01-01"));
                assert!(end.is_none());
                assert!(no_cache);
            }
            _ => panic!("expected history command"),
        }
    }
}
