//! Canonical timeframe tokens and their exchange bar codes.
//!
//! Tokens follow the lowercase-unit convention (`1m`, `4h`, `1d`) with the one
//! exception of `1M` (calendar month, approximated as 30 days).

use crate::data::provider::DataError;
use std::fmt;
use std::str::FromStr;

const MINUTE_MS: i64 = 60_000;
const HOUR_MS: i64 = 60 * MINUTE_MS;
const DAY_MS: i64 = 24 * HOUR_MS;

/// Duration used for tokens outside the supported table.
pub const FALLBACK_DURATION_MS: i64 = MINUTE_MS;

/// A supported candle timeframe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timeframe {
    M1,
    M3,
    M5,
    M15,
    M30,
    H1,
    H2,
    H4,
    H6,
    H12,
    D1,
    W1,
    Mo1,
}

impl Timeframe {
    pub const ALL: [Timeframe; 13] = [
        Timeframe::M1,
        Timeframe::M3,
        Timeframe::M5,
        Timeframe::M15,
        Timeframe::M30,
        Timeframe::H1,
        Timeframe::H2,
        Timeframe::H4,
        Timeframe::H6,
        Timeframe::H12,
        Timeframe::D1,
        Timeframe::W1,
        Timeframe::Mo1,
    ];

    /// Canonical token, e.g. `"4h"`.
    pub fn token(self) -> &'static str {
        match self {
            Timeframe::M1 => "1m",
            Timeframe::M3 => "3m",
            Timeframe::M5 => "5m",
            Timeframe::M15 => "15m",
            Timeframe::M30 => "30m",
            Timeframe::H1 => "1h",
            Timeframe::H2 => "2h",
            Timeframe::H4 => "4h",
            Timeframe::H6 => "6h",
            Timeframe::H12 => "12h",
            Timeframe::D1 => "1d",
            Timeframe::W1 => "1w",
            Timeframe::Mo1 => "1M",
        }
    }

    /// OKX `bar` parameter. Hour and longer units are uppercase.
    pub fn okx_bar(self) -> &'static str {
        match self {
            Timeframe::M1 => "1m",
            Timeframe::M3 => "3m",
            Timeframe::M5 => "5m",
            Timeframe::M15 => "15m",
            Timeframe::M30 => "30m",
            Timeframe::H1 => "1H",
            Timeframe::H2 => "2H",
            Timeframe::H4 => "4H",
            Timeframe::H6 => "6H",
            Timeframe::H12 => "12H",
            Timeframe::D1 => "1D",
            Timeframe::W1 => "1W",
            Timeframe::Mo1 => "1M",
        }
    }

    /// Binance `interval` parameter (same spelling as the canonical token).
    pub fn binance_interval(self) -> &'static str {
        self.token()
    }

    pub fn duration_ms(self) -> i64 {
        match self {
            Timeframe::M1 => MINUTE_MS,
            Timeframe::M3 => 3 * MINUTE_MS,
            Timeframe::M5 => 5 * MINUTE_MS,
            Timeframe::M15 => 15 * MINUTE_MS,
            Timeframe::M30 => 30 * MINUTE_MS,
            Timeframe::H1 => HOUR_MS,
            Timeframe::H2 => 2 * HOUR_MS,
            Timeframe::H4 => 4 * HOUR_MS,
            Timeframe::H6 => 6 * HOUR_MS,
            Timeframe::H12 => 12 * HOUR_MS,
            Timeframe::D1 => DAY_MS,
            Timeframe::W1 => 7 * DAY_MS,
            Timeframe::Mo1 => 30 * DAY_MS,
        }
    }

    /// Lookup without error; `None` for unsupported tokens.
    pub fn lookup(token: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|tf| tf.token() == token)
    }
}

impl FromStr for Timeframe {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::lookup(s).ok_or_else(|| DataError::UnknownTimeframe(s.to_string()))
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// OKX bar code for a token. Unknown tokens pass through unchanged.
pub fn bar_code(token: &str) -> String {
    match Timeframe::lookup(token) {
        Some(tf) => tf.okx_bar().to_string(),
        None => {
            tracing::warn!(token, "unknown timeframe, passing token through as bar code");
            token.to_string()
        }
    }
}

/// Candle duration for a token. Unknown tokens fall back to one minute.
pub fn duration_ms(token: &str) -> i64 {
    match Timeframe::lookup(token) {
        Some(tf) => tf.duration_ms(),
        None => {
            tracing::warn!(
                token,
                fallback_ms = FALLBACK_DURATION_MS,
                "unknown timeframe, assuming one-minute candles"
            );
            FALLBACK_DURATION_MS
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_supported_token_has_positive_duration() {
        for tf in Timeframe::ALL {
            assert!(duration_ms(tf.token()) > 0, "{tf} has no duration");
        }
    }

    #[test]
    fn okx_bar_codes_match_table() {
        let expected = [
            ("1m", "1m"),
            ("3m", "3m"),
            ("5m", "5m"),
            ("15m", "15m"),
            ("30m", "30m"),
            ("1h", "1H"),
            ("2h", "2H"),
            ("4h", "4H"),
            ("6h", "6H"),
            ("12h", "12H"),
            ("1d", "1D"),
            ("1w", "1W"),
            ("1M", "1M"),
        ];
        for (token, code) in expected {
            assert_eq!(bar_code(token), code);
        }
    }

    #[test]
    fn durations_match_table() {
        assert_eq!(duration_ms("1m"), 60_000);
        assert_eq!(duration_ms("15m"), 900_000);
        assert_eq!(duration_ms("1h"), 3_600_000);
        assert_eq!(duration_ms("12h"), 43_200_000);
        assert_eq!(duration_ms("1d"), 86_400_000);
        assert_eq!(duration_ms("1w"), 604_800_000);
        assert_eq!(duration_ms("1M"), 2_592_000_000);
    }

    #[test]
    fn month_and_minute_are_distinct() {
        assert_eq!(Timeframe::lookup("1M"), Some(Timeframe::Mo1));
        assert_eq!(Timeframe::lookup("1m"), Some(Timeframe::M1));
    }

    #[test]
    fn unknown_token_falls_back() {
        assert_eq!(bar_code("7h"), "7h");
        assert_eq!(duration_ms("7h"), FALLBACK_DURATION_MS);
    }

    #[test]
    fn strict_parse_rejects_unknown_token() {
        assert_eq!("4h".parse::<Timeframe>().unwrap(), Timeframe::H4);
        match "1H".parse::<Timeframe>() {
            Err(DataError::UnknownTimeframe(t)) => assert_eq!(t, "1H"),
            other => panic!("expected UnknownTimeframe, got {other:?}"),
        }
    }

    #[test]
    fn binance_interval_is_canonical_token() {
        for tf in Timeframe::ALL {
            assert_eq!(tf.binance_interval(), tf.token());
        }
    }
}
