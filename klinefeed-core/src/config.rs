//! Process settings: which exchange to use and where to cache.
//!
//! Settings come from an optional TOML file; the `KLINEFEED_EXCHANGE`
//! environment variable overrides the exchange name. Every field has a
//! default, so an empty file (or none at all) is valid.

use crate::data::{binance, okx, DataError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "klinefeed.toml";

/// Environment variable overriding [`Settings::exchange`].
pub const EXCHANGE_ENV: &str = "KLINEFEED_EXCHANGE";

/// Supported exchange backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exchange {
    Okx,
    Binance,
}

impl Exchange {
    /// Case-insensitive: `"okx"` selects OKX, any other name selects Binance.
    pub fn from_name(name: &str) -> Self {
        if name.trim().eq_ignore_ascii_case("okx") {
            Exchange::Okx
        } else {
            Exchange::Binance
        }
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Exchange::Okx => f.write_str("okx"),
            Exchange::Binance => f.write_str("binance"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OkxSettings {
    pub base_url: String,
    pub page_size: usize,
}

impl Default for OkxSettings {
    fn default() -> Self {
        Self {
            base_url: okx::DEFAULT_BASE_URL.into(),
            page_size: okx::HISTORY_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BinanceSettings {
    pub base_url: String,
    pub page_size: usize,
}

impl Default for BinanceSettings {
    fn default() -> Self {
        Self {
            base_url: binance::DEFAULT_BASE_URL.into(),
            page_size: binance::HISTORY_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Exchange name; see [`Exchange::from_name`].
    pub exchange: String,
    pub cache_dir: PathBuf,
    pub http_timeout_secs: u64,
    pub okx: OkxSettings,
    pub binance: BinanceSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            exchange: "binance".into(),
            cache_dir: PathBuf::from("./cache"),
            http_timeout_secs: 30,
            okx: OkxSettings::default(),
            binance: BinanceSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, DataError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| DataError::ConfigError(format!("read {}: {e}", path.display())))?;
        Self::from_toml(&content)
    }

    /// Parse settings from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, DataError> {
        toml::from_str(content)
            .map_err(|e| DataError::ConfigError(format!("parse settings TOML: {e}")))
    }

    /// Resolve settings for the process.
    ///
    /// An explicit path must exist. Without one, `klinefeed.toml` in the
    /// working directory is used if present, else the defaults. The
    /// environment override is applied last.
    pub fn load(path: Option<&Path>) -> Result<Self, DataError> {
        let settings = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    Self::default()
                }
            }
        };
        Ok(settings.with_exchange_override(std::env::var(EXCHANGE_ENV).ok()))
    }

    /// Replace the exchange name when an override is present and non-blank.
    pub fn with_exchange_override(mut self, exchange: Option<String>) -> Self {
        if let Some(name) = exchange.filter(|n| !n.trim().is_empty()) {
            self.exchange = name;
        }
        self
    }

    pub fn exchange(&self) -> Exchange {
        Exchange::from_name(&self.exchange)
    }

    /// Serialize the settings to TOML.
    pub fn to_toml(&self) -> Result<String, DataError> {
        toml::to_string_pretty(self)
            .map_err(|e| DataError::ConfigError(format!("serialize settings: {e}")))
    }
}
