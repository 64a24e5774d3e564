//! Configuration management
//!
//! Handles loading and parsing of the JSON configuration file with environment
//! variable support for API credentials.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::exchange::ExchangeKind;

/// Configuration validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be >= 1 (got {value})")]
    InvalidPeriod { name: &'static str, value: usize },

    #[error("no configuration section for exchange '{0}'")]
    MissingVenue(ExchangeKind),
}

/// Immutable bot configuration, loaded once at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    pub short_ma_period: usize,
    pub long_ma_period: usize,
    pub rsi_period: usize,
    pub atr_period: usize,
    pub adx_period: usize,
    pub bollinger_period: usize,
    pub bollinger_stddev: f64,
    pub position_scale: f64,
    /// Seconds to sleep between realtime cycles
    pub sleep_interval: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kraken: Option<VenueConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bitmex: Option<VenueConfig>,
}

/// Per-venue credentials and trading symbol
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VenueConfig {
    pub symbol: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub api_secret: String,
}

impl BotConfig {
    /// Load configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let mut config: BotConfig =
            serde_json::from_str(&contents).context("Failed to parse config JSON")?;

        // Credentials from environment take precedence over the file
        if let Some(kraken) = config.kraken.as_mut() {
            if let Ok(key) = std::env::var("KRAKEN_API_KEY") {
                kraken.api_key = key;
            }
            if let Ok(secret) = std::env::var("KRAKEN_API_SECRET") {
                kraken.api_secret = secret;
            }
        }
        if let Some(bitmex) = config.bitmex.as_mut() {
            if let Ok(key) = std::env::var("BITMEX_API_KEY") {
                bitmex.api_key = key;
            }
            if let Ok(secret) = std::env::var("BITMEX_API_SECRET") {
                bitmex.api_secret = secret;
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Check the invariants the rest of the system relies on
    pub fn validate(&self) -> Result<(), ConfigError> {
        let periods = [
            ("short_ma_period", self.short_ma_period),
            ("long_ma_period", self.long_ma_period),
            ("rsi_period", self.rsi_period),
            ("atr_period", self.atr_period),
            ("adx_period", self.adx_period),
            ("bollinger_period", self.bollinger_period),
        ];
        for (name, value) in periods {
            if value < 1 {
                return Err(ConfigError::InvalidPeriod { name, value });
            }
        }
        Ok(())
    }

    /// Select the venue section for the chosen exchange
    pub fn venue(&self, exchange: ExchangeKind) -> Result<&VenueConfig, ConfigError> {
        let venue = match exchange {
            ExchangeKind::Kraken => self.kraken.as_ref(),
            ExchangeKind::Bitmex => self.bitmex.as_ref(),
        };
        venue.ok_or(ConfigError::MissingVenue(exchange))
    }

    /// Longest configured indicator period; warm-up gate for trading
    pub fn max_period(&self) -> usize {
        [
            self.short_ma_period,
            self.long_ma_period,
            self.rsi_period,
            self.atr_period,
            self.adx_period,
            self.bollinger_period,
        ]
        .into_iter()
        .max()
        .unwrap_or(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> BotConfig {
        BotConfig {
            short_ma_period: 2,
            long_ma_period: 3,
            rsi_period: 3,
            atr_period: 3,
            adx_period: 3,
            bollinger_period: 3,
            bollinger_stddev: 2.0,
            position_scale: 1.0,
            sleep_interval: 60,
            kraken: Some(VenueConfig {
                symbol: "XBTUSD".to_string(),
                api_key: "key".to_string(),
                api_secret: "secret".to_string(),
            }),
            bitmex: None,
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn zero_period_rejected() {
        let mut config = sample();
        config.rsi_period = 0;
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidPeriod {
                name: "rsi_period",
                ..
            }
        ));
    }

    #[test]
    fn missing_venue_rejected() {
        let config = sample();
        assert!(config.venue(ExchangeKind::Kraken).is_ok());
        assert!(matches!(
            config.venue(ExchangeKind::Bitmex),
            Err(ConfigError::MissingVenue(ExchangeKind::Bitmex))
        ));
    }

    #[test]
    fn max_period_is_largest() {
        let mut config = sample();
        config.adx_period = 14;
        assert_eq!(config.max_period(), 14);
    }

    #[test]
    fn parses_json_config() {
        let json = r#"{
            "short_ma_period": 5,
            "long_ma_period": 20,
            "rsi_period": 14,
            "atr_period": 14,
            "adx_period": 14,
            "bollinger_period": 20,
            "bollinger_stddev": 2.0,
            "position_scale": 1.0,
            "sleep_interval": 60,
            "kraken": { "symbol": "XBTUSD", "api_key": "k", "api_secret": "s" }
        }"#;
        let config: BotConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.long_ma_period, 20);
        assert_eq!(config.venue(ExchangeKind::Kraken).unwrap().symbol, "XBTUSD");
    }
}
