//! Core data types used across the trading system

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One market observation per cycle.
///
/// Live ticker feeds carry no intrabar range, so `high` and `low` default to
/// the trade price; backtest data provides all three columns.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceSample {
    pub price: f64,
    pub high: f64,
    pub low: f64,
}

impl PriceSample {
    pub fn new(price: f64, high: f64, low: f64) -> Self {
        PriceSample { price, high, low }
    }

    /// Build a sample from a bare ticker price (high/low collapse to price).
    pub fn from_price(price: f64) -> Self {
        PriceSample {
            price,
            high: price,
            low: price,
        }
    }
}

/// Trade direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Executed trade record, append-only once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub side: Side,
    pub size: f64,
    pub price: f64,
    pub timestamp: DateTime<Utc>,
}

/// Market condition label produced by the regime classifier.
///
/// `Unknown` only exists before the first classification runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MarketRegime {
    Trending,
    Ranging,
    LowVolatility,
    #[default]
    Unknown,
}

impl std::fmt::Display for MarketRegime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            MarketRegime::Trending => "trending",
            MarketRegime::Ranging => "ranging",
            MarketRegime::LowVolatility => "low_volatility",
            MarketRegime::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_from_price_collapses_range() {
        let sample = PriceSample::from_price(101.5);
        assert_eq!(sample.high, 101.5);
        assert_eq!(sample.low, 101.5);
    }

    #[test]
    fn side_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Side::Buy).unwrap(), "\"buy\"");
        assert_eq!(serde_json::to_string(&Side::Sell).unwrap(), "\"sell\"");
    }

    #[test]
    fn regime_defaults_to_unknown() {
        assert_eq!(MarketRegime::default(), MarketRegime::Unknown);
    }
}
