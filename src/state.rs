//! Account state persistence
//!
//! The full account state is one JSON document: balance, signed position,
//! trade log and every indicator history. It is loaded once at startup and
//! overwritten wholesale after every realtime cycle and on interrupt.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::indicators::IndicatorState;
use crate::types::Trade;

/// Everything the bot needs to resume after a restart
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountState {
    pub balance: f64,
    /// Signed position: positive = net long, negative = net short
    pub position: f64,
    pub trades: Vec<Trade>,
    pub indicators: IndicatorState,
}

impl AccountState {
    /// Fresh state with empty histories
    pub fn fresh(balance: f64) -> Self {
        AccountState {
            balance,
            position: 0.0,
            trades: Vec::new(),
            indicators: IndicatorState::default(),
        }
    }

    /// Restore persisted state; a missing file is not an error, just a signal
    /// to start fresh.
    pub fn load(path: impl AsRef<Path>) -> Result<Option<Self>> {
        let path = path.as_ref();
        if !path.exists() {
            info!("No previous state found at {}", path.display());
            return Ok(None);
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read state file: {}", path.display()))?;
        let state: AccountState =
            serde_json::from_str(&contents).context("Failed to parse state file")?;
        info!(
            "Loaded previous state: balance={:.2}, position={:.6}, {} trades",
            state.balance,
            state.position,
            state.trades.len()
        );
        Ok(Some(state))
    }

    /// Persist the state atomically: write a sibling temp file, then rename,
    /// so an interrupt can never leave a truncated document behind.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let serialized = serde_json::to_string_pretty(self)?;
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, serialized)
            .with_context(|| format!("Failed to write state file: {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path)
            .with_context(|| format!("Failed to replace state file: {}", path.display()))?;

        debug!("Saved state to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BotConfig;
    use crate::indicators::IndicatorPeriods;
    use crate::types::{PriceSample, Side};
    use chrono::Utc;

    fn periods() -> IndicatorPeriods {
        let config = BotConfig {
            short_ma_period: 2,
            long_ma_period: 3,
            rsi_period: 3,
            atr_period: 3,
            adx_period: 3,
            bollinger_period: 3,
            bollinger_stddev: 2.0,
            position_scale: 1.0,
            sleep_interval: 1,
            kraken: None,
            bitmex: None,
        };
        IndicatorPeriods::from(&config)
    }

    fn populated_state() -> AccountState {
        let mut state = AccountState::fresh(10_000.0);
        let periods = periods();
        for price in [100.0, 102.0, 101.0, 105.0, 98.0] {
            state
                .indicators
                .advance(PriceSample::from_price(price), &periods);
        }
        state.position = 1.5;
        state.balance = 9_500.0;
        state.trades.push(Trade {
            side: Side::Buy,
            size: 1.5,
            price: 101.0,
            timestamp: Utc::now(),
        });
        state
    }

    #[test]
    fn missing_file_starts_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent_state.json");
        assert!(AccountState::load(&path).unwrap().is_none());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bot_state.json");

        let state = populated_state();
        state.save(&path).unwrap();
        let restored = AccountState::load(&path).unwrap().unwrap();

        assert_eq!(restored.balance, state.balance);
        assert_eq!(restored.position, state.position);
        assert_eq!(restored.trades.len(), state.trades.len());
        assert_eq!(restored.trades[0].side, Side::Buy);
        assert_eq!(restored.indicators.prices, state.indicators.prices);
        assert_eq!(restored.indicators.highs, state.indicators.highs);
        assert_eq!(restored.indicators.lows, state.indicators.lows);
        assert_eq!(
            restored.indicators.short_window,
            state.indicators.short_window
        );
        assert_eq!(restored.indicators.long_window, state.indicators.long_window);
        assert_eq!(restored.indicators.rsi_values, state.indicators.rsi_values);
        assert_eq!(restored.indicators.atr_values, state.indicators.atr_values);
        assert_eq!(restored.indicators.adx_values, state.indicators.adx_values);
    }

    #[test]
    fn save_overwrites_previous_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bot_state.json");

        let mut state = populated_state();
        state.save(&path).unwrap();
        state.balance = 4_321.0;
        state.save(&path).unwrap();

        let restored = AccountState::load(&path).unwrap().unwrap();
        assert_eq!(restored.balance, 4_321.0);
    }

    #[test]
    fn bands_are_not_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bot_state.json");

        let state = populated_state();
        assert!(state.indicators.upper_band.is_some());
        state.save(&path).unwrap();

        // recomputed next cycle rather than restored
        let restored = AccountState::load(&path).unwrap().unwrap();
        assert!(restored.indicators.upper_band.is_none());
    }
}
