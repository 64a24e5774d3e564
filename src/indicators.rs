//! Rolling technical-indicator engine
//!
//! Maintains the full price/high/low history plus derived series for RSI,
//! ATR, ADX and Bollinger Bands. The short/long moving-average windows are
//! the only bounded structures; every other series is append-only.

use serde::{Deserialize, Serialize};

use crate::config::BotConfig;
use crate::types::PriceSample;

/// Indicator periods lifted out of the full config
#[derive(Debug, Clone, Copy)]
pub struct IndicatorPeriods {
    pub short_ma: usize,
    pub long_ma: usize,
    pub rsi: usize,
    pub atr: usize,
    pub adx: usize,
    pub bollinger: usize,
    pub bollinger_stddev: f64,
}

impl From<&BotConfig> for IndicatorPeriods {
    fn from(config: &BotConfig) -> Self {
        IndicatorPeriods {
            short_ma: config.short_ma_period,
            long_ma: config.long_ma_period,
            rsi: config.rsi_period,
            atr: config.atr_period,
            adx: config.adx_period,
            bollinger: config.bollinger_period,
            bollinger_stddev: config.bollinger_stddev,
        }
    }
}

impl IndicatorPeriods {
    /// Longest period; nothing derived is produced before this much history
    pub fn max_period(&self) -> usize {
        [
            self.short_ma,
            self.long_ma,
            self.rsi,
            self.atr,
            self.adx,
            self.bollinger,
        ]
        .into_iter()
        .max()
        .unwrap_or(1)
    }
}

/// Non-owning view of the latest indicator values.
///
/// Every field is `None` until enough history exists; consumers gate on
/// presence rather than sentinels.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndicatorSnapshot {
    pub latest_price: Option<f64>,
    pub short_ma: Option<f64>,
    pub long_ma: Option<f64>,
    pub rsi: Option<f64>,
    pub atr: Option<f64>,
    pub adx: Option<f64>,
    pub upper_band: Option<f64>,
    pub lower_band: Option<f64>,
}

/// The persisted indicator histories.
///
/// Bollinger bands are recomputed every cycle from the price history, so they
/// are deliberately excluded from serialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndicatorState {
    pub prices: Vec<f64>,
    pub highs: Vec<f64>,
    pub lows: Vec<f64>,
    pub short_window: Vec<f64>,
    pub long_window: Vec<f64>,
    pub rsi_values: Vec<f64>,
    pub atr_values: Vec<f64>,
    pub adx_values: Vec<f64>,
    #[serde(skip)]
    pub upper_band: Option<f64>,
    #[serde(skip)]
    pub lower_band: Option<f64>,
}

impl IndicatorState {
    /// Record one sample and, once warmed up, extend the derived series.
    pub fn advance(&mut self, sample: PriceSample, periods: &IndicatorPeriods) {
        self.record_sample(sample, periods);
        if self.warmed_up(periods) {
            self.update_derived(periods);
        }
    }

    /// Append the raw sample and maintain the bounded MA windows
    pub fn record_sample(&mut self, sample: PriceSample, periods: &IndicatorPeriods) {
        self.prices.push(sample.price);
        self.highs.push(sample.high);
        self.lows.push(sample.low);
        push_window(&mut self.short_window, periods.short_ma, sample.price);
        push_window(&mut self.long_window, periods.long_ma, sample.price);
    }

    /// True once the history covers the largest configured period
    pub fn warmed_up(&self, periods: &IndicatorPeriods) -> bool {
        self.prices.len() >= periods.max_period()
    }

    fn update_derived(&mut self, periods: &IndicatorPeriods) {
        self.update_rsi(periods.rsi);
        self.update_atr(periods.atr);
        self.update_adx(periods.adx);
        self.update_bollinger(periods.bollinger, periods.bollinger_stddev);
    }

    fn update_rsi(&mut self, period: usize) {
        if self.prices.len() <= period {
            return;
        }
        let (gains, losses) = gains_losses(&self.prices);
        let avg_gain = gains.iter().sum::<f64>() / period as f64;
        let avg_loss = losses.iter().sum::<f64>() / period as f64;
        // RS pinned to 100 when there are no losses; keeps the division
        // defined and biases RSI toward 100
        let rs = if avg_loss == 0.0 {
            100.0
        } else {
            avg_gain / avg_loss
        };
        self.rsi_values.push(100.0 - 100.0 / (1.0 + rs));
    }

    fn update_atr(&mut self, period: usize) {
        if self.highs.len() <= period {
            return;
        }
        let tr = true_range(&self.highs, &self.lows, &self.prices);
        self.atr_values.push(tr.iter().sum::<f64>() / period as f64);
    }

    fn update_adx(&mut self, period: usize) {
        if self.highs.len() <= period {
            return;
        }
        let tr = true_range(&self.highs, &self.lows, &self.prices);
        let (plus_dm, minus_dm) = directional_movement(&self.highs, &self.lows);

        let mut dx = Vec::with_capacity(tr.len());
        for i in 0..tr.len() {
            if tr[i] == 0.0 {
                continue;
            }
            let plus_di = 100.0 * (plus_dm[i] / tr[i]);
            let minus_di = 100.0 * (minus_dm[i] / tr[i]);
            let di_sum = plus_di + minus_di;
            if di_sum == 0.0 {
                continue;
            }
            dx.push(100.0 * (plus_di - minus_di).abs() / di_sum);
        }
        self.adx_values.push(dx.iter().sum::<f64>() / period as f64);
    }

    fn update_bollinger(&mut self, period: usize, stddev_multiplier: f64) {
        if self.prices.len() < period {
            return;
        }
        let window = &self.prices[self.prices.len() - period..];
        let ma = window.iter().sum::<f64>() / period as f64;
        let variance =
            window.iter().map(|p| (p - ma) * (p - ma)).sum::<f64>() / period as f64;
        let stddev = variance.sqrt();
        self.upper_band = Some(ma + stddev_multiplier * stddev);
        self.lower_band = Some(ma - stddev_multiplier * stddev);
    }

    /// Latest values across all indicators
    pub fn snapshot(&self) -> IndicatorSnapshot {
        IndicatorSnapshot {
            latest_price: self.prices.last().copied(),
            short_ma: mean(&self.short_window),
            long_ma: mean(&self.long_window),
            rsi: self.rsi_values.last().copied(),
            atr: self.atr_values.last().copied(),
            adx: self.adx_values.last().copied(),
            upper_band: self.upper_band,
            lower_band: self.lower_band,
        }
    }
}

/// Arithmetic mean; `None` for an empty slice
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn push_window(window: &mut Vec<f64>, period: usize, price: f64) {
    window.push(price);
    if window.len() > period {
        window.remove(0);
    }
}

/// Per-step positive/negative price deltas over the whole history
fn gains_losses(prices: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let mut gains = Vec::new();
    let mut losses = Vec::new();
    for pair in prices.windows(2) {
        let change = pair[1] - pair[0];
        gains.push(change.max(0.0));
        losses.push((-change).max(0.0));
    }
    (gains, losses)
}

/// True range per step: max(high-low, |high-prev_close|, |low-prev_close|)
fn true_range(highs: &[f64], lows: &[f64], closes: &[f64]) -> Vec<f64> {
    let mut tr = Vec::new();
    for i in 1..highs.len() {
        let hl = highs[i] - lows[i];
        let hc = (highs[i] - closes[i - 1]).abs();
        let lc = (lows[i] - closes[i - 1]).abs();
        tr.push(hl.max(hc).max(lc));
    }
    tr
}

/// +DM/-DM per step using the larger-of-two-moves rule, negatives clamped
fn directional_movement(highs: &[f64], lows: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let mut plus_dm = Vec::new();
    let mut minus_dm = Vec::new();
    for i in 1..highs.len() {
        let up_move = highs[i] - highs[i - 1];
        let down_move = lows[i - 1] - lows[i];
        plus_dm.push(if up_move > down_move {
            up_move.max(0.0)
        } else {
            0.0
        });
        minus_dm.push(if down_move > up_move {
            down_move.max(0.0)
        } else {
            0.0
        });
    }
    (plus_dm, minus_dm)
}
