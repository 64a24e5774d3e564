//! Market regime classification
//!
//! Pure function of the latest indicator snapshot, evaluated every cycle in a
//! fixed priority order: a strong ADX wins over a narrow Bollinger channel.

use crate::indicators::IndicatorSnapshot;
use crate::types::MarketRegime;

/// ADX level above which the market counts as trending
pub const ADX_TREND_THRESHOLD: f64 = 25.0;

/// Band width relative to price below which the market counts as quiet
pub const LOW_VOLATILITY_RATIO: f64 = 0.03;

/// Classify the current market condition
pub fn classify(snapshot: &IndicatorSnapshot) -> MarketRegime {
    if let Some(adx) = snapshot.adx {
        if adx > ADX_TREND_THRESHOLD {
            return MarketRegime::Trending;
        }
    }

    if let (Some(upper), Some(lower), Some(price)) = (
        snapshot.upper_band,
        snapshot.lower_band,
        snapshot.latest_price,
    ) {
        if (upper - lower) / price < LOW_VOLATILITY_RATIO {
            return MarketRegime::LowVolatility;
        }
    }

    MarketRegime::Ranging
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> IndicatorSnapshot {
        IndicatorSnapshot {
            latest_price: Some(100.0),
            ..Default::default()
        }
    }

    #[test]
    fn strong_adx_is_trending() {
        let mut snap = snapshot();
        snap.adx = Some(30.0);
        assert_eq!(classify(&snap), MarketRegime::Trending);
    }

    #[test]
    fn adx_wins_over_narrow_bands() {
        // both conditions hold; Trending is checked first
        let mut snap = snapshot();
        snap.adx = Some(40.0);
        snap.upper_band = Some(100.5);
        snap.lower_band = Some(99.5);
        assert_eq!(classify(&snap), MarketRegime::Trending);
    }

    #[test]
    fn narrow_bands_are_low_volatility() {
        let mut snap = snapshot();
        snap.adx = Some(10.0);
        snap.upper_band = Some(101.0);
        snap.lower_band = Some(99.0);
        assert_eq!(classify(&snap), MarketRegime::LowVolatility);
    }

    #[test]
    fn wide_bands_are_ranging() {
        let mut snap = snapshot();
        snap.adx = Some(10.0);
        snap.upper_band = Some(110.0);
        snap.lower_band = Some(90.0);
        assert_eq!(classify(&snap), MarketRegime::Ranging);
    }

    #[test]
    fn missing_indicators_fall_back_to_ranging() {
        assert_eq!(classify(&IndicatorSnapshot::default()), MarketRegime::Ranging);
    }

    #[test]
    fn adx_at_threshold_is_not_trending() {
        let mut snap = snapshot();
        snap.adx = Some(25.0);
        snap.upper_band = Some(110.0);
        snap.lower_band = Some(90.0);
        assert_eq!(classify(&snap), MarketRegime::Ranging);
    }
}
