//! Regime-conditioned trade decisions and position sizing
//!
//! One entry rule per regime, all sharing the same position cap from
//! `position_size`. A decision is only a suggestion; execution applies the
//! balance check and places or simulates the order.

use tracing::debug;

use crate::indicators::IndicatorSnapshot;
use crate::regime::ADX_TREND_THRESHOLD;
use crate::types::{MarketRegime, Side};

/// Largest fraction of the balance a single position may tie up
const MAX_BALANCE_FRACTION: f64 = 0.10;

/// Largest fraction of the balance a single trade may move, in asset units
const MAX_TRADE_FRACTION: f64 = 0.20;

/// Floor applied to the momentum term when sizing
const MOMENTUM_FLOOR: f64 = 0.1;

/// Pick a trade for the current regime, or `None` to stay put.
///
/// No action is taken with a depleted balance, and each direction is gated on
/// the signed position staying inside the computed cap.
pub fn decide(
    regime: MarketRegime,
    snapshot: &IndicatorSnapshot,
    position: f64,
    balance: f64,
) -> Option<Side> {
    if balance <= 0.0 {
        return None;
    }

    let cap = position_size(snapshot, balance);

    match regime {
        MarketRegime::Trending => {
            let short_ma = snapshot.short_ma?;
            let long_ma = snapshot.long_ma?;
            let adx = snapshot.adx?;
            if short_ma > long_ma && adx > ADX_TREND_THRESHOLD && position < cap {
                Some(Side::Buy)
            } else if short_ma < long_ma && adx > ADX_TREND_THRESHOLD && position > -cap {
                Some(Side::Sell)
            } else {
                None
            }
        }
        // mean reversion: fade moves beyond the bands
        MarketRegime::Ranging => {
            let price = snapshot.latest_price?;
            let upper = snapshot.upper_band?;
            let lower = snapshot.lower_band?;
            if price < lower && position < cap {
                Some(Side::Buy)
            } else if price > upper && position > -cap {
                Some(Side::Sell)
            } else {
                None
            }
        }
        // breakout: follow moves out of a compressed channel
        MarketRegime::LowVolatility => {
            let price = snapshot.latest_price?;
            let upper = snapshot.upper_band?;
            let lower = snapshot.lower_band?;
            if price > upper && position < cap {
                Some(Side::Buy)
            } else if price < lower && position > -cap {
                Some(Side::Sell)
            } else {
                None
            }
        }
        MarketRegime::Unknown => None,
    }
}

/// Deterministic position size from volatility and momentum.
///
/// Returns 0 while price or ATR is still warming up. Two successive caps are
/// applied: 10% of the balance, then 20% of the balance converted to asset
/// units at the latest price; the smaller always wins.
pub fn position_size(snapshot: &IndicatorSnapshot, balance: f64) -> f64 {
    let (Some(price), Some(atr)) = (snapshot.latest_price, snapshot.atr) else {
        return 0.0;
    };
    let (Some(short_ma), Some(long_ma)) = (snapshot.short_ma, snapshot.long_ma) else {
        return 0.0;
    };

    let volatility = atr / price;
    let momentum = (short_ma - long_ma) / long_ma;

    let volatility_based = balance * (1.0 / volatility);
    let momentum_based = balance * momentum.max(MOMENTUM_FLOOR);
    let combined = (volatility_based + momentum_based) / 2.0;

    debug!(
        volatility,
        momentum, combined, "calculated raw position size"
    );

    let capped = combined.min(balance * MAX_BALANCE_FRACTION);
    capped.min(balance * MAX_TRADE_FRACTION / price)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> IndicatorSnapshot {
        IndicatorSnapshot {
            latest_price: Some(100.0),
            short_ma: Some(102.0),
            long_ma: Some(100.0),
            rsi: Some(55.0),
            atr: Some(2.0),
            adx: Some(30.0),
            upper_band: Some(110.0),
            lower_band: Some(90.0),
        }
    }

    #[test]
    fn size_respects_both_caps() {
        let snap = snapshot();
        let balance = 10_000.0;
        let size = position_size(&snap, balance);

        let balance_cap = balance * 0.10;
        let trade_cap = balance * 0.20 / 100.0;
        assert!(size <= balance_cap.min(trade_cap));
        assert!(size >= 0.0);
    }

    #[test]
    fn size_zero_during_warm_up() {
        let mut snap = snapshot();
        snap.atr = None;
        assert_eq!(position_size(&snap, 10_000.0), 0.0);

        let mut snap = snapshot();
        snap.latest_price = None;
        assert_eq!(position_size(&snap, 10_000.0), 0.0);
    }

    #[test]
    fn zero_volatility_hits_the_cap() {
        let mut snap = snapshot();
        snap.atr = Some(0.0);
        let size = position_size(&snap, 10_000.0);
        // 1/volatility diverges; the smaller cap still wins
        assert_eq!(size, (10_000.0 * 0.10f64).min(10_000.0 * 0.20 / 100.0));
    }

    #[test]
    fn no_decision_with_depleted_balance() {
        let snap = snapshot();
        assert_eq!(decide(MarketRegime::Trending, &snap, 0.0, 0.0), None);
        assert_eq!(decide(MarketRegime::Trending, &snap, 0.0, -5.0), None);
    }

    #[test]
    fn trending_buys_on_bullish_cross() {
        let snap = snapshot();
        assert_eq!(
            decide(MarketRegime::Trending, &snap, 0.0, 10_000.0),
            Some(Side::Buy)
        );
    }

    #[test]
    fn trending_sells_on_bearish_cross() {
        let mut snap = snapshot();
        snap.short_ma = Some(98.0);
        assert_eq!(
            decide(MarketRegime::Trending, &snap, 0.0, 10_000.0),
            Some(Side::Sell)
        );
    }

    #[test]
    fn trending_requires_strong_adx() {
        let mut snap = snapshot();
        snap.adx = Some(20.0);
        assert_eq!(decide(MarketRegime::Trending, &snap, 0.0, 10_000.0), None);
    }

    #[test]
    fn trending_respects_position_cap() {
        let snap = snapshot();
        let cap = position_size(&snap, 10_000.0);
        assert_eq!(decide(MarketRegime::Trending, &snap, cap, 10_000.0), None);
    }

    #[test]
    fn ranging_fades_the_bands() {
        let mut snap = snapshot();
        snap.latest_price = Some(85.0);
        assert_eq!(
            decide(MarketRegime::Ranging, &snap, 0.0, 10_000.0),
            Some(Side::Buy)
        );

        snap.latest_price = Some(115.0);
        assert_eq!(
            decide(MarketRegime::Ranging, &snap, 0.0, 10_000.0),
            Some(Side::Sell)
        );
    }

    #[test]
    fn low_volatility_follows_breakouts() {
        let mut snap = snapshot();
        snap.latest_price = Some(115.0);
        assert_eq!(
            decide(MarketRegime::LowVolatility, &snap, 0.0, 10_000.0),
            Some(Side::Buy)
        );

        snap.latest_price = Some(85.0);
        assert_eq!(
            decide(MarketRegime::LowVolatility, &snap, 0.0, 10_000.0),
            Some(Side::Sell)
        );
    }

    #[test]
    fn unknown_regime_never_trades() {
        let snap = snapshot();
        assert_eq!(decide(MarketRegime::Unknown, &snap, 0.0, 10_000.0), None);
    }
}
