//! Concrete indicator implementations.
//!
//! Every indicator is a pure function of bar history implementing the
//! [`Indicator`] trait: bars in, conviction series out. Values are
//! directional conviction in [-1, 1] (positive = bullish); warm-up bars are
//! `f64::NAN` — the explicit "not yet available" marker, never coerced to
//! zero. Indicators never read each other's output.
//!
//! All indicators are precomputed once before the bar loop and fed per-bar
//! into the signal engine via [`IndicatorValues`].

pub mod adx;
pub mod atr;
pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod market_structure;
pub mod momentum;
pub mod rsi;
pub mod stochastic;
pub mod support_resistance;
pub mod volume;

pub use adx::Adx;
pub use atr::AtrGate;
pub use bollinger::Bollinger;
pub use ema::{PriceEma, TrendEma};
pub use macd::Macd;
pub use market_structure::MarketStructure;
pub use momentum::Momentum;
pub use rsi::Rsi;
pub use stochastic::Stochastic;
pub use support_resistance::SupportResistance;
pub use volume::{VolumeRatio, VolumeZscore};

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::IndicatorConfig;
use crate::domain::Bar;

/// Identifier for every indicator in the library.
///
/// The set is fixed at compile time; which indicators actually contribute to
/// the composite signal is decided by the per-indicator weights in the
/// parameter vector, not by runtime registration.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorId {
    Rsi,
    Stochastic,
    Adx,
    Momentum,
    TrendEma,
    PriceEma,
    Macd,
    MarketStructure,
    Bollinger,
    Atr,
    VolumeRatio,
    VolumeZscore,
    SupportResistance,
}

impl IndicatorId {
    pub const ALL: [IndicatorId; 13] = [
        IndicatorId::Rsi,
        IndicatorId::Stochastic,
        IndicatorId::Adx,
        IndicatorId::Momentum,
        IndicatorId::TrendEma,
        IndicatorId::PriceEma,
        IndicatorId::Macd,
        IndicatorId::MarketStructure,
        IndicatorId::Bollinger,
        IndicatorId::Atr,
        IndicatorId::VolumeRatio,
        IndicatorId::VolumeZscore,
        IndicatorId::SupportResistance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IndicatorId::Rsi => "rsi",
            IndicatorId::Stochastic => "stochastic",
            IndicatorId::Adx => "adx",
            IndicatorId::Momentum => "momentum",
            IndicatorId::TrendEma => "trend_ema",
            IndicatorId::PriceEma => "price_ema",
            IndicatorId::Macd => "macd",
            IndicatorId::MarketStructure => "market_structure",
            IndicatorId::Bollinger => "bollinger",
            IndicatorId::Atr => "atr",
            IndicatorId::VolumeRatio => "volume_ratio",
            IndicatorId::VolumeZscore => "volume_zscore",
            IndicatorId::SupportResistance => "support_resistance",
        }
    }
}

impl fmt::Display for IndicatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trait for conviction indicators.
///
/// `compute` returns a series the same length as `bars`. The first
/// `lookback()` values are `f64::NAN` (warm-up); every defined value lies in
/// [-1, 1]. Identical input must produce bit-identical output — the
/// optimizer's reproducibility depends on it.
///
/// # Look-ahead guard
/// No value at bar t may depend on data from bar t+1 or later.
pub trait Indicator: Send + Sync {
    fn id(&self) -> IndicatorId;

    /// Number of bars needed before the first defined value.
    fn lookback(&self) -> usize;

    fn compute(&self, bars: &[Bar]) -> Vec<f64>;
}

/// Build the full indicator set from a configuration record.
///
/// This is the lookup table the signal engine draws from: one implementation
/// per [`IndicatorId`], all sharing the same contract.
pub fn build_all(config: &IndicatorConfig) -> Vec<Box<dyn Indicator>> {
    IndicatorId::ALL
        .iter()
        .map(|&id| build(id, config))
        .collect()
}

/// Build a single indicator by id.
pub fn build(id: IndicatorId, config: &IndicatorConfig) -> Box<dyn Indicator> {
    match id {
        IndicatorId::Rsi => Box::new(Rsi::new(
            config.rsi_period,
            config.rsi_oversold,
            config.rsi_overbought,
        )),
        IndicatorId::Stochastic => Box::new(Stochastic::new(
            config.stochastic_k,
            config.stochastic_d,
            config.stochastic_oversold,
            config.stochastic_overbought,
        )),
        IndicatorId::Adx => Box::new(Adx::new(config.adx_period, config.adx_threshold)),
        IndicatorId::Momentum => Box::new(Momentum::new(
            config.momentum_period,
            config.momentum_threshold,
        )),
        IndicatorId::TrendEma => {
            Box::new(TrendEma::new(config.trend_fast_ema, config.trend_slow_ema))
        }
        IndicatorId::PriceEma => Box::new(PriceEma::new(config.entry_ema_period)),
        IndicatorId::Macd => Box::new(Macd::new(
            config.macd_fast,
            config.macd_slow,
            config.macd_signal,
            config.macd_flip_only,
            config.macd_histogram_threshold,
        )),
        IndicatorId::MarketStructure => {
            Box::new(MarketStructure::new(config.structure_lookback))
        }
        IndicatorId::Bollinger => Box::new(Bollinger::new(
            config.bollinger_period,
            config.bollinger_std,
        )),
        IndicatorId::Atr => Box::new(AtrGate::new(config.atr_period, config.atr_min_threshold)),
        IndicatorId::VolumeRatio => Box::new(VolumeRatio::new(
            config.volume_ma_period,
            config.volume_spike_multiplier,
        )),
        IndicatorId::VolumeZscore => Box::new(VolumeZscore::new(config.volume_z_period)),
        IndicatorId::SupportResistance => Box::new(SupportResistance::new(
            config.sr_lookback,
            config.sr_touch_distance,
        )),
    }
}

/// Container for precomputed conviction series.
///
/// Built once before the bar loop, then queried by bar index. Keyed by a
/// `BTreeMap` so iteration order — and therefore the floating-point
/// summation order in the composite — is deterministic.
#[derive(Debug, Clone, Default)]
pub struct IndicatorValues {
    series: BTreeMap<IndicatorId, Vec<f64>>,
}

impl IndicatorValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Precompute every indicator in the set over the full bar series.
    pub fn compute(indicators: &[Box<dyn Indicator>], bars: &[Bar]) -> Self {
        let mut values = Self::new();
        for indicator in indicators {
            values.insert(indicator.id(), indicator.compute(bars));
        }
        values
    }

    pub fn insert(&mut self, id: IndicatorId, values: Vec<f64>) {
        self.series.insert(id, values);
    }

    /// Value at a bar index. `Some(NaN)` means "not yet available".
    pub fn get(&self, id: IndicatorId, bar_index: usize) -> Option<f64> {
        self.series.get(&id).and_then(|v| v.get(bar_index).copied())
    }

    /// Iterate series in deterministic id order.
    pub fn iter(&self) -> impl Iterator<Item = (IndicatorId, &[f64])> {
        self.series.iter().map(|(id, v)| (*id, v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

// ─── Shared rolling-window helpers ──────────────────────────────────

/// Rolling maximum over the trailing `window` values (inclusive of current).
/// Positions with fewer than `window` values, or any NaN in the window, are NaN.
pub(crate) fn rolling_max(values: &[f64], window: usize) -> Vec<f64> {
    rolling_extreme(values, window, f64::max)
}

/// Rolling minimum over the trailing `window` values (inclusive of current).
pub(crate) fn rolling_min(values: &[f64], window: usize) -> Vec<f64> {
    rolling_extreme(values, window, f64::min)
}

fn rolling_extreme(values: &[f64], window: usize, pick: fn(f64, f64) -> f64) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if window == 0 {
        return result;
    }
    for i in (window - 1)..n {
        let slice = &values[i + 1 - window..=i];
        if slice.iter().any(|v| v.is_nan()) {
            continue;
        }
        result[i] = slice.iter().copied().fold(slice[0], pick);
    }
    result
}

// ─── Test helpers ───────────────────────────────────────────────────

/// Create synthetic bars from close prices for testing.
///
/// Generates plausible OHLV: open = prev close (or close for the first bar),
/// high = max(open, close) + 1.0, low = min(open, close) - 1.0,
/// volume = 1000, timestamps at 5-minute intervals.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    use chrono::TimeZone;
    let base = chrono::Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                timestamp: base + chrono::Duration::minutes(5 * i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1_000.0,
            }
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IndicatorConfig;

    #[test]
    fn registry_builds_one_of_each() {
        let config = IndicatorConfig::default();
        let all = build_all(&config);
        assert_eq!(all.len(), IndicatorId::ALL.len());
        for (indicator, id) in all.iter().zip(IndicatorId::ALL) {
            assert_eq!(indicator.id(), id);
        }
    }

    #[test]
    fn all_convictions_bounded_and_warmup_is_nan() {
        let config = IndicatorConfig::default();
        let closes: Vec<f64> = (0..300)
            .map(|i| 100.0 + (i as f64 * 0.21).sin() * 8.0)
            .collect();
        let bars = make_bars(&closes);

        for indicator in build_all(&config) {
            let series = indicator.compute(&bars);
            assert_eq!(series.len(), bars.len());
            for (i, &v) in series.iter().enumerate() {
                if i < indicator.lookback() {
                    assert!(
                        v.is_nan(),
                        "{} produced a value inside its warm-up at bar {i}",
                        indicator.id()
                    );
                } else if !v.is_nan() {
                    assert!(
                        (-1.0..=1.0).contains(&v),
                        "{} conviction out of range at bar {i}: {v}",
                        indicator.id()
                    );
                }
            }
        }
    }

    #[test]
    fn indicators_are_deterministic() {
        let config = IndicatorConfig::default();
        let closes: Vec<f64> = (0..200)
            .map(|i| 50.0 + (i as f64 * 0.37).cos() * 5.0)
            .collect();
        let bars = make_bars(&closes);

        for indicator in build_all(&config) {
            let a = indicator.compute(&bars);
            let b = indicator.compute(&bars);
            for (x, y) in a.iter().zip(&b) {
                assert!(
                    (x.is_nan() && y.is_nan()) || x.to_bits() == y.to_bits(),
                    "{} not bit-identical across invocations",
                    indicator.id()
                );
            }
        }
    }

    #[test]
    fn indicator_values_get() {
        let mut iv = IndicatorValues::new();
        iv.insert(IndicatorId::Rsi, vec![f64::NAN, 0.5, -0.5]);
        assert!(iv.get(IndicatorId::Rsi, 0).unwrap().is_nan());
        assert_eq!(iv.get(IndicatorId::Rsi, 1), Some(0.5));
        assert_eq!(iv.get(IndicatorId::Rsi, 3), None); // out of bounds
        assert_eq!(iv.get(IndicatorId::Macd, 0), None); // missing series
    }

    #[test]
    fn rolling_max_min_basic() {
        let values = [1.0, 3.0, 2.0, 5.0, 4.0];
        let max = rolling_max(&values, 3);
        assert!(max[0].is_nan() && max[1].is_nan());
        assert_eq!(max[2], 3.0);
        assert_eq!(max[3], 5.0);
        assert_eq!(max[4], 5.0);
        let min = rolling_min(&values, 3);
        assert_eq!(min[2], 1.0);
        assert_eq!(min[3], 2.0);
        assert_eq!(min[4], 2.0);
    }

    #[test]
    fn rolling_window_propagates_nan() {
        let values = [1.0, f64::NAN, 2.0, 3.0, 4.0];
        let max = rolling_max(&values, 2);
        assert!(max[1].is_nan());
        assert!(max[2].is_nan());
        assert_eq!(max[3], 3.0);
    }
}
