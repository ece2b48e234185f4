//! ATR tradability gate, plus the shared true-range/Wilder helpers.
//!
//! The conviction is not directional information about price: it gates
//! whether the market is moving enough to trade at all. ATR is normalized by
//! the close so one threshold works across price scales:
//! atr/close > min_threshold → +0.2, else -0.2.

use crate::domain::Bar;
use crate::indicators::{Indicator, IndicatorId};

/// True Range series.
/// TR[0] = high[0] - low[0] (no previous close).
/// TR[t] = max(high-low, |high-prev_close|, |low-prev_close|).
pub fn true_range(bars: &[Bar]) -> Vec<f64> {
    let n = bars.len();
    let mut tr = vec![f64::NAN; n];
    if n == 0 {
        return tr;
    }
    tr[0] = bars[0].high - bars[0].low;
    for i in 1..n {
        let h = bars[i].high;
        let l = bars[i].low;
        let pc = bars[i - 1].close;
        tr[i] = (h - l).max((h - pc).abs()).max((l - pc).abs());
    }
    tr
}

/// Wilder smoothing (alpha = 1/period), seeded with the mean of the first
/// `period` consecutive non-NaN values. Output is NaN until the seed
/// completes; a NaN after the seed taints everything from there on.
pub fn wilder_smooth(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if n < period || period == 0 {
        return result;
    }

    // First index with `period` consecutive non-NaN values
    let seed_start = (0..n).find(|&i| {
        i + period <= n && values[i..i + period].iter().all(|v| !v.is_nan())
    });
    let seed_start = match seed_start {
        Some(s) => s,
        None => return result,
    };
    let seed_end = seed_start + period;

    let seed: f64 = values[seed_start..seed_end].iter().sum::<f64>() / period as f64;
    result[seed_end - 1] = seed;

    let alpha = 1.0 / period as f64;
    let mut prev = seed;
    for i in seed_end..n {
        if values[i].is_nan() {
            for val in result.iter_mut().skip(i) {
                *val = f64::NAN;
            }
            return result;
        }
        let smoothed = alpha * values[i] + (1.0 - alpha) * prev;
        result[i] = smoothed;
        prev = smoothed;
    }

    result
}

/// Raw Wilder ATR series (price units).
pub fn atr_series(bars: &[Bar], period: usize) -> Vec<f64> {
    let mut tr = true_range(bars);
    // TR[0] has no previous close; exclude it from the seed window.
    if !tr.is_empty() {
        tr[0] = f64::NAN;
    }
    wilder_smooth(&tr, period)
}

#[derive(Debug, Clone)]
pub struct AtrGate {
    period: usize,
    min_threshold: f64,
}

impl AtrGate {
    pub fn new(period: usize, min_threshold: f64) -> Self {
        assert!(period >= 1, "ATR period must be >= 1");
        Self {
            period,
            min_threshold,
        }
    }
}

impl Indicator for AtrGate {
    fn id(&self) -> IndicatorId {
        IndicatorId::Atr
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let atr = atr_series(bars, self.period);
        atr.iter()
            .zip(bars)
            .map(|(&a, bar)| {
                if a.is_nan() || bar.close <= 0.0 {
                    f64::NAN
                } else if a / bar.close > self.min_threshold {
                    0.2
                } else {
                    -0.2
                }
            })
            .collect()
    }
}
