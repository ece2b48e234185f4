//! EMA-based convictions: trend regime flag and price-distance.
//!
//! `TrendEma` compares a fast and a slow EMA: +1 when fast > slow (bullish
//! regime), -1 when fast < slow, 0 at exact equality.
//!
//! `PriceEma` measures how far the close sits from its EMA, as a
//! mean-reversion read: stretched below → long conviction, stretched above
//! → short conviction.

use crate::domain::Bar;
use crate::indicators::{Indicator, IndicatorId};

/// Raw EMA of a value series.
///
/// Recursive: EMA[t] = alpha * v[t] + (1 - alpha) * EMA[t-1], with
/// alpha = 2 / (period + 1). Seed: SMA of the first `period` values.
/// The first `period - 1` outputs are NaN.
pub fn ema_of_series(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];

    if n < period || period == 0 {
        return result;
    }

    let alpha = 2.0 / (period as f64 + 1.0);

    let mut sum = 0.0;
    for &v in values.iter().take(period) {
        if v.is_nan() {
            return result;
        }
        sum += v;
    }
    let seed = sum / period as f64;
    result[period - 1] = seed;

    let mut prev = seed;
    for i in period..n {
        if values[i].is_nan() {
            for val in result.iter_mut().skip(i) {
                *val = f64::NAN;
            }
            return result;
        }
        let ema = alpha * values[i] + (1.0 - alpha) * prev;
        result[i] = ema;
        prev = ema;
    }

    result
}

#[derive(Debug, Clone)]
pub struct TrendEma {
    fast: usize,
    slow: usize,
}

impl TrendEma {
    pub fn new(fast: usize, slow: usize) -> Self {
        assert!(fast >= 1 && fast < slow, "trend EMA needs fast < slow");
        Self { fast, slow }
    }
}

impl Indicator for TrendEma {
    fn id(&self) -> IndicatorId {
        IndicatorId::TrendEma
    }

    fn lookback(&self) -> usize {
        self.slow - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let fast = ema_of_series(&closes, self.fast);
        let slow = ema_of_series(&closes, self.slow);

        fast.iter()
            .zip(&slow)
            .map(|(&f, &s)| {
                if f.is_nan() || s.is_nan() {
                    f64::NAN
                } else if f > s {
                    1.0
                } else if f < s {
                    -1.0
                } else {
                    0.0
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct PriceEma {
    period: usize,
}

impl PriceEma {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "price EMA period must be >= 1");
        Self { period }
    }

    /// Stretch bands: 0.2% from the EMA flips between the weak and strong read.
    const STRETCH: f64 = 0.002;

    fn conviction(distance: f64) -> f64 {
        if distance < -Self::STRETCH {
            0.8
        } else if distance < 0.0 {
            0.3
        } else if distance > Self::STRETCH {
            -0.8
        } else if distance > 0.0 {
            -0.3
        } else {
            0.0
        }
    }
}

impl Indicator for PriceEma {
    fn id(&self) -> IndicatorId {
        IndicatorId::PriceEma
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let ema = ema_of_series(&closes, self.period);

        closes
            .iter()
            .zip(&ema)
            .map(|(&close, &e)| {
                if e.is_nan() || e == 0.0 {
                    f64::NAN
                } else {
                    Self::conviction((close - e) / e)
                }
            })
            .collect()
    }
}
