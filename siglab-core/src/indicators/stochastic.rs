//! Stochastic oscillator conviction.
//!
//! Fast %K over the K window, smoothed with a D-period SMA (slow %K).
//! Below oversold → +1.0, above overbought → -1.0, else 0.

use crate::domain::Bar;
use crate::indicators::{rolling_max, rolling_min, Indicator, IndicatorId};

#[derive(Debug, Clone)]
pub struct Stochastic {
    k_period: usize,
    d_period: usize,
    oversold: f64,
    overbought: f64,
}

impl Stochastic {
    pub fn new(k_period: usize, d_period: usize, oversold: f64, overbought: f64) -> Self {
        assert!(k_period >= 1 && d_period >= 1, "stochastic periods must be >= 1");
        assert!(
            oversold < overbought,
            "stochastic oversold must be below overbought"
        );
        Self {
            k_period,
            d_period,
            oversold,
            overbought,
        }
    }
}

impl Indicator for Stochastic {
    fn id(&self) -> IndicatorId {
        IndicatorId::Stochastic
    }

    fn lookback(&self) -> usize {
        self.k_period + self.d_period - 2
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
        let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();

        let highest = rolling_max(&highs, self.k_period);
        let lowest = rolling_min(&lows, self.k_period);

        // Fast %K
        let mut fast_k = vec![f64::NAN; n];
        for i in 0..n {
            if highest[i].is_nan() || lowest[i].is_nan() {
                continue;
            }
            let range = highest[i] - lowest[i];
            fast_k[i] = if range == 0.0 {
                50.0
            } else {
                100.0 * (bars[i].close - lowest[i]) / range
            };
        }

        // Slow %K: SMA over d_period
        let mut result = vec![f64::NAN; n];
        for i in 0..n {
            if i + 1 < self.d_period {
                continue;
            }
            let window = &fast_k[i + 1 - self.d_period..=i];
            if window.iter().any(|v| v.is_nan()) {
                continue;
            }
            let slow_k = window.iter().sum::<f64>() / self.d_period as f64;
            result[i] = if slow_k < self.oversold {
                1.0
            } else if slow_k > self.overbought {
                -1.0
            } else {
                0.0
            };
        }

        result
    }
}
