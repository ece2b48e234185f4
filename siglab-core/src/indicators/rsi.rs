//! RSI conviction — mean-reversion off oversold/overbought levels.
//!
//! Wilder-smoothed RSI, then mapped to conviction:
//! below oversold → +1.0 (strong long), within 10 points above it → +0.5,
//! above overbought → -1.0, within 10 points below it → -0.5, else 0.

use crate::domain::Bar;
use crate::indicators::{Indicator, IndicatorId};

#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    oversold: f64,
    overbought: f64,
}

impl Rsi {
    pub fn new(period: usize, oversold: f64, overbought: f64) -> Self {
        assert!(period >= 1, "RSI period must be >= 1");
        assert!(oversold < overbought, "RSI oversold must be below overbought");
        Self {
            period,
            oversold,
            overbought,
        }
    }

    fn conviction(&self, rsi: f64) -> f64 {
        if rsi < self.oversold {
            1.0
        } else if rsi < self.oversold + 10.0 {
            0.5
        } else if rsi > self.overbought {
            -1.0
        } else if rsi > self.overbought - 10.0 {
            -0.5
        } else {
            0.0
        }
    }
}

impl Indicator for Rsi {
    fn id(&self) -> IndicatorId {
        IndicatorId::Rsi
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        let mut result = vec![f64::NAN; n];

        if n < self.period + 1 {
            return result;
        }

        // Price changes
        let mut changes = vec![f64::NAN; n];
        for i in 1..n {
            changes[i] = bars[i].close - bars[i - 1].close;
        }

        // Seed: average gain/loss over the first `period` changes
        let mut avg_gain = 0.0;
        let mut avg_loss = 0.0;
        for &ch in &changes[1..=self.period] {
            if ch > 0.0 {
                avg_gain += ch;
            } else {
                avg_loss -= ch;
            }
        }
        avg_gain /= self.period as f64;
        avg_loss /= self.period as f64;

        result[self.period] = self.conviction(rsi_value(avg_gain, avg_loss));

        // Wilder smoothing
        let alpha = 1.0 / self.period as f64;
        for i in (self.period + 1)..n {
            let gain = changes[i].max(0.0);
            let loss = (-changes[i]).max(0.0);
            avg_gain = alpha * gain + (1.0 - alpha) * avg_gain;
            avg_loss = alpha * loss + (1.0 - alpha) * avg_loss;
            result[i] = self.conviction(rsi_value(avg_gain, avg_loss));
        }

        result
    }
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 && avg_gain == 0.0 {
        50.0 // no movement
    } else if avg_loss == 0.0 {
        100.0
    } else if avg_gain == 0.0 {
        0.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}
