//! Bollinger-band position conviction.
//!
//! Bands at SMA ± std_dev × σ (population σ, matching the classic
//! definition). Close at or below the lower band → +0.8 (stretched down),
//! at or above the upper band → -0.8, inside the bands → 0.

use crate::domain::Bar;
use crate::indicators::{Indicator, IndicatorId};

#[derive(Debug, Clone)]
pub struct Bollinger {
    period: usize,
    std_dev: f64,
}

impl Bollinger {
    pub fn new(period: usize, std_dev: f64) -> Self {
        assert!(period >= 2, "Bollinger period must be >= 2");
        assert!(std_dev > 0.0, "Bollinger std_dev must be positive");
        Self { period, std_dev }
    }
}

impl Indicator for Bollinger {
    fn id(&self) -> IndicatorId {
        IndicatorId::Bollinger
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        let mut result = vec![f64::NAN; n];

        for i in (self.period - 1)..n {
            let window: Vec<f64> = bars[i + 1 - self.period..=i]
                .iter()
                .map(|b| b.close)
                .collect();
            let mean = window.iter().sum::<f64>() / self.period as f64;
            let variance =
                window.iter().map(|c| (c - mean).powi(2)).sum::<f64>() / self.period as f64;
            let sigma = variance.sqrt();

            let upper = mean + self.std_dev * sigma;
            let lower = mean - self.std_dev * sigma;
            let close = bars[i].close;

            result[i] = if close <= lower {
                0.8
            } else if close >= upper {
                -0.8
            } else {
                0.0
            };
        }

        result
    }
}
