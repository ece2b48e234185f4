//! Market-structure trend flag.
//!
//! Compares the rolling highest-high and lowest-low window against the same
//! window one lookback earlier: higher highs AND higher lows → +0.8, lower
//! highs AND lower lows → -0.8, mixed → 0.

use crate::domain::Bar;
use crate::indicators::{rolling_max, rolling_min, Indicator, IndicatorId};

#[derive(Debug, Clone)]
pub struct MarketStructure {
    lookback: usize,
}

impl MarketStructure {
    pub fn new(lookback: usize) -> Self {
        assert!(lookback >= 1, "structure lookback must be >= 1");
        Self { lookback }
    }
}

impl Indicator for MarketStructure {
    fn id(&self) -> IndicatorId {
        IndicatorId::MarketStructure
    }

    fn lookback(&self) -> usize {
        2 * self.lookback - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
        let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();

        let highest = rolling_max(&highs, self.lookback);
        let lowest = rolling_min(&lows, self.lookback);

        let mut result = vec![f64::NAN; n];
        for i in self.lookback..n {
            let (hh, ll) = (highest[i], lowest[i]);
            let (hh_prev, ll_prev) = (highest[i - self.lookback], lowest[i - self.lookback]);
            if hh.is_nan() || ll.is_nan() || hh_prev.is_nan() || ll_prev.is_nan() {
                continue;
            }
            result[i] = if hh > hh_prev && ll > ll_prev {
                0.8
            } else if hh < hh_prev && ll < ll_prev {
                -0.8
            } else {
                0.0
            };
        }

        result
    }
}
