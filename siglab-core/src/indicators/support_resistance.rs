//! Dynamic support/resistance distance.
//!
//! Support = rolling lowest low, resistance = rolling highest high. A close
//! within the touch distance of support reads +0.7 (bounce zone), within it
//! of resistance reads -0.7 (rejection zone), else 0. A close touching both
//! (degenerate flat range) reads 0.

use crate::domain::Bar;
use crate::indicators::{rolling_max, rolling_min, Indicator, IndicatorId};

#[derive(Debug, Clone)]
pub struct SupportResistance {
    lookback: usize,
    touch_distance: f64,
}

impl SupportResistance {
    pub fn new(lookback: usize, touch_distance: f64) -> Self {
        assert!(lookback >= 1, "S/R lookback must be >= 1");
        assert!(touch_distance > 0.0, "S/R touch distance must be positive");
        Self {
            lookback,
            touch_distance,
        }
    }
}

impl Indicator for SupportResistance {
    fn id(&self) -> IndicatorId {
        IndicatorId::SupportResistance
    }

    fn lookback(&self) -> usize {
        self.lookback - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
        let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();

        let resistance = rolling_max(&highs, self.lookback);
        let support = rolling_min(&lows, self.lookback);

        bars.iter()
            .enumerate()
            .map(|(i, bar)| {
                let (r, s) = (resistance[i], support[i]);
                if r.is_nan() || s.is_nan() || bar.close <= 0.0 {
                    return f64::NAN;
                }
                let near_support = (bar.close - s).abs() / bar.close < self.touch_distance;
                let near_resistance = (bar.close - r).abs() / bar.close < self.touch_distance;
                if near_support && !near_resistance {
                    0.7
                } else if near_resistance && !near_support {
                    -0.7
                } else {
                    0.0
                }
            })
            .collect()
    }
}
