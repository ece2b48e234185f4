//! Volume convictions: spike ratio and z-score.
//!
//! Volume alone has no direction; both indicators borrow the bar's own
//! close-vs-open sign and use unusual volume as a confidence weight on it.

use crate::domain::Bar;
use crate::indicators::{Indicator, IndicatorId};

fn bar_direction(bar: &Bar) -> f64 {
    if bar.close > bar.open {
        1.0
    } else if bar.close < bar.open {
        -1.0
    } else {
        0.0
    }
}

/// Volume over its moving average. A spike past the multiplier reads ±0.5 in
/// the direction the bar moved; ordinary volume reads 0.
#[derive(Debug, Clone)]
pub struct VolumeRatio {
    ma_period: usize,
    spike_multiplier: f64,
}

impl VolumeRatio {
    pub fn new(ma_period: usize, spike_multiplier: f64) -> Self {
        assert!(ma_period >= 1, "volume MA period must be >= 1");
        assert!(spike_multiplier > 0.0, "spike multiplier must be positive");
        Self {
            ma_period,
            spike_multiplier,
        }
    }
}

impl Indicator for VolumeRatio {
    fn id(&self) -> IndicatorId {
        IndicatorId::VolumeRatio
    }

    fn lookback(&self) -> usize {
        self.ma_period - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        let mut result = vec![f64::NAN; n];

        for i in (self.ma_period - 1)..n {
            let window = &bars[i + 1 - self.ma_period..=i];
            let ma = window.iter().map(|b| b.volume).sum::<f64>() / self.ma_period as f64;
            if ma <= 0.0 {
                result[i] = 0.0;
                continue;
            }
            result[i] = if bars[i].volume > ma * self.spike_multiplier {
                0.5 * bar_direction(&bars[i])
            } else {
                0.0
            };
        }

        result
    }
}

/// Volume z-score over a trailing window. |z| > 1 reads as conviction
/// `direction × min(|z| / 3, 1) × 0.5`; unremarkable volume reads 0.
/// Zero variance (constant volume) is never a spike.
#[derive(Debug, Clone)]
pub struct VolumeZscore {
    period: usize,
}

impl VolumeZscore {
    pub fn new(period: usize) -> Self {
        assert!(period >= 2, "volume z-score period must be >= 2");
        Self { period }
    }

    /// z-scores at or past this magnitude count as full-strength.
    const Z_CAP: f64 = 3.0;
}

impl Indicator for VolumeZscore {
    fn id(&self) -> IndicatorId {
        IndicatorId::VolumeZscore
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
                .map(|b| b.volume)
                .collect();
            let mean = window.iter().sum::<f64>() / self.period as f64;
            let variance =
                window.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / self.period as f64;
            let sigma = variance.sqrt();

            if sigma <= 0.0 {
                result[i] = 0.0;
                continue;
            }
            let z = (bars[i].volume - mean) / sigma;
            result[i] = if z.abs() > 1.0 {
                bar_direction(&bars[i]) * (z.abs() / Self::Z_CAP).min(1.0) * 0.5
            } else {
                0.0
            };
        }

        result
    }
}
