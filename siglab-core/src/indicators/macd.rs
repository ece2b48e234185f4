//! MACD histogram conviction.
//!
//! Histogram = MACD line (fast EMA − slow EMA) minus its signal-line EMA.
//! Two modes:
//! - *flip*: ±1.0 only on the bar where the histogram changes sign, 0
//!   elsewhere — a momentum-turn trigger.
//! - *level*: past the histogram threshold, conviction scales with
//!   magnitude, hist / 0.002 clamped to ±1.

use crate::domain::Bar;
use crate::indicators::ema::ema_of_series;
use crate::indicators::{Indicator, IndicatorId};

#[derive(Debug, Clone)]
pub struct Macd {
    fast: usize,
    slow: usize,
    signal: usize,
    flip_only: bool,
    histogram_threshold: f64,
}

impl Macd {
    pub fn new(
        fast: usize,
        slow: usize,
        signal: usize,
        flip_only: bool,
        histogram_threshold: f64,
    ) -> Self {
        assert!(fast >= 1 && fast < slow, "MACD needs fast < slow");
        assert!(signal >= 1, "MACD signal period must be >= 1");
        Self {
            fast,
            slow,
            signal,
            flip_only,
            histogram_threshold,
        }
    }

    /// Histogram scale that maps to full conviction in level mode.
    const FULL_SCALE: f64 = 0.002;

    /// Histogram series (NaN until slow + signal seeds complete).
    fn histogram(&self, bars: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let fast = ema_of_series(&closes, self.fast);
        let slow = ema_of_series(&closes, self.slow);

        let macd_line: Vec<f64> = fast
            .iter()
            .zip(&slow)
            .map(|(&f, &s)| if f.is_nan() || s.is_nan() { f64::NAN } else { f - s })
            .collect();

        // The signal EMA runs over the defined tail of the MACD line.
        let start = self.slow - 1;
        let mut signal_line = vec![f64::NAN; n];
        if start < n {
            let tail = ema_of_series(&macd_line[start..], self.signal);
            for (i, v) in tail.into_iter().enumerate() {
                signal_line[start + i] = v;
            }
        }

        macd_line
            .iter()
            .zip(&signal_line)
            .map(|(&m, &s)| if m.is_nan() || s.is_nan() { f64::NAN } else { m - s })
            .collect()
    }
}

impl Indicator for Macd {
    fn id(&self) -> IndicatorId {
        IndicatorId::Macd
    }

    fn lookback(&self) -> usize {
        let histogram_start = self.slow + self.signal - 2;
        if self.flip_only {
            histogram_start + 1 // flips need the previous histogram value
        } else {
            histogram_start
        }
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let hist = self.histogram(bars);
        let n = hist.len();
        let mut result = vec![f64::NAN; n];

        for i in 0..n {
            let h = hist[i];
            if h.is_nan() {
                continue;
            }
            if self.flip_only {
                let prev = if i > 0 { hist[i - 1] } else { f64::NAN };
                if prev.is_nan() {
                    continue;
                }
                result[i] = if prev < 0.0 && h > 0.0 {
                    1.0
                } else if prev > 0.0 && h < 0.0 {
                    -1.0
                } else {
                    0.0
                };
            } else {
                result[i] = if h > self.histogram_threshold {
                    (h / Self::FULL_SCALE).min(1.0)
                } else if h < -self.histogram_threshold {
                    (h / Self::FULL_SCALE).max(-1.0)
                } else {
                    0.0
                };
            }
        }

        result
    }
}
