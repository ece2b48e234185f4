//! ADX conviction — trend-strength gate with direction from the DIs.
//!
//! Wilder ADX: smoothed +DM/-DM over smoothed TR give +DI/-DI, DX is their
//! normalized spread, ADX the smoothed DX. When ADX clears the strength
//! threshold the conviction is ±0.5 by the sign of (+DI − -DI); a weak or
//! directionless market reads 0.

use crate::domain::Bar;
use crate::indicators::atr::{true_range, wilder_smooth};
use crate::indicators::{Indicator, IndicatorId};

#[derive(Debug, Clone)]
pub struct Adx {
    period: usize,
    threshold: f64,
}

impl Adx {
    pub fn new(period: usize, threshold: f64) -> Self {
        assert!(period >= 1, "ADX period must be >= 1");
        Self { period, threshold }
    }
}

impl Indicator for Adx {
    fn id(&self) -> IndicatorId {
        IndicatorId::Adx
    }

    fn lookback(&self) -> usize {
        // period bars for DI smoothing, then the ADX smoothing seed on top.
        2 * self.period - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        let result = vec![f64::NAN; n];
        if n < 2 {
            return result;
        }

        // Directional movement
        let mut plus_dm = vec![f64::NAN; n];
        let mut minus_dm = vec![f64::NAN; n];
        for i in 1..n {
            let high_diff = bars[i].high - bars[i - 1].high;
            let low_diff = bars[i - 1].low - bars[i].low;
            plus_dm[i] = if high_diff > low_diff && high_diff > 0.0 {
                high_diff
            } else {
                0.0
            };
            minus_dm[i] = if low_diff > high_diff && low_diff > 0.0 {
                low_diff
            } else {
                0.0
            };
        }

        let mut tr = true_range(bars);
        tr[0] = f64::NAN; // no previous close
        let smooth_tr = wilder_smooth(&tr, self.period);
        let smooth_plus = wilder_smooth(&plus_dm, self.period);
        let smooth_minus = wilder_smooth(&minus_dm, self.period);

        let mut dx = vec![f64::NAN; n];
        let mut di_spread = vec![f64::NAN; n];
        for i in 0..n {
            if smooth_tr[i].is_nan()
                || smooth_plus[i].is_nan()
                || smooth_minus[i].is_nan()
                || smooth_tr[i] == 0.0
            {
                continue;
            }
            let plus_di = 100.0 * smooth_plus[i] / smooth_tr[i];
            let minus_di = 100.0 * smooth_minus[i] / smooth_tr[i];
            let di_sum = plus_di + minus_di;
            di_spread[i] = plus_di - minus_di;
            dx[i] = if di_sum == 0.0 {
                0.0
            } else {
                100.0 * (plus_di - minus_di).abs() / di_sum
            };
        }

        let adx = wilder_smooth(&dx, self.period);

        adx.iter()
            .zip(&di_spread)
            .map(|(&a, &spread)| {
                if a.is_nan() || spread.is_nan() {
                    f64::NAN
                } else if a > self.threshold && spread > 0.0 {
                    0.5
                } else if a > self.threshold && spread < 0.0 {
                    -0.5
                } else {
                    0.0
                }
            })
            .collect()
    }
}
