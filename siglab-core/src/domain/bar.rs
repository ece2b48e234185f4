//! Bar — the fundamental market data unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// OHLCV bar for a single instrument over one fixed interval.
///
/// Bars are immutable once recorded. A backtest consumes an ordered sequence
/// with strictly increasing timestamps; [`validate_series`] enforces that
/// before any bar is replayed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// Returns true if any price field is NaN.
    pub fn is_void(&self) -> bool {
        self.open.is_nan() || self.high.is_nan() || self.low.is_nan() || self.close.is_nan()
    }

    /// Basic OHLC sanity: high is the top of the range, low the bottom,
    /// prices positive, volume non-negative.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.open > 0.0
            && self.close > 0.0
            && self.volume >= 0.0
    }
}

/// Validate a bar sequence before simulation.
///
/// Timestamps must be strictly increasing and every bar must pass
/// [`Bar::is_sane`]. Any violation is fatal — the simulator never silently
/// skips or reorders bars.
pub fn validate_series(bars: &[Bar]) -> Result<(), CoreError> {
    for (i, bar) in bars.iter().enumerate() {
        if !bar.is_sane() {
            return Err(CoreError::DataIntegrity {
                index: i,
                reason: format!("bar fails OHLCV sanity check: {bar:?}"),
            });
        }
        if i > 0 && bar.timestamp <= bars[i - 1].timestamp {
            return Err(CoreError::DataIntegrity {
                index: i,
                reason: format!(
                    "non-monotonic timestamp {} after {}",
                    bar.timestamp,
                    bars[i - 1].timestamp
                ),
            });
        }
    }
    Ok(())
}
