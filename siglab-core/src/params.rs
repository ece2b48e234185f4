//! Parameter vectors and the bounded space the optimizer searches.
//!
//! A [`ParameterVector`] is what the optimizer tunes: per-indicator weights,
//! the entry threshold, and the risk parameters. It is immutable once handed
//! to the simulator for an evaluation. [`ParameterSpace`] declares the
//! bounds and converts between vectors and the normalized `[0,1]^n` genotype
//! the search distribution lives in.
//!
//! Two validation paths, deliberately different:
//! - optimizer-internal candidates are **clamped** onto the bounds
//!   (boundary projection, not an error);
//! - externally supplied vectors (hand-written artifacts, old files) go
//!   through [`ParameterVector::validate`] and fail loudly.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::indicators::IndicatorId;

/// The tunable strategy parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterVector {
    /// Per-indicator weight in [-1, 1]. Weights with |w| <= 0.01 leave the
    /// indicator inactive.
    pub weights: BTreeMap<IndicatorId, f64>,
    /// Composite-signal magnitude required to open a position (and, with
    /// opposite sign, to flip out of one).
    pub entry_threshold: f64,
    /// Unrealized gain fraction that forces a close.
    pub take_profit_pct: f64,
    /// Unrealized loss fraction that forces a close. Always below
    /// `take_profit_pct`.
    pub stop_loss_pct: f64,
    /// Maximum bars a position may stay open.
    pub max_holding_bars: usize,
    /// New entries per UTC day before opens are suppressed.
    pub max_daily_trades: usize,
}

impl ParameterVector {
    /// Weight for an indicator; missing entries count as zero.
    pub fn weight(&self, id: IndicatorId) -> f64 {
        self.weights.get(&id).copied().unwrap_or(0.0)
    }

    /// Validate against the declared space. Used for externally supplied
    /// vectors; optimizer candidates are clamped instead.
    pub fn validate(&self, space: &ParameterSpace) -> Result<(), CoreError> {
        for &id in IndicatorId::ALL.iter() {
            let w = match self.weights.get(&id) {
                Some(w) => *w,
                None => {
                    return Err(CoreError::InvalidParameter {
                        name: format!("weights.{id}"),
                        reason: "missing weight".into(),
                    })
                }
            };
            let (lo, hi) = space.weight_bounds;
            if !w.is_finite() || w < lo || w > hi {
                return Err(CoreError::InvalidParameter {
                    name: format!("weights.{id}"),
                    reason: format!("{w} outside [{lo}, {hi}]"),
                });
            }
        }

        for (name, value, (lo, hi)) in [
            ("entry_threshold", self.entry_threshold, space.entry_threshold),
            ("take_profit_pct", self.take_profit_pct, space.take_profit_pct),
            ("stop_loss_pct", self.stop_loss_pct, space.stop_loss_pct),
        ] {
            if !value.is_finite() || value < lo || value > hi {
                return Err(CoreError::InvalidParameter {
                    name: name.into(),
                    reason: format!("{value} outside [{lo}, {hi}]"),
                });
            }
        }

        for (name, value, (lo, hi)) in [
            (
                "max_holding_bars",
                self.max_holding_bars,
                space.max_holding_bars,
            ),
            (
                "max_daily_trades",
                self.max_daily_trades,
                space.max_daily_trades,
            ),
        ] {
            if value < lo || value > hi {
                return Err(CoreError::InvalidParameter {
                    name: name.into(),
                    reason: format!("{value} outside [{lo}, {hi}]"),
                });
            }
        }

        if self.stop_loss_pct >= self.take_profit_pct {
            return Err(CoreError::InvalidParameter {
                name: "stop_loss_pct".into(),
                reason: format!(
                    "stop loss {} must be below take profit {}",
                    self.stop_loss_pct, self.take_profit_pct
                ),
            });
        }

        Ok(())
    }
}

/// Declared bounds for every dimension of the search.
///
/// Genotype layout: one weight per [`IndicatorId::ALL`] entry in order,
/// then entry_threshold, take_profit_pct, stop_loss_pct, max_holding_bars,
/// max_daily_trades.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterSpace {
    pub weight_bounds: (f64, f64),
    pub entry_threshold: (f64, f64),
    pub take_profit_pct: (f64, f64),
    pub stop_loss_pct: (f64, f64),
    pub max_holding_bars: (usize, usize),
    pub max_daily_trades: (usize, usize),
}

impl Default for ParameterSpace {
    fn default() -> Self {
        Self {
            weight_bounds: (-1.0, 1.0),
            entry_threshold: (0.05, 1.0),
            take_profit_pct: (0.002, 0.05),
            stop_loss_pct: (0.001, 0.04),
            max_holding_bars: (10, 500),
            max_daily_trades: (5, 50),
        }
    }
}

impl ParameterSpace {
    /// Number of genotype dimensions.
    pub fn dim(&self) -> usize {
        IndicatorId::ALL.len() + 5
    }

    /// Dimension names in genotype order, for artifacts and fingerprints.
    pub fn dimension_names(&self) -> Vec<String> {
        let mut names: Vec<String> = IndicatorId::ALL
            .iter()
            .map(|id| format!("{id}_weight"))
            .collect();
        names.extend(
            [
                "entry_threshold",
                "take_profit_pct",
                "stop_loss_pct",
                "max_holding_bars",
                "max_daily_trades",
            ]
            .map(String::from),
        );
        names
    }

    /// Decode a normalized genotype into a parameter vector.
    ///
    /// Each coordinate is clamped to [0, 1] before interpolation, so any
    /// sample the distribution proposes lands inside the bounds. Integer
    /// dimensions round to the nearest value. The stop < take invariant is
    /// restored by projection: a stop at or above the take profit is pulled
    /// just below it.
    pub fn decode(&self, genotype: &[f64]) -> ParameterVector {
        assert_eq!(genotype.len(), self.dim(), "genotype dimension mismatch");

        let lerp = |x: f64, (lo, hi): (f64, f64)| lo + x.clamp(0.0, 1.0) * (hi - lo);
        let lerp_int = |x: f64, (lo, hi): (usize, usize)| {
            (lo as f64 + x.clamp(0.0, 1.0) * (hi - lo) as f64).round() as usize
        };

        let mut weights = BTreeMap::new();
        for (i, &id) in IndicatorId::ALL.iter().enumerate() {
            weights.insert(id, lerp(genotype[i], self.weight_bounds));
        }
        let base = IndicatorId::ALL.len();

        let entry_threshold = lerp(genotype[base], self.entry_threshold);
        let take_profit_pct = lerp(genotype[base + 1], self.take_profit_pct);
        let mut stop_loss_pct = lerp(genotype[base + 2], self.stop_loss_pct);
        if stop_loss_pct >= take_profit_pct {
            stop_loss_pct = take_profit_pct * 0.999;
        }

        ParameterVector {
            weights,
            entry_threshold,
            take_profit_pct,
            stop_loss_pct,
            max_holding_bars: lerp_int(genotype[base + 3], self.max_holding_bars),
            max_daily_trades: lerp_int(genotype[base + 4], self.max_daily_trades),
        }
    }

    /// Encode a parameter vector back into normalized coordinates.
    /// Inverse of [`Self::decode`] up to integer rounding and stop/take
    /// projection.
    pub fn encode(&self, params: &ParameterVector) -> Vec<f64> {
        let inv = |v: f64, (lo, hi): (f64, f64)| {
            if hi > lo {
                ((v - lo) / (hi - lo)).clamp(0.0, 1.0)
            } else {
                0.0
            }
        };
        let inv_int = |v: usize, (lo, hi): (usize, usize)| {
            if hi > lo {
                ((v.saturating_sub(lo)) as f64 / (hi - lo) as f64).clamp(0.0, 1.0)
            } else {
                0.0
            }
        };

        let mut genotype = Vec::with_capacity(self.dim());
        for &id in IndicatorId::ALL.iter() {
            genotype.push(inv(params.weight(id), self.weight_bounds));
        }
        genotype.push(inv(params.entry_threshold, self.entry_threshold));
        genotype.push(inv(params.take_profit_pct, self.take_profit_pct));
        genotype.push(inv(params.stop_loss_pct, self.stop_loss_pct));
        genotype.push(inv_int(params.max_holding_bars, self.max_holding_bars));
        genotype.push(inv_int(params.max_daily_trades, self.max_daily_trades));
        genotype
    }
}
