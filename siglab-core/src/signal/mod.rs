//! Signal engine — composite weighted signal and the trading decision.
//!
//! This is the single source of truth for "what would this strategy do right
//! now": the backtest simulator and any live order-placement collaborator
//! call the same [`SignalEngine::evaluate`], so optimized parameters
//! reproduce live behavior exactly.
//!
//! The decision is a pure function of the indicator values at one bar, the
//! parameter vector, and the current position side — no hidden memory.

use serde::{Deserialize, Serialize};

use crate::domain::{ExitReason, Side};
use crate::indicators::{IndicatorId, IndicatorValues};
use crate::params::ParameterVector;

/// Weights with |w| at or below this are treated as inactive.
pub const ACTIVE_WEIGHT_EPSILON: f64 = 0.01;

/// What the engine wants done at this bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    OpenLong,
    OpenShort,
    Close(ExitReason),
    Hold,
}

/// Composite signal and decision for one bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    /// Normalized weighted sum of active, available convictions, in
    /// roughly [-1, 1].
    pub composite: f64,
    pub decision: Decision,
}

/// The signal engine. Stateless: everything it needs arrives per call.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignalEngine;

impl SignalEngine {
    pub fn new() -> Self {
        Self
    }

    /// Composite signal at a bar: Σ wᵢ·vᵢ over indicators that are active
    /// (|w| > 0.01) and available (non-NaN at this bar), divided by Σ|wᵢ|
    /// over the same set. Warm-up indicators drop out of both sums, so early
    /// bars are not skewed; with no contributors the composite is 0.
    pub fn composite(
        &self,
        values: &IndicatorValues,
        bar_index: usize,
        params: &ParameterVector,
    ) -> f64 {
        let mut weighted_sum = 0.0;
        let mut weight_mass = 0.0;

        for &id in IndicatorId::ALL.iter() {
            let weight = params.weight(id);
            if weight.abs() <= ACTIVE_WEIGHT_EPSILON {
                continue;
            }
            let value = match values.get(id, bar_index) {
                Some(v) if !v.is_nan() => v,
                _ => continue,
            };
            weighted_sum += weight * value;
            weight_mass += weight.abs();
        }

        if weight_mass > 0.0 {
            weighted_sum / weight_mass
        } else {
            0.0
        }
    }

    /// Evaluate one bar.
    ///
    /// Threshold crossings use strict inequality; exact equality is a
    /// `Hold`. An open position only reacts to an *opposing* signal — a
    /// strengthening signal in the position's own direction is a `Hold`
    /// (one position per instrument, never pyramided).
    pub fn evaluate(
        &self,
        values: &IndicatorValues,
        bar_index: usize,
        params: &ParameterVector,
        position: Option<Side>,
    ) -> Evaluation {
        let composite = self.composite(values, bar_index, params);
        let threshold = params.entry_threshold;

        let decision = match position {
            None => {
                if composite > threshold {
                    Decision::OpenLong
                } else if composite < -threshold {
                    Decision::OpenShort
                } else {
                    Decision::Hold
                }
            }
            Some(Side::Long) => {
                if composite < -threshold {
                    Decision::Close(ExitReason::OpposingSignal)
                } else {
                    Decision::Hold
                }
            }
            Some(Side::Short) => {
                if composite > threshold {
                    Decision::Close(ExitReason::OpposingSignal)
                } else {
                    Decision::Hold
                }
            }
        };

        Evaluation {
            composite,
            decision,
        }
    }
}
