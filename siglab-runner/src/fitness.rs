//! Fitness — the scalar objective the optimizer maximizes.
//!
//! A risk-adjusted composite of the summary metrics. The exact combination
//! is deliberately configuration, not code: every weight and scale lives in
//! [`FitnessConfig`] so the blend can be tuned without touching the search.
//!
//! Hard floors return a fixed, finite penalty instead of discarding the
//! candidate — a uniform basin the search can climb out of, which keeps the
//! gradient informative near the floor.

use serde::{Deserialize, Serialize};

use crate::metrics::Summary;

/// Tunable combination weights and floors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitnessConfig {
    /// Candidates below this win rate get `penalty_fitness`.
    pub min_win_rate: f64,
    /// Candidates losing more than this fraction overall get
    /// `penalty_fitness`.
    pub max_total_loss: f64,
    /// Assigned to zero-trade candidates, floor violations, and failed
    /// evaluations. Finite and far below any reachable score.
    pub penalty_fitness: f64,

    // Score-term weights (the blend).
    pub return_weight: f64,
    pub win_rate_weight: f64,
    pub profit_weight: f64,
    pub sharpe_weight: f64,
    pub drawdown_weight: f64,
    pub risk_reward_weight: f64,

    // Normalization scales for the sigmoid terms.
    pub return_scale: f64,
    pub sharpe_scale: f64,
    pub profit_scale: f64,
    /// Drawdowns at or past this fraction score zero on the drawdown term.
    pub drawdown_tolerance: f64,

    // Trade-frequency damper.
    pub min_trades_per_month: f64,
    pub max_trades_per_month: f64,
    pub low_activity_damper: f64,
    pub high_activity_damper: f64,
}

impl Default for FitnessConfig {
    fn default() -> Self {
        Self {
            min_win_rate: 0.2,
            max_total_loss: 0.01,
            penalty_fitness: -1_000.0,

            return_weight: 0.10,
            win_rate_weight: 0.50,
            profit_weight: 0.10,
            sharpe_weight: 0.15,
            drawdown_weight: 0.05,
            risk_reward_weight: 0.10,

            return_scale: 0.15,
            sharpe_scale: 1.5,
            profit_scale: 1.5,
            drawdown_tolerance: 0.40,

            min_trades_per_month: 10.0,
            max_trades_per_month: 390.0,
            low_activity_damper: 0.3,
            high_activity_damper: 0.8,
        }
    }
}

/// Scalar objective plus the diagnostics it was derived from. Immutable
/// once computed; the optimizer owns these for ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitnessResult {
    pub objective: f64,
    pub win_rate: f64,
    pub sharpe: f64,
    pub max_drawdown: f64,
    pub total_return: f64,
    pub trade_count: usize,
}

impl FitnessConfig {
    /// A result carrying the penalty objective (used for failed or
    /// floor-violating candidates).
    pub fn penalized(&self, summary: &Summary) -> FitnessResult {
        FitnessResult {
            objective: self.penalty_fitness,
            win_rate: summary.win_rate,
            sharpe: summary.sharpe,
            max_drawdown: summary.max_drawdown,
            total_return: summary.total_return,
            trade_count: summary.trade_count,
        }
    }

    /// Score a summary. `span_days` is the calendar length of the replayed
    /// data, used for the trade-frequency damper.
    pub fn score(&self, summary: &Summary, span_days: f64) -> FitnessResult {
        if summary.trade_count == 0
            || summary.win_rate < self.min_win_rate
            || summary.total_return < -self.max_total_loss
        {
            return self.penalized(summary);
        }

        let risk_reward = if summary.avg_loss > 0.0 {
            summary.avg_win / summary.avg_loss
        } else {
            0.0
        };

        let trades_per_month = if span_days > 0.0 {
            summary.trade_count as f64 / (span_days / 30.44)
        } else {
            0.0
        };
        let activity_damper = if trades_per_month < self.min_trades_per_month {
            self.low_activity_damper
        } else if trades_per_month > self.max_trades_per_month {
            self.high_activity_damper
        } else {
            1.0
        };

        let return_score = sigmoid(summary.total_return, 0.0, self.return_scale);
        let sharpe_score = sigmoid(summary.sharpe, 0.0, self.sharpe_scale);
        let profit_score = sigmoid(summary.profit_per_trade, 0.0, self.profit_scale);
        let drawdown_score = 1.0 - (summary.max_drawdown / self.drawdown_tolerance).min(1.0);
        let risk_reward_score = sigmoid(risk_reward, 1.0, 1.0);

        let objective = (self.return_weight * return_score
            + self.win_rate_weight * summary.win_rate
            + self.profit_weight * profit_score
            + self.sharpe_weight * sharpe_score
            + self.drawdown_weight * drawdown_score
            + self.risk_reward_weight * risk_reward_score)
            * activity_damper;

        let objective = if objective.is_finite() {
            objective
        } else {
            self.penalty_fitness
        };

        FitnessResult {
            objective,
            win_rate: summary.win_rate,
            sharpe: summary.sharpe,
            max_drawdown: summary.max_drawdown,
            total_return: summary.total_return,
            trade_count: summary.trade_count,
        }
    }
}

/// Sigmoid normalization to (0, 1).
fn sigmoid(value: f64, center: f64, scale: f64) -> f64 {
    1.0 / (1.0 + (-(value - center) / scale).exp())
}
