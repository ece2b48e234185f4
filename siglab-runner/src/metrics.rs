//! Performance metrics — pure functions from a backtest report to statistics.
//!
//! Every metric tolerates a degenerate ledger: zero or one trades report
//! zeros rather than raising, and the fitness layer decides how harshly to
//! treat inactivity.

use serde::{Deserialize, Serialize};

use siglab_core::domain::Trade;
use siglab_core::engine::BacktestReport;

/// Metric settings that are configuration, not search dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Multiplier under the square root in the Sharpe ratio. 1.0 reports the
    /// raw per-trade Sharpe; set to an estimated trades-per-year figure to
    /// annualize.
    pub annualization_factor: f64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            annualization_factor: 1.0,
        }
    }
}

/// Aggregate statistics for one backtest run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    /// Fraction of trades with positive net P&L.
    pub win_rate: f64,
    /// (final − initial) / initial.
    pub total_return: f64,
    /// Mean trade return / std-dev of trade returns × √annualization.
    pub sharpe: f64,
    /// Largest peak-to-trough decline of the equity curve, as a positive
    /// fraction (0.18 = an 18% drawdown).
    pub max_drawdown: f64,
    /// Gross profits / gross losses, capped at 100.
    pub profit_factor: f64,
    /// Mean fractional return of winning trades.
    pub avg_win: f64,
    /// Mean absolute fractional return of losing trades.
    pub avg_loss: f64,
    /// Mean net P&L per trade, in quote currency.
    pub profit_per_trade: f64,
    pub trade_count: usize,
}

impl Summary {
    pub fn compute(report: &BacktestReport, config: &MetricsConfig) -> Self {
        let trades = report.ledger.trades();
        Self {
            win_rate: win_rate(trades),
            total_return: total_return(report),
            sharpe: sharpe_ratio(trades, config.annualization_factor),
            max_drawdown: max_drawdown(&report.equity),
            profit_factor: profit_factor(trades),
            avg_win: avg_win(trades),
            avg_loss: avg_loss(trades),
            profit_per_trade: profit_per_trade(trades),
            trade_count: trades.len(),
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

pub fn win_rate(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let winners = trades.iter().filter(|t| t.is_winner()).count();
    winners as f64 / trades.len() as f64
}

pub fn total_return(report: &BacktestReport) -> f64 {
    if report.initial_balance <= 0.0 {
        return 0.0;
    }
    (report.final_balance - report.initial_balance) / report.initial_balance
}

/// Sharpe from per-trade returns. Zero for fewer than two trades or zero
/// variance.
pub fn sharpe_ratio(trades: &[Trade], annualization_factor: f64) -> f64 {
    if trades.len() < 2 {
        return 0.0;
    }
    let returns: Vec<f64> = trades.iter().map(|t| t.return_pct).collect();
    let mean = mean(&returns);
    let std = std_dev(&returns);
    if std < 1e-15 {
        return 0.0;
    }
    (mean / std) * annualization_factor.max(0.0).sqrt()
}

/// Largest peak-to-trough decline, as a positive fraction.
pub fn max_drawdown(equity: &[f64]) -> f64 {
    if equity.len() < 2 {
        return 0.0;
    }
    let mut peak = equity[0];
    let mut max_dd = 0.0_f64;
    for &e in equity {
        if e > peak {
            peak = e;
        }
        if peak > 0.0 {
            let dd = (peak - e) / peak;
            if dd > max_dd {
                max_dd = dd;
            }
        }
    }
    max_dd
}

/// Gross profits / gross losses, capped at 100 when losses vanish.
pub fn profit_factor(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let gross_profit: f64 = trades
        .iter()
        .filter(|t| t.net_pnl > 0.0)
        .map(|t| t.net_pnl)
        .sum();
    let gross_loss: f64 = trades
        .iter()
        .filter(|t| t.net_pnl < 0.0)
        .map(|t| t.net_pnl.abs())
        .sum();
    if gross_loss < 1e-10 {
        return if gross_profit > 0.0 { 100.0 } else { 0.0 };
    }
    (gross_profit / gross_loss).min(100.0)
}

pub fn avg_win(trades: &[Trade]) -> f64 {
    let wins: Vec<f64> = trades
        .iter()
        .filter(|t| t.is_winner())
        .map(|t| t.return_pct)
        .collect();
    if wins.is_empty() {
        0.0
    } else {
        mean(&wins)
    }
}

pub fn avg_loss(trades: &[Trade]) -> f64 {
    let losses: Vec<f64> = trades
        .iter()
        .filter(|t| !t.is_winner())
        .map(|t| t.return_pct.abs())
        .collect();
    if losses.is_empty() {
        0.0
    } else {
        mean(&losses)
    }
}

pub fn profit_per_trade(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    trades.iter().map(|t| t.net_pnl).sum::<f64>() / trades.len() as f64
}

// ─── Helpers ────────────────────────────────────────────────────────

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance =
        values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}
