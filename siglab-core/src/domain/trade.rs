//! Trade — a completed round trip, and why it ended.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::position::Side;

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    TakeProfit,
    StopLoss,
    TimeLimit,
    OpposingSignal,
    /// Synthetic close at the final bar so every run yields a complete ledger.
    EndOfData,
}

/// Immutable record of one entry → exit round trip.
///
/// Fill prices already include execution costs, so `net_pnl` needs no
/// further fee accounting. Invariant: `exit_time > entry_time`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub side: Side,
    pub entry_index: usize,
    pub entry_time: DateTime<Utc>,
    pub entry_price: f64,
    pub exit_index: usize,
    pub exit_time: DateTime<Utc>,
    pub exit_price: f64,
    pub notional: f64,
    /// Signed fractional return between cost-adjusted fills.
    pub return_pct: f64,
    /// `return_pct × notional`, in quote currency.
    pub net_pnl: f64,
    /// Composite signal strength when the position was opened.
    pub entry_signal: f64,
    pub exit_reason: ExitReason,
    pub bars_held: usize,
}

impl Trade {
    pub fn is_winner(&self) -> bool {
        self.net_pnl > 0.0
    }
}
