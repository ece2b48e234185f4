//! Open position state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Direction of an open position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// +1 for long, -1 for short. Lets P&L math stay branch-free.
    pub fn sign(&self) -> f64 {
        match self {
            Side::Long => 1.0,
            Side::Short => -1.0,
        }
    }
}

/// One open position. At most one exists per instrument at any time; the
/// simulator owns it between an open fill and the matching close fill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub side: Side,
    /// Cost-adjusted entry fill price.
    pub entry_price: f64,
    pub entry_index: usize,
    pub entry_time: DateTime<Utc>,
    /// Notional value (margin × leverage) at entry.
    pub notional: f64,
    /// Price at which the unrealized gain reaches take_profit_pct.
    pub take_profit_price: f64,
    /// Price at which the unrealized loss reaches stop_loss_pct.
    pub stop_loss_price: f64,
    /// Composite signal at entry, kept for the trade record.
    pub entry_signal: f64,
    /// Completed bars since entry.
    pub bars_held: usize,
}

impl Position {
    /// Unrealized P&L fraction at a given mark price.
    pub fn unrealized_return(&self, price: f64) -> f64 {
        self.side.sign() * (price - self.entry_price) / self.entry_price
    }

    /// Unrealized P&L in quote currency at a given mark price.
    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.unrealized_return(price) * self.notional
    }
}
