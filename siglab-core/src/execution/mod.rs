//! Execution cost model — fee, slippage, and spread folded into fill prices.
//!
//! Costs are directional: the realized price always worsens against the
//! trader. Buys pay up, sells receive less. Rates are configuration
//! constants shared between backtest and live fill estimation; optimizing
//! against one cost assumption and trading under another would make the
//! fitness meaningless.

use serde::{Deserialize, Serialize};

use crate::config::CostConfig;

/// Which way the order crosses the book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostModel {
    fee_rate: f64,
    slippage_rate: f64,
    spread_rate: f64,
}

impl CostModel {
    pub fn new(config: &CostConfig) -> Self {
        Self {
            fee_rate: config.fee_rate,
            slippage_rate: config.slippage_rate,
            spread_rate: config.spread_rate,
        }
    }

    pub fn frictionless() -> Self {
        Self {
            fee_rate: 0.0,
            slippage_rate: 0.0,
            spread_rate: 0.0,
        }
    }

    /// Total one-sided friction: fee + slippage + half the spread.
    pub fn per_side_rate(&self) -> f64 {
        self.fee_rate + self.slippage_rate + self.spread_rate / 2.0
    }

    /// Realized fill price for a nominal price.
    ///
    /// Buy: `nominal × (1 + rate)`. Sell: `nominal × (1 − rate)`.
    pub fn fill_price(&self, nominal: f64, side: OrderSide) -> f64 {
        let rate = self.per_side_rate();
        match side {
            OrderSide::Buy => nominal * (1.0 + rate),
            OrderSide::Sell => nominal * (1.0 - rate),
        }
    }
}
