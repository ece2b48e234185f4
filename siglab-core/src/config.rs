//! Explicit configuration records for the simulator and signal engine.
//!
//! Nothing here is read from ambient process state: every simulator instance
//! owns its configuration, so concurrent backtests with different settings
//! cannot interfere with each other. Cost rates are configuration constants,
//! not optimized parameters — they must match whatever the live fill
//! estimation uses, or optimized parameters will not reproduce live behavior.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Execution friction applied to every fill, per side.
///
/// All three rates are fractions (0.0003 = 0.03%).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostConfig {
    /// Exchange fee per side.
    pub fee_rate: f64,
    /// Expected slippage per side.
    pub slippage_rate: f64,
    /// Full bid-ask spread; each side pays half.
    pub spread_rate: f64,
}

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            fee_rate: 0.00045,
            slippage_rate: 0.0003,
            spread_rate: 0.0001,
        }
    }
}

/// Account and sizing settings for one simulator instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Margin committed per trade, in quote currency.
    pub margin_per_trade: f64,
    /// Leverage multiplier. Notional per trade = margin × leverage.
    pub leverage: f64,
    /// Starting account balance for the equity curve.
    pub initial_balance: f64,
    pub costs: CostConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            margin_per_trade: 100.0,
            leverage: 10.0,
            initial_balance: 1_000.0,
            costs: CostConfig::default(),
        }
    }
}

impl SimConfig {
    /// Notional position value per trade.
    pub fn notional(&self) -> f64 {
        self.margin_per_trade * self.leverage
    }

    /// Parse from a TOML document and validate.
    pub fn from_toml_str(s: &str) -> Result<Self, CoreError> {
        let config: Self =
            toml::from_str(s).map_err(|e| CoreError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if !(self.margin_per_trade > 0.0) {
            return Err(CoreError::InvalidConfig(
                "margin_per_trade must be positive".into(),
            ));
        }
        if !(self.leverage > 0.0) {
            return Err(CoreError::InvalidConfig("leverage must be positive".into()));
        }
        if !(self.initial_balance > 0.0) {
            return Err(CoreError::InvalidConfig(
                "initial_balance must be positive".into(),
            ));
        }
        let c = &self.costs;
        if c.fee_rate < 0.0 || c.slippage_rate < 0.0 || c.spread_rate < 0.0 {
            return Err(CoreError::InvalidConfig(
                "cost rates must be non-negative".into(),
            ));
        }
        Ok(())
    }
}

/// Lookbacks and cutoffs for the indicator library.
///
/// These are held fixed during an optimization run; only the weights,
/// thresholds, and risk parameters in [`crate::params::ParameterVector`] are
/// searched. Defaults follow common practice for each indicator family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    pub rsi_period: usize,
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,

    pub stochastic_k: usize,
    pub stochastic_d: usize,
    pub stochastic_oversold: f64,
    pub stochastic_overbought: f64,

    pub adx_period: usize,
    pub adx_threshold: f64,

    pub momentum_period: usize,
    pub momentum_threshold: f64,

    pub trend_fast_ema: usize,
    pub trend_slow_ema: usize,
    pub entry_ema_period: usize,

    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    /// Flip mode: conviction only on a histogram sign change. Level mode
    /// otherwise: conviction scales with histogram magnitude.
    pub macd_flip_only: bool,
    pub macd_histogram_threshold: f64,

    pub structure_lookback: usize,

    pub bollinger_period: usize,
    pub bollinger_std: f64,

    pub atr_period: usize,
    /// Minimum ATR-to-price ratio for the market to count as tradable.
    pub atr_min_threshold: f64,

    pub volume_ma_period: usize,
    pub volume_spike_multiplier: f64,
    pub volume_z_period: usize,

    pub sr_lookback: usize,
    /// Fraction of price within which a close counts as touching
    /// support/resistance.
    pub sr_touch_distance: f64,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            rsi_oversold: 30.0,
            rsi_overbought: 70.0,

            stochastic_k: 14,
            stochastic_d: 3,
            stochastic_oversold: 20.0,
            stochastic_overbought: 80.0,

            adx_period: 14,
            adx_threshold: 25.0,

            momentum_period: 10,
            momentum_threshold: 0.005,

            trend_fast_ema: 12,
            trend_slow_ema: 50,
            entry_ema_period: 9,

            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            macd_flip_only: false,
            macd_histogram_threshold: 0.0,

            structure_lookback: 10,

            bollinger_period: 20,
            bollinger_std: 2.0,

            atr_period: 14,
            atr_min_threshold: 0.001,

            volume_ma_period: 20,
            volume_spike_multiplier: 1.5,
            volume_z_period: 20,

            sr_lookback: 50,
            sr_touch_distance: 0.001,
        }
    }
}

impl IndicatorConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, CoreError> {
        let config: Self =
            toml::from_str(s).map_err(|e| CoreError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.trend_fast_ema >= self.trend_slow_ema {
            return Err(CoreError::InvalidConfig(
                "trend_fast_ema must be shorter than trend_slow_ema".into(),
            ));
        }
        if self.macd_fast >= self.macd_slow {
            return Err(CoreError::InvalidConfig(
                "macd_fast must be shorter than macd_slow".into(),
            ));
        }
        if self.rsi_oversold >= self.rsi_overbought {
            return Err(CoreError::InvalidConfig(
                "rsi_oversold must be below rsi_overbought".into(),
            ));
        }
        if self.stochastic_oversold >= self.stochastic_overbought {
            return Err(CoreError::InvalidConfig(
                "stochastic_oversold must be below stochastic_overbought".into(),
            ));
        }
        for (name, period) in [
            ("rsi_period", self.rsi_period),
            ("stochastic_k", self.stochastic_k),
            ("stochastic_d", self.stochastic_d),
            ("adx_period", self.adx_period),
            ("momentum_period", self.momentum_period),
            ("trend_fast_ema", self.trend_fast_ema),
            ("entry_ema_period", self.entry_ema_period),
            ("macd_signal", self.macd_signal),
            ("structure_lookback", self.structure_lookback),
            ("bollinger_period", self.bollinger_period),
            ("atr_period", self.atr_period),
            ("volume_ma_period", self.volume_ma_period),
            ("volume_z_period", self.volume_z_period),
            ("sr_lookback", self.sr_lookback),
        ] {
            if period == 0 {
                return Err(CoreError::InvalidConfig(format!("{name} must be >= 1")));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_sim_config_is_valid() {
        assert!(SimConfig::default().validate().is_ok());
    }

    #[test]
    fn notional_is_margin_times_leverage() {
        let config = SimConfig::default();
        assert!((config.notional() - 1_000.0).abs() < 1e-12);
    }

    #[test]
    fn sim_config_from_toml() {
        let toml = r#"
            margin_per_trade = 250.0
            leverage = 5.0
            initial_balance = 10000.0

            [costs]
            fee_rate = 0.0004
            slippage_rate = 0.0002
            spread_rate = 0.0001
        "#;
        let config = SimConfig::from_toml_str(toml).unwrap();
        assert!((config.notional() - 1_250.0).abs() < 1e-12);
        assert!((config.costs.fee_rate - 0.0004).abs() < 1e-12);
    }

    #[test]
    fn sim_config_rejects_negative_fee() {
        let toml = r#"
            [costs]
            fee_rate = -0.1
        "#;
        assert!(SimConfig::from_toml_str(toml).is_err());
    }

    #[test]
    fn sim_config_partial_toml_uses_defaults() {
        let config = SimConfig::from_toml_str("leverage = 3.0").unwrap();
        assert!((config.leverage - 3.0).abs() < 1e-12);
        assert!((config.margin_per_trade - 100.0).abs() < 1e-12);
    }

    #[test]
    fn indicator_config_default_is_valid() {
        assert!(IndicatorConfig::default().validate().is_ok());
    }

    #[test]
    fn indicator_config_rejects_inverted_emas() {
        let config = IndicatorConfig {
            trend_fast_ema: 50,
            trend_slow_ema: 12,
            ..IndicatorConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
