//! Backtest simulator — deterministic bar-by-bar replay.
//!
//! One instrument, one position at a time, a {FLAT, LONG, SHORT} state
//! machine driven by the signal engine and gated by risk rules that run
//! *before* the engine is consulted:
//!
//! 1. stop loss — at the bar's worst-case intrabar price touching the stop
//!    (a gap through the stop fills at the open);
//! 2. take profit — at the target price, never assuming better;
//! 3. holding-time limit — at the close;
//! 4. daily trade cap — opens downgrade to hold for the rest of that UTC
//!    day, closes still honored;
//! 5. otherwise the signal engine decides.
//!
//! Fills pass through the cost model on both sides. After the final bar any
//! open position is force-closed at the last close (`EndOfData`), so every
//! run produces a complete ledger. A bar that closes a position never also
//! opens one, and no position is opened on the final bar.
//!
//! Runs are pure: no shared state survives between calls, which is what
//! makes population-level evaluation safe to parallelize.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::{IndicatorConfig, SimConfig};
use crate::domain::{validate_series, Bar, ExitReason, Ledger, Position, Side, Trade};
use crate::error::CoreError;
use crate::execution::{CostModel, OrderSide};
use crate::indicators::{build_all, Indicator, IndicatorValues};
use crate::params::{ParameterSpace, ParameterVector};
use crate::signal::{Decision, SignalEngine};

/// Everything one backtest run produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestReport {
    pub ledger: Ledger,
    /// Mark-to-market equity after each bar (realized balance plus open
    /// unrealized P&L).
    pub equity: Vec<f64>,
    pub initial_balance: f64,
    pub final_balance: f64,
}

/// The simulator. Construct once, run many parameter vectors against the
/// same bars — `run` borrows immutably and keeps no state between calls.
pub struct Simulator {
    config: SimConfig,
    space: ParameterSpace,
    indicators: Vec<Box<dyn Indicator>>,
    signal: SignalEngine,
    costs: CostModel,
}

impl Simulator {
    pub fn new(config: SimConfig, indicator_config: &IndicatorConfig) -> Result<Self, CoreError> {
        config.validate()?;
        indicator_config.validate()?;
        Ok(Self {
            costs: CostModel::new(&config.costs),
            indicators: build_all(indicator_config),
            signal: SignalEngine::new(),
            space: ParameterSpace::default(),
            config,
        })
    }

    /// Replace the parameter space used for validation.
    pub fn with_space(mut self, space: ParameterSpace) -> Self {
        self.space = space;
        self
    }

    pub fn space(&self) -> &ParameterSpace {
        &self.space
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Validate bars and precompute every indicator series over them.
    ///
    /// Indicator lookbacks are fixed per simulator, so one precompute can be
    /// shared across every candidate evaluated against the same bars.
    pub fn precompute(&self, bars: &[Bar]) -> Result<IndicatorValues, CoreError> {
        validate_series(bars)?;
        Ok(IndicatorValues::compute(&self.indicators, bars))
    }

    /// Validate, precompute, and replay.
    pub fn run(
        &self,
        bars: &[Bar],
        params: &ParameterVector,
    ) -> Result<BacktestReport, CoreError> {
        let values = self.precompute(bars)?;
        self.run_with_values(bars, &values, params)
    }

    /// Replay bars against precomputed indicator values.
    ///
    /// `values` must be aligned 1:1 with `bars` (as produced by
    /// [`Simulator::precompute`]).
    pub fn run_with_values(
        &self,
        bars: &[Bar],
        values: &IndicatorValues,
        params: &ParameterVector,
    ) -> Result<BacktestReport, CoreError> {
        validate_series(bars)?;
        params.validate(&self.space)?;

        let n = bars.len();
        let notional = self.config.notional();
        let mut balance = self.config.initial_balance;
        let mut equity = Vec::with_capacity(n);
        let mut ledger = Ledger::new();
        let mut position: Option<Position> = None;
        let mut trade_day: Option<NaiveDate> = None;
        let mut trades_today: usize = 0;

        for (i, bar) in bars.iter().enumerate() {
            let day = bar.timestamp.date_naive();
            if trade_day != Some(day) {
                trade_day = Some(day);
                trades_today = 0;
            }

            if let Some(pos) = position.as_mut() {
                if pos.entry_index < i {
                    pos.bars_held = i - pos.entry_index;
                }
            }

            // Risk gates first, then the signal engine. Positions opened at
            // this bar's close cannot exit on the same bar's range.
            let mut pending_exit: Option<(ExitReason, f64)> = None;
            if let Some(pos) = &position {
                if pos.entry_index < i {
                    pending_exit = risk_exit(pos, bar, params);
                    if pending_exit.is_none() {
                        let eval = self.signal.evaluate(values, i, params, Some(pos.side));
                        if let Decision::Close(reason) = eval.decision {
                            pending_exit = Some((reason, bar.close));
                        }
                    }
                }
            }

            let mut closed_this_bar = false;
            if let Some((reason, nominal)) = pending_exit {
                if let Some(pos) = position.take() {
                    let trade = self.close_position(&pos, i, bar, reason, nominal);
                    balance += trade.net_pnl;
                    ledger.push(trade);
                    closed_this_bar = true;
                }
            }

            // Entries: only when flat, not on a bar that just closed, never
            // on the final bar, and only under the daily cap.
            if position.is_none()
                && !closed_this_bar
                && i + 1 < n
                && trades_today < params.max_daily_trades
            {
                let eval = self.signal.evaluate(values, i, params, None);
                let side = match eval.decision {
                    Decision::OpenLong => Some(Side::Long),
                    Decision::OpenShort => Some(Side::Short),
                    _ => None,
                };
                if let Some(side) = side {
                    position =
                        Some(self.open_position(side, i, bar, eval.composite, notional, params));
                    trades_today += 1;
                }
            }

            let marked = balance
                + position
                    .as_ref()
                    .map(|p| p.unrealized_pnl(bar.close))
                    .unwrap_or(0.0);
            equity.push(marked);
        }

        // Force-close anything still open at the final bar.
        if let Some(pos) = position.as_ref() {
            let last = n - 1;
            let trade =
                self.close_position(pos, last, &bars[last], ExitReason::EndOfData, bars[last].close);
            balance += trade.net_pnl;
            ledger.push(trade);
            if let Some(e) = equity.last_mut() {
                *e = balance;
            }
        }

        Ok(BacktestReport {
            ledger,
            equity,
            initial_balance: self.config.initial_balance,
            final_balance: balance,
        })
    }

    fn open_position(
        &self,
        side: Side,
        index: usize,
        bar: &Bar,
        composite: f64,
        notional: f64,
        params: &ParameterVector,
    ) -> Position {
        let entry_side = match side {
            Side::Long => OrderSide::Buy,
            Side::Short => OrderSide::Sell,
        };
        let entry_fill = self.costs.fill_price(bar.close, entry_side);
        let (take_profit_price, stop_loss_price) = match side {
            Side::Long => (
                entry_fill * (1.0 + params.take_profit_pct),
                entry_fill * (1.0 - params.stop_loss_pct),
            ),
            Side::Short => (
                entry_fill * (1.0 - params.take_profit_pct),
                entry_fill * (1.0 + params.stop_loss_pct),
            ),
        };
        Position {
            side,
            entry_price: entry_fill,
            entry_index: index,
            entry_time: bar.timestamp,
            notional,
            take_profit_price,
            stop_loss_price,
            entry_signal: composite,
            bars_held: 0,
        }
    }

    fn close_position(
        &self,
        pos: &Position,
        exit_index: usize,
        bar: &Bar,
        reason: ExitReason,
        nominal: f64,
    ) -> Trade {
        let exit_side = match pos.side {
            Side::Long => OrderSide::Sell,
            Side::Short => OrderSide::Buy,
        };
        let exit_fill = self.costs.fill_price(nominal, exit_side);
        let return_pct = pos.side.sign() * (exit_fill - pos.entry_price) / pos.entry_price;
        Trade {
            side: pos.side,
            entry_index: pos.entry_index,
            entry_time: pos.entry_time,
            entry_price: pos.entry_price,
            exit_index,
            exit_time: bar.timestamp,
            exit_price: exit_fill,
            notional: pos.notional,
            return_pct,
            net_pnl: return_pct * pos.notional,
            entry_signal: pos.entry_signal,
            exit_reason: reason,
            bars_held: exit_index - pos.entry_index,
        }
    }
}

/// Risk gates, in order: stop loss, take profit, holding-time limit.
/// Returns the exit reason and the *nominal* exit price (pre-cost).
fn risk_exit(pos: &Position, bar: &Bar, params: &ParameterVector) -> Option<(ExitReason, f64)> {
    match pos.side {
        Side::Long => {
            if bar.low <= pos.stop_loss_price {
                return Some((ExitReason::StopLoss, bar.open.min(pos.stop_loss_price)));
            }
            if bar.high >= pos.take_profit_price {
                return Some((ExitReason::TakeProfit, pos.take_profit_price));
            }
        }
        Side::Short => {
            if bar.high >= pos.stop_loss_price {
                return Some((ExitReason::StopLoss, bar.open.max(pos.stop_loss_price)));
            }
            if bar.low <= pos.take_profit_price {
                return Some((ExitReason::TakeProfit, pos.take_profit_price));
            }
        }
    }
    if pos.bars_held >= params.max_holding_bars {
        return Some((ExitReason::TimeLimit, bar.close));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{make_bars, IndicatorId};

    fn flat_bars(n: usize) -> Vec<Bar> {
        make_bars(&vec![100.0; n])
    }

    /// Simulator with frictionless costs for arithmetic-friendly assertions.
    fn frictionless_sim() -> Simulator {
        let config = SimConfig {
            costs: crate::config::CostConfig {
                fee_rate: 0.0,
                slippage_rate: 0.0,
                spread_rate: 0.0,
            },
            ..SimConfig::default()
        };
        Simulator::new(config, &IndicatorConfig::default()).unwrap()
    }

    /// Parameter vector routing the composite through a single indicator.
    fn single_driver_params() -> ParameterVector {
        let space = ParameterSpace::default();
        let mut params = space.decode(&vec![0.5; space.dim()]);
        for &id in IndicatorId::ALL.iter() {
            params.weights.insert(id, 0.0);
        }
        params.weights.insert(IndicatorId::Momentum, 1.0);
        params.entry_threshold = 0.5;
        params.take_profit_pct = 0.05;
        params.stop_loss_pct = 0.04;
        params.max_holding_bars = 500;
        params.max_daily_trades = 50;
        params
    }

    /// Conviction series → IndicatorValues driving the composite directly.
    fn driver(convictions: Vec<f64>) -> IndicatorValues {
        let mut values = IndicatorValues::new();
        values.insert(IndicatorId::Momentum, convictions);
        values
    }

    #[test]
    fn open_then_opposing_close_is_one_trade() {
        let bars = flat_bars(8);
        let mut conv = vec![0.0; 8];
        conv[2] = 1.0; // open long
        conv[5] = -1.0; // opposing close
        let sim = frictionless_sim();
        let report = sim
            .run_with_values(&bars, &driver(conv), &single_driver_params())
            .unwrap();
        assert_eq!(report.ledger.len(), 1);
        let trade = &report.ledger.trades()[0];
        assert_eq!(trade.side, Side::Long);
        assert_eq!(trade.entry_index, 2);
        assert_eq!(trade.exit_index, 5);
        assert_eq!(trade.exit_reason, ExitReason::OpposingSignal);
        assert!(trade.exit_time > trade.entry_time);
    }

    #[test]
    fn closing_bar_does_not_reopen() {
        let bars = flat_bars(8);
        let mut conv = vec![0.0; 8];
        conv[2] = 1.0;
        conv[5] = -1.0; // would be an OpenShort if the trader were flat
        let sim = frictionless_sim();
        let report = sim
            .run_with_values(&bars, &driver(conv), &single_driver_params())
            .unwrap();
        // Exactly one trade: the close at bar 5 does not flip into a short.
        assert_eq!(report.ledger.len(), 1);
    }

    #[test]
    fn entry_pays_costs() {
        let config = SimConfig::default();
        let sim = Simulator::new(config, &IndicatorConfig::default()).unwrap();
        let bars = flat_bars(6);
        let mut conv = vec![0.0; 6];
        conv[1] = 1.0;
        let report = sim
            .run_with_values(&bars, &driver(conv), &single_driver_params())
            .unwrap();
        let trade = &report.ledger.trades()[0]; // end-of-data close
        assert!(trade.entry_price > 100.0, "long entry must pay up");
        assert!(trade.exit_price < 100.0, "long exit must receive less");
        assert!(trade.net_pnl < 0.0, "round trip on a flat price loses the costs");
    }

    #[test]
    fn still_open_position_closes_at_end_of_data() {
        let bars = flat_bars(6);
        let mut conv = vec![0.0; 6];
        conv[3] = 1.0;
        let sim = frictionless_sim();
        let report = sim
            .run_with_values(&bars, &driver(conv), &single_driver_params())
            .unwrap();
        assert_eq!(report.ledger.len(), 1);
        let trade = &report.ledger.trades()[0];
        assert_eq!(trade.exit_reason, ExitReason::EndOfData);
        assert_eq!(trade.exit_index, 5);
    }

    #[test]
    fn no_entry_on_final_bar() {
        let bars = flat_bars(6);
        let mut conv = vec![0.0; 6];
        conv[5] = 1.0;
        let sim = frictionless_sim();
        let report = sim
            .run_with_values(&bars, &driver(conv), &single_driver_params())
            .unwrap();
        assert!(report.ledger.is_empty());
    }

    #[test]
    fn daily_cap_suppresses_opens() {
        // Alternating signals produce one trade per two bars; cap at 5.
        let bars = flat_bars(40);
        let conv: Vec<f64> = (0..40)
            .map(|i| if i % 2 == 0 { 1.0 } else { -1.0 })
            .collect();
        let mut params = single_driver_params();
        params.max_daily_trades = 5;
        let sim = frictionless_sim();
        let report = sim.run_with_values(&bars, &driver(conv), &params).unwrap();
        // 40 five-minute bars sit inside one UTC day → the cap binds.
        assert_eq!(report.ledger.len(), 5);
    }

    #[test]
    fn time_limit_closes_position() {
        let bars = flat_bars(12);
        let mut conv = vec![0.0; 12];
        conv[1] = 1.0;
        let mut params = single_driver_params();
        params.max_holding_bars = 4;
        let sim = frictionless_sim();
        let report = sim.run_with_values(&bars, &driver(conv), &params).unwrap();
        assert_eq!(report.ledger.len(), 1);
        let trade = &report.ledger.trades()[0];
        assert_eq!(trade.exit_reason, ExitReason::TimeLimit);
        assert_eq!(trade.bars_held, 4);
    }

    #[test]
    fn stop_loss_fills_at_worst_case_gap() {
        let mut bars = flat_bars(8);
        // Long from bar 1 at ~100. Bar 4 gaps down through the stop.
        bars[4].open = 90.0;
        bars[4].high = 91.0;
        bars[4].low = 89.0;
        bars[4].close = 90.5;
        // keep the series sane for bar 5 onward
        for bar in bars.iter_mut().skip(5) {
            bar.open = 90.5;
            bar.high = 91.5;
            bar.low = 89.5;
            bar.close = 90.5;
        }
        let mut conv = vec![0.0; 8];
        conv[1] = 1.0;
        let sim = frictionless_sim();
        let report = sim
            .run_with_values(&bars, &driver(conv), &single_driver_params())
            .unwrap();
        let trade = &report.ledger.trades()[0];
        assert_eq!(trade.exit_reason, ExitReason::StopLoss);
        assert_eq!(trade.exit_index, 4);
        // Gap through the stop: fill at the open (90), worse than the stop price.
        assert!((trade.exit_price - 90.0).abs() < 1e-9);
    }

    #[test]
    fn take_profit_fills_at_target() {
        let mut bars = flat_bars(8);
        bars[4].high = 107.0; // spikes through the 5% target
        bars[4].close = 104.0;
        bars[4].open = 100.0;
        for bar in bars.iter_mut().skip(5) {
            bar.open = 104.0;
            bar.high = 105.0;
            bar.low = 103.0;
            bar.close = 104.0;
        }
        let mut conv = vec![0.0; 8];
        conv[1] = 1.0;
        let sim = frictionless_sim();
        let report = sim
            .run_with_values(&bars, &driver(conv), &single_driver_params())
            .unwrap();
        let trade = &report.ledger.trades()[0];
        assert_eq!(trade.exit_reason, ExitReason::TakeProfit);
        // Fill exactly at the target, never better.
        assert!((trade.exit_price - 105.0).abs() < 1e-9);
        assert!((trade.net_pnl - 50.0).abs() < 1e-9); // 5% × 1000 notional
    }

    #[test]
    fn rejects_invalid_params() {
        let bars = flat_bars(6);
        let mut params = single_driver_params();
        params.entry_threshold = 10.0; // outside the declared space
        let sim = frictionless_sim();
        let err = sim.run(&bars, &params).unwrap_err();
        assert!(matches!(err, CoreError::InvalidParameter { .. }));
    }

    #[test]
    fn rejects_non_monotonic_bars() {
        let mut bars = flat_bars(6);
        bars[3].timestamp = bars[1].timestamp;
        let sim = frictionless_sim();
        let err = sim.run(&bars, &single_driver_params()).unwrap_err();
        assert!(matches!(err, CoreError::DataIntegrity { .. }));
    }

    #[test]
    fn equity_curve_tracks_balance() {
        let bars = flat_bars(8);
        let mut conv = vec![0.0; 8];
        conv[2] = 1.0;
        conv[5] = -1.0;
        let sim = frictionless_sim();
        let report = sim
            .run_with_values(&bars, &driver(conv), &single_driver_params())
            .unwrap();
        assert_eq!(report.equity.len(), 8);
        // Flat prices, frictionless: equity never moves off the initial balance.
        for &e in &report.equity {
            assert!((e - 1_000.0).abs() < 1e-9);
        }
        assert!((report.final_balance - 1_000.0).abs() < 1e-9);
    }

    #[test]
    fn run_is_deterministic() {
        let closes: Vec<f64> = (0..300)
            .map(|i| 100.0 + (i as f64 * 0.17).sin() * 6.0)
            .collect();
        let bars = make_bars(&closes);
        let space = ParameterSpace::default();
        let params = space.decode(&vec![0.7; space.dim()]);
        let sim = Simulator::new(SimConfig::default(), &IndicatorConfig::default()).unwrap();
        let a = sim.run(&bars, &params).unwrap();
        let b = sim.run(&bars, &params).unwrap();
        assert_eq!(a.ledger, b.ledger);
        assert_eq!(a.equity, b.equity);
    }
}
