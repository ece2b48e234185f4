//! End-to-end simulator scenarios over the public API.

use chrono::TimeZone;

use siglab_core::config::{CostConfig, IndicatorConfig, SimConfig};
use siglab_core::domain::{Bar, ExitReason, Side};
use siglab_core::engine::Simulator;
use siglab_core::indicators::{IndicatorId, IndicatorValues};
use siglab_core::params::{ParameterSpace, ParameterVector};
use siglab_core::signal::SignalEngine;

fn make_bars(closes: &[f64]) -> Vec<Bar> {
    let base = chrono::Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                timestamp: base + chrono::Duration::minutes(5 * i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1_000.0,
            }
        })
        .collect()
}

fn frictionless_sim() -> Simulator {
    let config = SimConfig {
        costs: CostConfig {
            fee_rate: 0.0,
            slippage_rate: 0.0,
            spread_rate: 0.0,
        },
        ..SimConfig::default()
    };
    Simulator::new(config, &IndicatorConfig::default()).unwrap()
}

/// Parameters that route the composite through a single injected series.
fn driver_params() -> ParameterVector {
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

fn driver(convictions: Vec<f64>) -> IndicatorValues {
    let mut values = IndicatorValues::new();
    values.insert(IndicatorId::Momentum, convictions);
    values
}

#[test]
fn crossing_up_at_10_and_down_at_15_yields_exactly_one_trade() {
    let bars = make_bars(&vec![100.0; 20]);
    let mut conv = vec![0.0; 20];
    conv[10] = 0.9; // composite crosses +entry_threshold
    conv[15] = -0.9; // composite falls below -entry_threshold
    let sim = frictionless_sim();
    let report = sim
        .run_with_values(&bars, &driver(conv), &driver_params())
        .unwrap();

    assert_eq!(report.ledger.len(), 1);
    let trade = &report.ledger.trades()[0];
    assert_eq!(trade.side, Side::Long);
    assert_eq!(trade.entry_index, 10);
    assert_eq!(trade.exit_index, 15);
    assert_eq!(trade.exit_reason, ExitReason::OpposingSignal);
}

#[test]
fn stop_loss_fires_at_the_touching_bar_never_later() {
    let mut closes = vec![100.0; 20];
    // Drift down: crosses the 4% stop (96 on a 100 entry) at bar 8.
    closes[6] = 99.0;
    closes[7] = 98.0;
    closes[8] = 95.0;
    for c in closes.iter_mut().skip(9) {
        *c = 94.0; // keeps falling afterwards
    }
    let bars = make_bars(&closes);
    let mut conv = vec![0.0; 20];
    conv[2] = 0.9;
    // An opposing signal arrives later than the stop; it must not matter.
    conv[12] = -0.9;
    let sim = frictionless_sim();
    let report = sim
        .run_with_values(&bars, &driver(conv), &driver_params())
        .unwrap();

    let trade = &report.ledger.trades()[0];
    assert_eq!(trade.exit_reason, ExitReason::StopLoss);
    assert_eq!(
        trade.exit_index, 8,
        "stop must close at the bar whose range touches it"
    );
}

#[test]
fn all_warmup_run_produces_zero_trades_and_zero_composite() {
    // 5 bars is shorter than every indicator's lookback: every series is
    // all-NaN, the composite is 0 at every bar, and nothing trades.
    let bars = make_bars(&[100.0, 101.0, 100.5, 101.5, 100.0]);
    let space = ParameterSpace::default();
    // All weights active so every (unavailable) indicator is consulted.
    let params = space.decode(&vec![0.9; space.dim()]);
    let sim = frictionless_sim();

    let values = sim.precompute(&bars).unwrap();
    let engine = SignalEngine::new();
    for i in 0..bars.len() {
        assert_eq!(engine.composite(&values, i, &params), 0.0);
    }

    let report = sim.run_with_values(&bars, &values, &params).unwrap();
    assert!(report.ledger.is_empty());
    assert!((report.final_balance - sim.config().initial_balance).abs() < 1e-12);
}

#[test]
fn daily_trade_cap_resets_on_the_next_utc_day() {
    // 5-minute bars: 288 per day. Alternate open/close signals all the way.
    let n = 600; // a bit over two days
    let bars = make_bars(&vec![100.0; n]);
    let conv: Vec<f64> = (0..n).map(|i| if i % 2 == 0 { 0.9 } else { -0.9 }).collect();
    let mut params = driver_params();
    params.max_daily_trades = 5;
    let sim = frictionless_sim();
    let report = sim.run_with_values(&bars, &driver(conv), &params).unwrap();

    // 5 trades on each of day 1, day 2, and the partial day 3.
    assert_eq!(report.ledger.len(), 15);
    let entry_days: Vec<_> = report
        .ledger
        .trades()
        .iter()
        .map(|t| t.entry_time.date_naive())
        .collect();
    let mut per_day = std::collections::BTreeMap::new();
    for day in entry_days {
        *per_day.entry(day).or_insert(0usize) += 1;
    }
    assert_eq!(per_day.len(), 3);
    assert!(per_day.values().all(|&count| count == 5));
}

#[test]
fn ledger_invariants_hold_on_a_busy_run() {
    let closes: Vec<f64> = (0..800)
        .map(|i| 100.0 + (i as f64 * 0.23).sin() * 7.0 + (i as f64 * 0.041).cos() * 3.0)
        .collect();
    let bars = make_bars(&closes);
    let space = ParameterSpace::default();
    let params = space.decode(&vec![0.35; space.dim()]);
    let sim = Simulator::new(SimConfig::default(), &IndicatorConfig::default()).unwrap();
    let report = sim.run(&bars, &params).unwrap();

    let trades = report.ledger.trades();
    for trade in trades {
        assert!(trade.exit_time > trade.entry_time);
        assert!(trade.exit_index > trade.entry_index);
        assert_eq!(trade.bars_held, trade.exit_index - trade.entry_index);
    }
    // One position at a time: trades never overlap.
    for pair in trades.windows(2) {
        assert!(pair[1].entry_index >= pair[0].exit_index);
    }
    // Final balance reconciles with the ledger.
    let expected = sim.config().initial_balance + report.ledger.total_pnl();
    assert!((report.final_balance - expected).abs() < 1e-6);
}

#[test]
fn reloaded_parameters_reproduce_the_identical_report() {
    let closes: Vec<f64> = (0..400)
        .map(|i| 100.0 + (i as f64 * 0.19).sin() * 5.0)
        .collect();
    let bars = make_bars(&closes);
    let space = ParameterSpace::default();
    let params = space.decode(&vec![0.62; space.dim()]);
    let sim = Simulator::new(SimConfig::default(), &IndicatorConfig::default()).unwrap();

    let json = serde_json::to_string(&params).unwrap();
    let reloaded: ParameterVector = serde_json::from_str(&json).unwrap();
    assert_eq!(params, reloaded);

    let a = sim.run(&bars, &params).unwrap();
    let b = sim.run(&bars, &reloaded).unwrap();
    assert_eq!(a.ledger, b.ledger);
    assert_eq!(a.final_balance.to_bits(), b.final_balance.to_bits());
}
