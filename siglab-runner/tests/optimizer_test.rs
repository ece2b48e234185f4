//! End-to-end optimizer runs over synthetic bars.

use chrono::TimeZone;

use siglab_core::config::{IndicatorConfig, SimConfig};
use siglab_core::domain::Bar;
use siglab_core::engine::Simulator;

use siglab_runner::artifact::{run_fingerprint, InstrumentRecord, ParamArtifact};
use siglab_runner::fitness::FitnessConfig;
use siglab_runner::metrics::{MetricsConfig, Summary};
use siglab_runner::optimizer::{Optimizer, OptimizerConfig, StopReason};

/// A wavy, mean-reverting price path with enough range to trigger entries
/// and exits.
fn synthetic_bars(n: usize) -> Vec<Bar> {
    let base = chrono::Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap();
    (0..n)
        .map(|i| {
            let t = i as f64;
            let close = 100.0 + (t * 0.13).sin() * 9.0 + (t * 0.031).cos() * 4.0;
            let open = if i == 0 {
                close
            } else {
                let p = (i - 1) as f64;
                100.0 + (p * 0.13).sin() * 9.0 + (p * 0.031).cos() * 4.0
            };
            Bar {
                timestamp: base + chrono::Duration::minutes(5 * i as i64),
                open,
                high: open.max(close) + 0.8,
                low: open.min(close) - 0.8,
                close,
                volume: 1_000.0 + ((i * 37) % 700) as f64,
            }
        })
        .collect()
}

fn small_optimizer(seed: u64) -> Optimizer {
    let sim = Simulator::new(SimConfig::default(), &IndicatorConfig::default()).unwrap();
    let config = OptimizerConfig {
        population: 8,
        max_generations: 6,
        sigma0: 0.3,
        seed,
        stall_tolerance: 0.005,
        stall_generations: 50, // never stalls inside this budget
    };
    Optimizer::new(
        sim,
        config,
        MetricsConfig::default(),
        FitnessConfig::default(),
    )
}

#[test]
fn fixed_seed_converges_to_the_same_best_vector() {
    let bars = synthetic_bars(600);
    let a = small_optimizer(42).optimize(&bars).unwrap();
    let b = small_optimizer(42).optimize(&bars).unwrap();

    assert_eq!(a.best.params, b.best.params);
    assert_eq!(
        a.best.fitness.objective.to_bits(),
        b.best.fitness.objective.to_bits()
    );
    assert_eq!(a.best.generation, b.best.generation);
    assert_eq!(a.generations_run, b.generations_run);
    assert_eq!(a.evaluations, a.generations_run * 8);
}

#[test]
fn outcome_reports_budget_exhaustion() {
    let bars = synthetic_bars(400);
    let outcome = small_optimizer(7).optimize(&bars).unwrap();
    assert_eq!(outcome.stop_reason, StopReason::BudgetExhausted);
    assert_eq!(outcome.generations_run, 6);
    assert_eq!(outcome.history.len(), 6);
    // Best-so-far is by best observed fitness: it dominates every
    // generation's recorded best.
    for stats in &outcome.history {
        assert!(outcome.best.fitness.objective >= stats.best_objective);
    }
}

#[test]
fn persisted_best_reproduces_identical_fitness() {
    let bars = synthetic_bars(600);
    let optimizer = small_optimizer(42);
    let outcome = optimizer.optimize(&bars).unwrap();

    // Persist the winner keyed by symbol, exactly as live trading reads it.
    let sim = optimizer.simulator();
    let mut artifact = ParamArtifact::new();
    artifact.insert(
        "BTCUSDT",
        InstrumentRecord {
            params: outcome.best.params.clone(),
            fitness: outcome.best.fitness.clone(),
            fingerprint: run_fingerprint(sim.space(), sim.config(), 42),
        },
    );
    let json = artifact.to_json().unwrap();
    let reloaded = ParamArtifact::from_json(&json).unwrap();
    let record = reloaded.get("BTCUSDT").unwrap();

    // Re-score the reloaded vector from scratch.
    let report = sim.run(&bars, &record.params).unwrap();
    let summary = Summary::compute(&report, &MetricsConfig::default());
    let span_days = (bars.last().unwrap().timestamp - bars[0].timestamp).num_seconds() as f64
        / 86_400.0;
    let rescored = FitnessConfig::default().score(&summary, span_days);

    assert_eq!(
        rescored.objective.to_bits(),
        outcome.best.fitness.objective.to_bits(),
        "reloaded parameters must reproduce the identical fitness"
    );
}

#[test]
fn pre_cancelled_run_yields_no_candidates() {
    let bars = synthetic_bars(200);
    let cancel = std::sync::atomic::AtomicBool::new(true);
    let result = small_optimizer(3).optimize_with_cancel(&bars, &cancel);
    assert!(result.is_err());
}

#[test]
fn empty_bars_are_rejected() {
    let result = small_optimizer(3).optimize(&[]);
    assert!(result.is_err());
}
