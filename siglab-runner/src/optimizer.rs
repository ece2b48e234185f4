//! Parameter optimizer — the CMA-ES generation loop over the simulator.
//!
//! Each generation samples a population of genotypes, decodes every one to
//! an immutable clamped [`ParameterVector`] snapshot, and scores them all
//! with fresh simulator runs in parallel. Candidates share nothing mutable;
//! a panic or error inside one candidate is mapped to the penalty fitness
//! and never aborts the generation. The loop is a barrier — the
//! distribution update only sees a complete generation — which also makes
//! cancellation safe exactly at generation boundaries.
//!
//! The best candidate is tracked by best *observed* fitness (not the final
//! mean), updated only on strict improvement so repeated runs with one seed
//! select the identical vector.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use siglab_core::domain::Bar;
use siglab_core::engine::Simulator;
use siglab_core::params::ParameterVector;

use crate::cmaes::Cmaes;
use crate::fitness::{FitnessConfig, FitnessResult};
use crate::metrics::{MetricsConfig, Summary};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Candidates per generation.
    pub population: usize,
    /// Hard generation budget.
    pub max_generations: usize,
    /// Initial step size in the normalized space.
    pub sigma0: f64,
    /// Master seed; a run is fully determined by (seed, bars, config).
    pub seed: u64,
    /// Relative best-fitness improvement below which a generation counts as
    /// stalled.
    pub stall_tolerance: f64,
    /// Consecutive stalled generations before early stop.
    pub stall_generations: usize,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            population: 24,
            max_generations: 100,
            sigma0: 0.3,
            seed: 42,
            stall_tolerance: 0.005,
            stall_generations: 10,
        }
    }
}

impl OptimizerConfig {
    pub fn from_toml_str(s: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(s)?)
    }
}

/// Why the loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    BudgetExhausted,
    Stalled,
    Cancelled,
}

/// The winning candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestCandidate {
    pub params: ParameterVector,
    pub fitness: FitnessResult,
    /// Generation (0-based) in which this candidate was observed.
    pub generation: usize,
}

/// Per-generation progress record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationStats {
    pub generation: usize,
    pub best_objective: f64,
    pub mean_objective: f64,
    pub failed_candidates: usize,
}

/// Full outcome of one optimization run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationOutcome {
    pub best: BestCandidate,
    pub generations_run: usize,
    pub evaluations: usize,
    pub stop_reason: StopReason,
    pub history: Vec<GenerationStats>,
}

pub struct Optimizer {
    sim: Simulator,
    config: OptimizerConfig,
    metrics: MetricsConfig,
    fitness: FitnessConfig,
}

impl Optimizer {
    pub fn new(
        sim: Simulator,
        config: OptimizerConfig,
        metrics: MetricsConfig,
        fitness: FitnessConfig,
    ) -> Self {
        Self {
            sim,
            config,
            metrics,
            fitness,
        }
    }

    pub fn simulator(&self) -> &Simulator {
        &self.sim
    }

    /// Run the full search over one instrument's bars.
    pub fn optimize(&self, bars: &[Bar]) -> anyhow::Result<OptimizationOutcome> {
        let never = AtomicBool::new(false);
        self.optimize_with_cancel(bars, &never)
    }

    /// As [`Optimizer::optimize`], checking `cancel` at each generation
    /// boundary. A mid-generation request finishes the generation, keeps the
    /// best-so-far record intact, and stops before the next one starts.
    pub fn optimize_with_cancel(
        &self,
        bars: &[Bar],
        cancel: &AtomicBool,
    ) -> anyhow::Result<OptimizationOutcome> {
        let space = self.sim.space().clone();
        let values = self.sim.precompute(bars)?;
        let span_days = match (bars.first(), bars.last()) {
            (Some(first), Some(last)) => {
                (last.timestamp - first.timestamp).num_seconds() as f64 / 86_400.0
            }
            _ => anyhow::bail!("cannot optimize over an empty bar series"),
        };

        let mut cma = Cmaes::new(
            vec![0.5; space.dim()],
            self.config.sigma0,
            self.config.population,
            self.config.seed,
        );

        let mut best: Option<BestCandidate> = None;
        let mut history = Vec::new();
        let mut evaluations = 0usize;
        let mut stalled = 0usize;
        let mut stop_reason = StopReason::BudgetExhausted;

        info!(
            population = self.config.population,
            max_generations = self.config.max_generations,
            dimensions = space.dim(),
            bars = bars.len(),
            "starting optimization"
        );

        for generation in 0..self.config.max_generations {
            if cancel.load(Ordering::Relaxed) {
                stop_reason = StopReason::Cancelled;
                info!(generation, "cancelled at generation boundary");
                break;
            }

            let solutions = cma.ask();
            // Immutable snapshots, one per candidate, decoded (and clamped)
            // once for the whole generation.
            let candidates: Vec<ParameterVector> =
                solutions.iter().map(|x| space.decode(x)).collect();

            // Barrier: every candidate scored before the update. Failures
            // are isolated to their candidate.
            let scored: Vec<(FitnessResult, bool)> = candidates
                .par_iter()
                .map(|params| {
                    let outcome = catch_unwind(AssertUnwindSafe(|| {
                        self.sim.run_with_values(bars, &values, params)
                    }));
                    match outcome {
                        Ok(Ok(report)) => {
                            let summary = Summary::compute(&report, &self.metrics);
                            (self.fitness.score(&summary, span_days), false)
                        }
                        Ok(Err(_)) | Err(_) => {
                            (self.fitness.penalized(&Summary::default()), true)
                        }
                    }
                })
                .collect();
            evaluations += scored.len();

            let objectives: Vec<f64> = scored.iter().map(|(f, _)| f.objective).collect();
            let failed = scored.iter().filter(|(_, failed)| *failed).count();
            if failed > 0 {
                warn!(generation, failed, "candidate evaluations failed; penalized");
            }

            let previous_best = best.as_ref().map(|b| b.fitness.objective);
            for (idx, (result, _)) in scored.iter().enumerate() {
                let improves = best
                    .as_ref()
                    .map(|b| result.objective > b.fitness.objective)
                    .unwrap_or(true);
                if improves {
                    best = Some(BestCandidate {
                        params: candidates[idx].clone(),
                        fitness: result.clone(),
                        generation,
                    });
                }
            }
            if let Some(b) = &best {
                if previous_best.map(|p| b.fitness.objective > p).unwrap_or(true) {
                    info!(
                        generation,
                        objective = b.fitness.objective,
                        win_rate = b.fitness.win_rate,
                        trades = b.fitness.trade_count,
                        "new best candidate"
                    );
                }
            }

            let gen_best = objectives.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let gen_mean = objectives.iter().sum::<f64>() / objectives.len() as f64;
            history.push(GenerationStats {
                generation,
                best_objective: gen_best,
                mean_objective: gen_mean,
                failed_candidates: failed,
            });
            debug!(generation, gen_best, gen_mean, sigma = cma.sigma(), "generation complete");

            cma.tell(&solutions, &objectives);

            // Stall detection on the best-so-far trajectory.
            let current_best = best.as_ref().map(|b| b.fitness.objective);
            let improved = match (previous_best, current_best) {
                (Some(prev), Some(now)) => {
                    now - prev > self.config.stall_tolerance * prev.abs().max(1e-9)
                }
                (None, Some(_)) => true,
                _ => false,
            };
            if improved {
                stalled = 0;
            } else {
                stalled += 1;
                if stalled >= self.config.stall_generations {
                    stop_reason = StopReason::Stalled;
                    info!(
                        generation,
                        stalled, "early stop: best fitness stalled"
                    );
                    break;
                }
            }
        }

        let best = best.ok_or_else(|| anyhow::anyhow!("optimization produced no candidates"))?;
        let generations_run = history.len();
        info!(
            generations_run,
            evaluations,
            objective = best.fitness.objective,
            "optimization finished"
        );

        Ok(OptimizationOutcome {
            best,
            generations_run,
            evaluations,
            stop_reason,
            history,
        })
    }
}
