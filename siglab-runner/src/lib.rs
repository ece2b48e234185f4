//! SigLab Runner — everything around the engine.
//!
//! - CSV bar ingestion (epoch-millisecond OHLCV rows, one file per
//!   instrument)
//! - Performance metrics and the tunable risk-adjusted fitness objective
//! - CMA-ES parameter optimizer with rayon-parallel population evaluation
//! - Persisted per-instrument parameter artifacts (the contract between the
//!   optimizer and live trading)
//! - Trade-ledger and equity exports
//!
//! The optimizer's fitness function *is* the simulator: every candidate is
//! scored by a full deterministic replay, so the best vector found here
//! reproduces identically in `siglab-core`.

pub mod artifact;
pub mod cmaes;
pub mod data;
pub mod export;
pub mod fitness;
pub mod metrics;
pub mod optimizer;

/// Version stamped into persisted artifacts; unknown versions are rejected
/// on load.
pub const SCHEMA_VERSION: u32 = 1;
