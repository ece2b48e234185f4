//! SigLab Core — engine, domain types, indicators, signal evaluation, execution costs.
//!
//! This crate contains the heart of the weighted-signal trading core:
//! - Domain types (bars, positions, trades, the ledger)
//! - Indicator library: pure conviction series with NaN warm-up
//! - Signal engine: weighted composite signal and the entry/exit decision rule
//! - Execution cost model (fee + slippage + spread folded into fill prices)
//! - Bar-by-bar backtest simulator with risk gates and a per-instrument
//!   position state machine
//! - Parameter vectors, bounds, and the normalized genotype encoding the
//!   optimizer searches over
//!
//! Everything here is pure and synchronous: bars in, ledger out. The signal
//! engine is the single source of truth for "what would this strategy do
//! right now" — the simulator and any live order-placement collaborator call
//! the same function.

pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod execution;
pub mod indicators;
pub mod params;
pub mod signal;

pub use error::CoreError;
