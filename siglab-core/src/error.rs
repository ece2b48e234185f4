//! Typed errors for the core engine.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    /// Bar data failed validation. Fatal for a backtest run: the simulator
    /// never skips or reorders bars.
    #[error("data integrity violation at bar {index}: {reason}")]
    DataIntegrity { index: usize, reason: String },

    /// An externally supplied parameter vector violates its declared bounds
    /// or the stop-loss < take-profit invariant. Optimizer-internal vectors
    /// are clamped instead of rejected.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: String, reason: String },

    /// Configuration record failed to parse or carries nonsensical values.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
