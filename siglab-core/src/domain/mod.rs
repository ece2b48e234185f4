//! Domain types: bars, positions, trades, the ledger.

pub mod bar;
pub mod ledger;
pub mod position;
pub mod trade;

pub use bar::{validate_series, Bar};
pub use ledger::Ledger;
pub use position::{Position, Side};
pub use trade::{ExitReason, Trade};
