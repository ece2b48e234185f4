//! Ledger and summary export — CSV for the trade tape and equity curve,
//! JSON for the full run bundle.
//!
//! Persisted bundles carry a `schema_version`; unknown versions are
//! rejected on load.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use siglab_core::domain::Trade;
use siglab_core::engine::BacktestReport;

use crate::metrics::Summary;
use crate::SCHEMA_VERSION;

/// Everything the external stats/reporting collaborator consumes from one
/// run: the trade ledger plus the aggregate metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunBundle {
    pub schema_version: u32,
    pub symbol: String,
    pub summary: Summary,
    pub report: BacktestReport,
}

impl RunBundle {
    pub fn new(symbol: impl Into<String>, summary: Summary, report: BacktestReport) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            symbol: symbol.into(),
            summary,
            report,
        }
    }
}

/// Serialize a run bundle to pretty JSON.
pub fn export_json(bundle: &RunBundle) -> Result<String> {
    serde_json::to_string_pretty(bundle).context("failed to serialize run bundle")
}

/// Deserialize a run bundle, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<RunBundle> {
    let bundle: RunBundle = serde_json::from_str(json).context("failed to parse run bundle")?;
    if bundle.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported bundle schema version {} (max supported: {})",
            bundle.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(bundle)
}

/// Export the trade tape as CSV.
///
/// Columns: side, entry_index, entry_time, entry_price, exit_index,
/// exit_time, exit_price, notional, return_pct, net_pnl, entry_signal,
/// exit_reason, bars_held.
pub fn export_trades_csv(trades: &[Trade]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);

    writer.write_record([
        "side",
        "entry_index",
        "entry_time",
        "entry_price",
        "exit_index",
        "exit_time",
        "exit_price",
        "notional",
        "return_pct",
        "net_pnl",
        "entry_signal",
        "exit_reason",
        "bars_held",
    ])?;

    for t in trades {
        writer.write_record([
            format!("{:?}", t.side),
            t.entry_index.to_string(),
            t.entry_time.to_rfc3339(),
            format!("{:.8}", t.entry_price),
            t.exit_index.to_string(),
            t.exit_time.to_rfc3339(),
            format!("{:.8}", t.exit_price),
            format!("{:.2}", t.notional),
            format!("{:.6}", t.return_pct),
            format!("{:.4}", t.net_pnl),
            format!("{:.4}", t.entry_signal),
            format!("{:?}", t.exit_reason),
            t.bars_held.to_string(),
        ])?;
    }

    let data = writer.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export the per-bar equity curve as CSV.
pub fn export_equity_csv(equity: &[f64]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record(["bar_index", "equity"])?;
    for (i, e) in equity.iter().enumerate() {
        writer.write_record([i.to_string(), format!("{e:.2}")])?;
    }
    let data = writer.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}
