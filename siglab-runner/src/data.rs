//! Bar ingestion — row-wise OHLCV CSV, one file per instrument.
//!
//! Expected columns: `timestamp,open,high,low,close,volume` with the
//! timestamp in epoch milliseconds (exchange kline dumps). A leading header
//! row is tolerated; everything after it must parse. The loaded series goes
//! through the core integrity validation — malformed or non-monotonic data
//! is a loud failure, never silently repaired.

use std::io::Read;
use std::path::Path;

use chrono::{DateTime, Utc};
use thiserror::Error;

use siglab_core::domain::{validate_series, Bar};
use siglab_core::CoreError;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("row {row}: {reason}")]
    Parse { row: usize, reason: String },

    #[error(transparent)]
    Integrity(#[from] CoreError),
}

/// Load bars from a CSV file.
pub fn load_bars_csv(path: impl AsRef<Path>) -> Result<Vec<Bar>, DataError> {
    let file = std::fs::File::open(path.as_ref()).map_err(|e| DataError::Parse {
        row: 0,
        reason: format!("cannot open {}: {e}", path.as_ref().display()),
    })?;
    load_bars_from_reader(file)
}

/// Load bars from any reader (used directly in tests).
pub fn load_bars_from_reader<R: Read>(reader: R) -> Result<Vec<Bar>, DataError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut bars = Vec::new();
    for (i, record) in csv_reader.records().enumerate() {
        let record = record?;
        match parse_row(&record, i) {
            Ok(bar) => bars.push(bar),
            // A non-numeric first row is a header; anything later is corrupt.
            Err(_) if i == 0 => continue,
            Err(e) => return Err(e),
        }
    }

    validate_series(&bars)?;
    Ok(bars)
}

fn parse_row(record: &csv::StringRecord, row: usize) -> Result<Bar, DataError> {
    if record.len() < 6 {
        return Err(DataError::Parse {
            row,
            reason: format!("expected 6 columns, got {}", record.len()),
        });
    }

    let field = |idx: usize| record.get(idx).unwrap_or_default();
    let parse_f64 = |idx: usize, name: &str| {
        field(idx).parse::<f64>().map_err(|_| DataError::Parse {
            row,
            reason: format!("bad {name}: {:?}", field(idx)),
        })
    };

    let millis = field(0).parse::<i64>().map_err(|_| DataError::Parse {
        row,
        reason: format!("bad timestamp: {:?}", field(0)),
    })?;
    let timestamp: DateTime<Utc> =
        DateTime::from_timestamp_millis(millis).ok_or_else(|| DataError::Parse {
            row,
            reason: format!("timestamp out of range: {millis}"),
        })?;

    Ok(Bar {
        timestamp,
        open: parse_f64(1, "open")?,
        high: parse_f64(2, "high")?,
        low: parse_f64(3, "low")?,
        close: parse_f64(4, "close")?,
        volume: parse_f64(5, "volume")?,
    })
}
