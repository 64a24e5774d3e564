//! Historical data loading for backtests
//!
//! Consumes a tabular CSV file with named `price`, `high`, `low` columns,
//! row by row in file order. Extra columns are ignored.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

use crate::types::PriceSample;

/// One backtest row
#[derive(Debug, Clone, Deserialize)]
pub struct HistoricalRecord {
    pub price: f64,
    pub high: f64,
    pub low: f64,
}

impl From<&HistoricalRecord> for PriceSample {
    fn from(record: &HistoricalRecord) -> Self {
        PriceSample::new(record.price, record.high, record.low)
    }
}

/// Load all rows from a historical data file
pub fn load_records(path: impl AsRef<Path>) -> Result<Vec<HistoricalRecord>> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open datafile: {}", path.display()))?;

    let mut records = Vec::new();
    for (row_idx, result) in reader.deserialize().enumerate() {
        let record: HistoricalRecord =
            result.with_context(|| format!("Failed to parse row {}", row_idx + 1))?;
        records.push(record);
    }

    info!("Loaded {} rows from {}", records.len(), path.display());
    Ok(records)
}
