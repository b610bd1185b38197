//! Error types for the RFM engine and its ingestion layer

use polars::prelude::PolarsError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RfmError {
    /// A date, amount or customer id could not be read. Aborts the whole batch.
    #[error("Failed to parse {field} at row {row}: {value:?}")]
    Parse {
        field: &'static str,
        row: usize,
        value: String,
    },

    #[error("No transactions supplied")]
    EmptyInput,

    #[error("Column '{column}' not found (available columns: {})", .available.join(", "))]
    ColumnMismatch {
        column: String,
        available: Vec<String>,
    },

    #[error("Number of bins must be between 1 and 9, got {0}")]
    InvalidBinCount(usize),

    #[error("Manual entry has {dates} dates but {values} values")]
    ManualEntryMismatch { dates: usize, values: usize },

    #[error("DataFrame error: {0}")]
    Polars(#[from] PolarsError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RfmError {
    pub(crate) fn parse(field: &'static str, row: usize, value: impl Into<String>) -> Self {
        RfmError::Parse {
            field,
            row,
            value: value.into(),
        }
    }
}
