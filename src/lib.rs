//! rfmforge: A Rust CLI application for RFM customer segmentation
//!
//! This library computes Recency, Frequency and Monetary metrics from
//! transaction records, scores each metric with dynamic quantile bins and
//! classifies customers into behavioral segments.

pub mod aggregate;
pub mod binning;
pub mod cli;
pub mod data;
pub mod dates;
pub mod error;
pub mod model;
pub mod score;
pub mod segment;
pub mod viz;

// Re-export public items for easier access
pub use binning::{bin_column, BinStrategy, BinnedColumn};
pub use cli::Args;
pub use data::{
    load_transactions, manual_transactions, transactions_from_frame, ColumnMapping, CustomerId,
    Transaction,
};
pub use error::RfmError;
pub use model::{compute_rfm, compute_rfm_from_frame, CustomerRfm, RfmTable, DEFAULT_BINS};
pub use score::RfmScores;
pub use segment::{classify, Segment};

/// Common result type used throughout the library
pub type Result<T> = std::result::Result<T, RfmError>;
