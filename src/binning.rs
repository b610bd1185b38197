//! Dynamic quantile binning of a single metric column
//!
//! Columns with few distinct values cannot be split into `num_bins`
//! non-empty quantile groups, so the strategy is chosen per column:
//! equal-width bins when there are at most `num_bins` distinct values,
//! equal-frequency bins otherwise. Duplicate quantile edges caused by heavy
//! ties are dropped, which can leave fewer than `num_bins` labels in use.

use ndarray::{Array1, ArrayView1};

use crate::error::RfmError;

/// Composite scores are single digits per metric
pub const MAX_BINS: usize = 9;

/// How a column was split
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinStrategy {
    /// Equal-length intervals over `[min, max]`
    EqualWidth,
    /// Equal-frequency intervals at the `i / num_bins` quantiles
    Quantile,
}

impl std::fmt::Display for BinStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BinStrategy::EqualWidth => f.write_str("equal-width"),
            BinStrategy::Quantile => f.write_str("quantile"),
        }
    }
}

/// Labels for one column plus the edges that produced them
#[derive(Debug, Clone, PartialEq)]
pub struct BinnedColumn {
    /// 1-based bin label per input value, in input order
    pub labels: Array1<u8>,
    pub strategy: BinStrategy,
    /// Ascending, de-duplicated bin edges; bin `i` is `(edges[i-1], edges[i]]`
    pub edges: Vec<f64>,
}

impl BinnedColumn {
    /// Number of bins actually available after edge de-duplication
    pub fn bin_count(&self) -> usize {
        self.edges.len().saturating_sub(1)
    }
}

/// Assign every value a label in `1..=num_bins`
///
/// # Arguments
/// * `values` - One metric across all customers of the batch
/// * `num_bins` - Target number of bins (1 to 9)
///
/// # Returns
/// * `BinnedColumn` with labels in input order, monotonic in value
pub fn bin_column(values: ArrayView1<'_, f64>, num_bins: usize) -> crate::Result<BinnedColumn> {
    if !(1..=MAX_BINS).contains(&num_bins) {
        return Err(RfmError::InvalidBinCount(num_bins));
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let (Some(&min), Some(&max)) = (sorted.first(), sorted.last()) else {
        return Ok(BinnedColumn {
            labels: Array1::zeros(0),
            strategy: BinStrategy::EqualWidth,
            edges: Vec::new(),
        });
    };

    let mut distinct = sorted.clone();
    distinct.dedup();

    let (strategy, edges) = if distinct.len() <= num_bins {
        (BinStrategy::EqualWidth, equal_width_edges(min, max, num_bins))
    } else {
        (BinStrategy::Quantile, quantile_edges(&sorted, num_bins))
    };

    log::debug!(
        "Binning {} values ({} distinct) with {} strategy into {} bins",
        sorted.len(),
        distinct.len(),
        strategy,
        edges.len() - 1
    );

    let labels = values.mapv(|value| assign_label(value, &edges));

    Ok(BinnedColumn {
        labels,
        strategy,
        edges,
    })
}

/// Edges of `num_bins` equal-length intervals over `[min, max]`.
///
/// A zero-width range collapses to a single bin.
fn equal_width_edges(min: f64, max: f64, num_bins: usize) -> Vec<f64> {
    if min == max {
        return vec![min, max];
    }

    let step = (max - min) / num_bins as f64;
    (0..=num_bins)
        .map(|i| {
            if i == num_bins {
                max
            } else {
                min + step * i as f64
            }
        })
        .collect()
}

/// Quantile edges at `0, 1/B, ..., 1`, with duplicates dropped
fn quantile_edges(sorted: &[f64], num_bins: usize) -> Vec<f64> {
    let mut edges: Vec<f64> = (0..=num_bins)
        .map(|i| quantile(sorted, i as f64 / num_bins as f64))
        .collect();

    let before = edges.len();
    edges.dedup();
    if edges.len() < before {
        log::debug!(
            "Dropped {} duplicate quantile edges; {} bins remain",
            before - edges.len(),
            edges.len() - 1
        );
    }

    edges
}

/// Linearly interpolated quantile of a sorted, non-empty slice
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;

    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

/// Right-closed interval lookup; the lowest edge itself belongs to bin 1
fn assign_label(value: f64, edges: &[f64]) -> u8 {
    if value <= edges[0] {
        return 1;
    }

    let bin = edges
        .iter()
        .skip(1)
        .position(|&edge| value <= edge)
        .map_or(edges.len() - 1, |idx| idx + 1);

    bin as u8
}
