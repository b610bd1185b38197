//! Per-customer aggregation of transactions into raw recency, frequency and monetary values

use chrono::NaiveDateTime;
use ndarray::Array2;
use polars::prelude::*;

use crate::data::{CustomerId, Transaction};

/// Column order of the raw feature matrix
pub const RECENCY: usize = 0;
pub const FREQUENCY: usize = 1;
pub const MONETARY: usize = 2;

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Raw metrics for one customer
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerAggregate {
    pub customer_id: CustomerId,
    /// Days from the latest transaction to the reference instant
    pub recency: i64,
    pub frequency: usize,
    pub monetary: f64,
}

/// Lay transactions out as a frame of canonical id, epoch-millisecond date and value
pub fn transactions_frame(transactions: &[Transaction]) -> crate::Result<DataFrame> {
    let ids: Vec<&str> = transactions
        .iter()
        .map(|t| t.customer_id.as_str())
        .collect();
    let dates: Vec<i64> = transactions
        .iter()
        .map(|t| t.transaction_date.and_utc().timestamp_millis())
        .collect();
    let values: Vec<f64> = transactions.iter().map(|t| t.transaction_value).collect();

    let frame = df!(
        "customer_id" => ids,
        "transaction_date" => dates,
        "transaction_value" => values
    )?;

    Ok(frame)
}

/// Group transactions by customer and compute the raw RFM metrics
///
/// # Arguments
/// * `transactions` - All rows of the batch
/// * `reference` - The instant recency is measured against
///
/// # Returns
/// * One aggregate per distinct customer, ordered by customer id
pub fn aggregate_customers(
    transactions: &[Transaction],
    reference: NaiveDateTime,
) -> crate::Result<Vec<CustomerAggregate>> {
    if transactions.is_empty() {
        return Ok(Vec::new());
    }

    let reference_millis = reference.and_utc().timestamp_millis();

    let grouped = transactions_frame(transactions)?
        .lazy()
        .group_by([col("customer_id")])
        .agg([
            col("transaction_date").max().alias("last_transaction"),
            col("transaction_value").len().alias("frequency"),
            col("transaction_value").sum().alias("monetary"),
        ])
        .with_columns([
            // Floored, so part of a day in the future counts as -1
            (lit(reference_millis) - col("last_transaction"))
                .floor_div(lit(MILLIS_PER_DAY))
                .alias("recency"),
        ])
        .select([
            col("customer_id"),
            col("recency"),
            col("frequency").cast(DataType::Int64),
            col("monetary"),
        ])
        .collect()?;

    let ids = grouped.column("customer_id")?.str()?;
    let recency = grouped.column("recency")?.i64()?;
    let frequency = grouped.column("frequency")?.i64()?;
    let monetary = grouped.column("monetary")?.f64()?;

    let mut aggregates: Vec<CustomerAggregate> = ids
        .into_no_null_iter()
        .zip(recency.into_no_null_iter())
        .zip(frequency.into_no_null_iter())
        .zip(monetary.into_no_null_iter())
        .map(|(((id, recency), frequency), monetary)| CustomerAggregate {
            customer_id: CustomerId::new(id),
            recency,
            frequency: frequency as usize,
            monetary,
        })
        .collect();

    // group_by output order is unspecified
    aggregates.sort_by(|a, b| a.customer_id.cmp(&b.customer_id));

    let future_dated = aggregates.iter().filter(|agg| agg.recency < 0).count();
    if future_dated > 0 {
        log::warn!(
            "{} customers have transactions after the reference instant {}; their recency is negative",
            future_dated,
            reference
        );
    }

    Ok(aggregates)
}

/// Stack the aggregates into an `(n_customers, 3)` matrix of recency, frequency, monetary
pub fn raw_features(aggregates: &[CustomerAggregate]) -> Array2<f64> {
    Array2::from_shape_fn((aggregates.len(), 3), |(i, j)| {
        let agg = &aggregates[i];
        match j {
            RECENCY => agg.recency as f64,
            FREQUENCY => agg.frequency as f64,
            _ => agg.monetary,
        }
    })
}
