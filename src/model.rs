//! RFM engine: scores every customer of a batch and assigns segments

use std::fs::File;
use std::path::Path;

use chrono::NaiveDateTime;
use polars::prelude::*;

use crate::aggregate::{aggregate_customers, raw_features, FREQUENCY, MONETARY, RECENCY};
use crate::binning::{bin_column, BinStrategy, MAX_BINS};
use crate::data::{transactions_from_frame, ColumnMapping, CustomerId, Transaction};
use crate::error::RfmError;
use crate::score::RfmScores;
use crate::segment::{classify, Segment};

/// Bin count the segment thresholds are written for
pub const DEFAULT_BINS: usize = 4;

/// Metrics, scores and segment of one customer
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerRfm {
    pub customer_id: CustomerId,
    /// Whole days since the latest transaction; negative for future-dated ones
    pub recency: i64,
    pub frequency: usize,
    pub monetary: f64,
    pub r_score: u8,
    pub f_score: u8,
    pub m_score: u8,
    /// `r_score`, `f_score`, `m_score` as concatenated digits
    pub rfm_score: String,
    pub segment: Segment,
}

impl CustomerRfm {
    pub fn scores(&self) -> RfmScores {
        RfmScores::new(self.r_score, self.f_score, self.m_score)
    }
}

/// Scored customers of one batch, ordered by customer id
#[derive(Debug, Clone)]
pub struct RfmTable {
    customers: Vec<CustomerRfm>,
    /// Requested bin count
    pub num_bins: usize,
    /// Strategy the binner picked for recency, frequency and monetary
    pub strategies: [BinStrategy; 3],
}

impl RfmTable {
    pub fn len(&self) -> usize {
        self.customers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.customers.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CustomerRfm> {
        self.customers.iter()
    }

    pub fn customers(&self) -> &[CustomerRfm] {
        &self.customers
    }

    pub fn get(&self, customer_id: &CustomerId) -> Option<&CustomerRfm> {
        self.customers
            .binary_search_by(|row| row.customer_id.cmp(customer_id))
            .ok()
            .map(|idx| &self.customers[idx])
    }

    /// Rows of one segment, in table order
    pub fn segment(&self, segment: Segment) -> Vec<&CustomerRfm> {
        self.customers
            .iter()
            .filter(|row| row.segment == segment)
            .collect()
    }

    /// Customer count for every segment, `Other` included
    pub fn segment_counts(&self) -> Vec<(Segment, usize)> {
        Segment::ALL
            .iter()
            .map(|&segment| {
                let count = self.customers.iter().filter(|row| row.segment == segment).count();
                (segment, count)
            })
            .collect()
    }

    /// The full table as a DataFrame
    pub fn to_dataframe(&self) -> crate::Result<DataFrame> {
        rows_to_frame(&self.customers.iter().collect::<Vec<_>>())
    }

    /// Only the rows of one segment as a DataFrame
    pub fn segment_frame(&self, segment: Segment) -> crate::Result<DataFrame> {
        rows_to_frame(&self.segment(segment))
    }

    /// Write the full table as CSV with a header row
    pub fn write_csv(&self, path: impl AsRef<Path>) -> crate::Result<()> {
        let mut frame = self.to_dataframe()?;
        let mut file = File::create(path)?;
        CsvWriter::new(&mut file)
            .include_header(true)
            .finish(&mut frame)?;
        Ok(())
    }
}

impl<'a> IntoIterator for &'a RfmTable {
    type Item = &'a CustomerRfm;
    type IntoIter = std::slice::Iter<'a, CustomerRfm>;

    fn into_iter(self) -> Self::IntoIter {
        self.customers.iter()
    }
}

/// Compute RFM metrics, scores and segments for a batch of transactions
///
/// # Arguments
/// * `transactions` - Every transaction of the batch
/// * `reference` - The "now" recency is measured against; read it once per batch
/// * `num_bins` - Bins per metric (1 to 9, normally `DEFAULT_BINS`)
///
/// # Returns
/// * `RfmTable` with one row per distinct customer, or an error for the whole batch
pub fn compute_rfm(
    transactions: &[Transaction],
    reference: NaiveDateTime,
    num_bins: usize,
) -> crate::Result<RfmTable> {
    if !(1..=MAX_BINS).contains(&num_bins) {
        return Err(RfmError::InvalidBinCount(num_bins));
    }
    if transactions.is_empty() {
        return Err(RfmError::EmptyInput);
    }

    let aggregates = aggregate_customers(transactions, reference)?;
    let features = raw_features(&aggregates);

    // Each metric picks its own binning strategy
    let recency = bin_column(features.column(RECENCY), num_bins)?;
    let frequency = bin_column(features.column(FREQUENCY), num_bins)?;
    let monetary = bin_column(features.column(MONETARY), num_bins)?;

    let customers: Vec<CustomerRfm> = aggregates
        .into_iter()
        .enumerate()
        .map(|(i, agg)| {
            let scores = RfmScores::new(recency.labels[i], frequency.labels[i], monetary.labels[i]);
            CustomerRfm {
                customer_id: agg.customer_id,
                recency: agg.recency,
                frequency: agg.frequency,
                monetary: agg.monetary,
                r_score: scores.recency,
                f_score: scores.frequency,
                m_score: scores.monetary,
                rfm_score: scores.composite(),
                segment: classify(&scores),
            }
        })
        .collect();

    log::info!(
        "Scored {} customers from {} transactions (recency: {}, frequency: {}, monetary: {})",
        customers.len(),
        transactions.len(),
        recency.strategy,
        frequency.strategy,
        monetary.strategy
    );

    Ok(RfmTable {
        customers,
        num_bins,
        strategies: [recency.strategy, frequency.strategy, monetary.strategy],
    })
}

/// Run the engine on an in-memory table whose columns are named by `columns`
pub fn compute_rfm_from_frame(
    frame: &DataFrame,
    columns: &ColumnMapping,
    reference: NaiveDateTime,
    num_bins: usize,
) -> crate::Result<RfmTable> {
    let transactions = transactions_from_frame(frame, columns)?;
    compute_rfm(&transactions, reference, num_bins)
}

fn rows_to_frame(rows: &[&CustomerRfm]) -> crate::Result<DataFrame> {
    let ids: Vec<&str> = rows.iter().map(|row| row.customer_id.as_str()).collect();
    let recency: Vec<i64> = rows.iter().map(|row| row.recency).collect();
    let frequency: Vec<i64> = rows.iter().map(|row| row.frequency as i64).collect();
    let monetary: Vec<f64> = rows.iter().map(|row| row.monetary).collect();
    let r_score: Vec<i32> = rows.iter().map(|row| i32::from(row.r_score)).collect();
    let f_score: Vec<i32> = rows.iter().map(|row| i32::from(row.f_score)).collect();
    let m_score: Vec<i32> = rows.iter().map(|row| i32::from(row.m_score)).collect();
    let rfm_score: Vec<&str> = rows.iter().map(|row| row.rfm_score.as_str()).collect();
    let segment: Vec<&str> = rows.iter().map(|row| row.segment.as_str()).collect();

    let frame = df!(
        "CustomerID" => ids,
        "Recency" => recency,
        "Frequency" => frequency,
        "Monetary" => monetary,
        "R_Score" => r_score,
        "F_Score" => f_score,
        "M_Score" => m_score,
        "RFM_Score" => rfm_score,
        "Segment" => segment
    )?;

    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use std::collections::HashSet;

    fn reference() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 30)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn days_ago(days: i64) -> NaiveDateTime {
        reference() - Duration::days(days)
    }

    fn create_test_transactions() -> Vec<Transaction> {
        let mut transactions = Vec::new();
        for customer in 0..12i64 {
            for n in 0..=(customer % 5) {
                transactions.push(Transaction::new(
                    customer,
                    days_ago(customer * 7 + n),
                    (customer as f64 + 1.0) * 12.5 - n as f64,
                ));
            }
        }
        transactions
    }

    #[test]
    fn test_single_customer_single_transaction() {
        let transactions = vec![Transaction::new("solo", days_ago(10), 100.0)];
        let table = compute_rfm(&transactions, reference(), DEFAULT_BINS).unwrap();

        assert_eq!(table.len(), 1);
        let row = &table.customers()[0];
        assert_eq!(row.recency, 10);
        assert_eq!(row.frequency, 1);
        assert_eq!(row.monetary, 100.0);
        assert_eq!(row.scores(), RfmScores::new(1, 1, 1));
        assert_eq!(row.rfm_score, "111");
        assert_eq!(row.segment, Segment::Inactive);
        assert_eq!(table.strategies, [BinStrategy::EqualWidth; 3]);
    }

    #[test]
    fn test_two_customers_recency_label_follows_days() {
        let mut transactions: Vec<Transaction> = (0..5)
            .map(|n| Transaction::new("A", days_ago(2 + n * 10), 100.0))
            .collect();
        transactions.push(Transaction::new("B", days_ago(200), 10.0));

        let table = compute_rfm(&transactions, reference(), DEFAULT_BINS).unwrap();
        let a = table.get(&CustomerId::from("A")).unwrap();
        let b = table.get(&CustomerId::from("B")).unwrap();

        assert_eq!((a.recency, a.frequency, a.monetary), (2, 5, 500.0));
        assert_eq!((b.recency, b.frequency, b.monetary), (200, 1, 10.0));

        // Fewer days since purchase means a lower recency label
        assert_eq!(a.rfm_score, "144");
        assert_eq!(b.rfm_score, "411");
        assert_eq!(a.segment, Segment::Departing);
        assert_eq!(b.segment, Segment::New);
    }

    #[test]
    fn test_identical_monetary_values_share_one_label() {
        let transactions: Vec<Transaction> = (0..20i64)
            .map(|customer| Transaction::new(customer, days_ago(customer * 3), 50.0))
            .collect();

        let table = compute_rfm(&transactions, reference(), DEFAULT_BINS).unwrap();
        assert_eq!(table.len(), 20);
        assert!(table.iter().all(|row| row.m_score == 1));
        assert!(table.iter().all(|row| row.f_score == 1));

        // Recency has 20 distinct values, so the strategies differ per metric
        assert_eq!(
            table.strategies,
            [BinStrategy::Quantile, BinStrategy::EqualWidth, BinStrategy::EqualWidth]
        );
        let recency_labels: HashSet<u8> = table.iter().map(|row| row.r_score).collect();
        assert_eq!(recency_labels.len(), 4);
    }

    #[test]
    fn test_every_customer_appears_once() {
        let transactions = create_test_transactions();
        let table = compute_rfm(&transactions, reference(), DEFAULT_BINS).unwrap();

        let input_ids: HashSet<&CustomerId> = transactions.iter().map(|t| &t.customer_id).collect();
        let output_ids: HashSet<&CustomerId> = table.iter().map(|row| &row.customer_id).collect();
        assert_eq!(table.len(), input_ids.len());
        assert_eq!(input_ids, output_ids);

        for row in &table {
            let count = transactions
                .iter()
                .filter(|t| t.customer_id == row.customer_id)
                .count();
            let total: f64 = transactions
                .iter()
                .filter(|t| t.customer_id == row.customer_id)
                .map(|t| t.transaction_value)
                .sum();
            assert_eq!(row.frequency, count);
            assert!((row.monetary - total).abs() < 1e-9);
            assert_eq!(row.rfm_score, row.scores().composite());
            assert_eq!(row.segment, classify(&row.scores()));
        }
    }

    #[test]
    fn test_extra_transaction_never_lowers_frequency() {
        let mut transactions = create_test_transactions();
        let before = compute_rfm(&transactions, reference(), DEFAULT_BINS).unwrap();

        transactions.push(Transaction::new(3i64, days_ago(400), 1.0));
        let after = compute_rfm(&transactions, reference(), DEFAULT_BINS).unwrap();

        for row in &before {
            let updated = after.get(&row.customer_id).unwrap();
            assert!(updated.frequency >= row.frequency);
        }
        let id = CustomerId::from(3i64);
        assert_eq!(
            after.get(&id).unwrap().frequency,
            before.get(&id).unwrap().frequency + 1
        );
    }

    #[test]
    fn test_refunds_are_summed() {
        let transactions = vec![
            Transaction::new("A", days_ago(1), 10.0),
            Transaction::new("A", days_ago(3), -3.0),
        ];
        let table = compute_rfm(&transactions, reference(), DEFAULT_BINS).unwrap();
        assert_eq!(table.customers()[0].monetary, 7.0);
    }

    #[test]
    fn test_empty_input_is_an_error() {
        let result = compute_rfm(&[], reference(), DEFAULT_BINS);
        assert!(matches!(result, Err(RfmError::EmptyInput)));
    }

    #[test]
    fn test_invalid_bin_count() {
        let transactions = create_test_transactions();
        assert!(matches!(
            compute_rfm(&transactions, reference(), 0),
            Err(RfmError::InvalidBinCount(0))
        ));
        assert!(matches!(
            compute_rfm(&transactions, reference(), 12),
            Err(RfmError::InvalidBinCount(12))
        ));
    }

    #[test]
    fn test_segment_partitions_cover_table() {
        let table = compute_rfm(&create_test_transactions(), reference(), DEFAULT_BINS).unwrap();

        let counts = table.segment_counts();
        assert_eq!(counts.len(), Segment::ALL.len());
        assert_eq!(counts.iter().map(|(_, n)| n).sum::<usize>(), table.len());

        for (segment, count) in counts {
            let rows = table.segment(segment);
            assert_eq!(rows.len(), count);
            assert!(rows.iter().all(|row| row.segment == segment));
        }
    }

    #[test]
    fn test_to_dataframe() {
        let table = compute_rfm(&create_test_transactions(), reference(), DEFAULT_BINS).unwrap();

        let frame = table.to_dataframe().unwrap();
        assert_eq!(frame.shape(), (12, 9));

        let active = table.segment_frame(Segment::Active).unwrap();
        assert_eq!(active.height(), table.segment(Segment::Active).len());
        assert_eq!(active.width(), 9);
    }

    #[test]
    fn test_compute_rfm_from_frame() {
        let frame = df!(
            "cust" => [1i64, 1, 2],
            "when" => ["2024-06-20", "2024-06-25", "2024-01-01"],
            "amount" => [5.0, 7.5, 100.0]
        )
        .unwrap();

        let table = compute_rfm_from_frame(
            &frame,
            &ColumnMapping::new("cust", "when", "amount"),
            reference(),
            DEFAULT_BINS,
        )
        .unwrap();
        assert_eq!(table.len(), 2);
        let first = table.get(&CustomerId::from(1i64)).unwrap();
        assert_eq!((first.recency, first.frequency, first.monetary), (5, 2, 12.5));

        let missing = compute_rfm_from_frame(
            &frame,
            &ColumnMapping::new("cust", "date", "amount"),
            reference(),
            DEFAULT_BINS,
        );
        assert!(matches!(missing, Err(RfmError::ColumnMismatch { .. })));
    }
}
