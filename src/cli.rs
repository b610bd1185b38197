//! Command-line interface definitions and argument parsing

use chrono::NaiveDateTime;
use clap::Parser;

use crate::data::{manual_transactions, ColumnMapping, Transaction};
use crate::dates::{parse_reference_date, reference_now};
use crate::model::DEFAULT_BINS;

/// Customer segmentation CLI using RFM scoring with dynamic quantile bins
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the input CSV file
    #[arg(short, long, default_value = "data.csv")]
    pub input: String,

    /// Column holding the customer identifier
    #[arg(long, default_value = "CustomerID")]
    pub customer_col: String,

    /// Column holding the transaction date
    #[arg(long, default_value = "TransactionDate")]
    pub date_col: String,

    /// Column holding the transaction value
    #[arg(long, default_value = "TransactionValue")]
    pub value_col: String,

    /// Reference date for recency in YYYY-MM-DD format (default: now, local time)
    #[arg(long)]
    pub reference_date: Option<String>,

    /// Number of bins per metric
    #[arg(short, long, default_value_t = DEFAULT_BINS)]
    pub bins: usize,

    /// Write the scored table to this CSV file
    #[arg(short, long)]
    pub output: Option<String>,

    /// Write segment charts to this SVG file (plus a `_sizes` companion)
    #[arg(long)]
    pub chart: Option<String>,

    /// Single-customer mode: customer id
    #[arg(long, requires_all = ["dates", "values"])]
    pub customer_id: Option<String>,

    /// Single-customer mode: comma-separated dates in YYYY-MM-DD format
    /// Example: --dates "2024-01-05,2024-02-11"
    #[arg(long, requires = "customer_id")]
    pub dates: Option<String>,

    /// Single-customer mode: comma-separated transaction values, one per date
    #[arg(long, requires = "customer_id")]
    pub values: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    pub fn column_mapping(&self) -> ColumnMapping {
        ColumnMapping::new(&self.customer_col, &self.date_col, &self.value_col)
    }

    /// The instant recency is measured against, read once per run
    pub fn reference_instant(&self) -> crate::Result<NaiveDateTime> {
        match self.reference_date {
            Some(ref raw) => parse_reference_date(raw),
            None => Ok(reference_now()),
        }
    }

    /// Transactions from the single-customer options, if they were given
    pub fn manual_entry(&self) -> crate::Result<Option<Vec<Transaction>>> {
        match (&self.customer_id, &self.dates, &self.values) {
            (Some(customer_id), Some(dates), Some(values)) => {
                manual_transactions(customer_id, dates, values).map(Some)
            }
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["rfmforge"]);
        assert_eq!(args.input, "data.csv");
        assert_eq!(args.bins, 4);
        assert_eq!(args.column_mapping(), ColumnMapping::default());
        assert!(args.manual_entry().unwrap().is_none());
    }

    #[test]
    fn test_column_and_reference_options() {
        let args = Args::parse_from([
            "rfmforge",
            "--input",
            "retail.csv",
            "--customer-col",
            "CustomerID",
            "--date-col",
            "InvoiceDate",
            "--value-col",
            "Amount",
            "--reference-date",
            "2011-12-09",
        ]);

        assert_eq!(
            args.column_mapping(),
            ColumnMapping::new("CustomerID", "InvoiceDate", "Amount")
        );
        assert_eq!(
            args.reference_instant().unwrap(),
            NaiveDate::from_ymd_opt(2011, 12, 9)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        );
    }

    #[test]
    fn test_manual_entry() {
        let mut args = Args::parse_from([
            "rfmforge",
            "--customer-id",
            "C1",
            "--dates",
            "2024-01-01,2024-02-01",
            "--values",
            "10,20.5",
        ]);

        let transactions = args.manual_entry().unwrap().unwrap();
        assert_eq!(transactions.len(), 2);

        args.values = Some("10,abc".to_string());
        assert!(args.manual_entry().is_err());
    }

    #[test]
    fn test_manual_entry_requires_all_parts() {
        let result = Args::try_parse_from(["rfmforge", "--customer-id", "C1", "--dates", "2024-01-01"]);
        assert!(result.is_err());

        let result = Args::try_parse_from(["rfmforge", "--values", "1"]);
        assert!(result.is_err());
    }
}
