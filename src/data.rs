//! Transaction input: customer ids, column mapping and loading from CSV or manual entry

use std::cmp::Ordering;
use std::fmt;
use std::path::Path;

use chrono::NaiveDateTime;
use polars::prelude::*;

use crate::dates::{normalize_dates, parse_manual_date};
use crate::error::RfmError;

/// Canonical customer identifier.
///
/// Source ids may be numbers or strings; both are reduced to their trimmed
/// string form and compared by exact equality. Ids that look like integers
/// order numerically and ahead of non-numeric ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CustomerId(String);

impl CustomerId {
    pub fn new(raw: impl AsRef<str>) -> Self {
        CustomerId(raw.as_ref().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Ord for CustomerId {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.0.parse::<i64>(), other.0.parse::<i64>()) {
            (Ok(a), Ok(b)) => a.cmp(&b).then_with(|| self.0.cmp(&other.0)),
            (Ok(_), Err(_)) => Ordering::Less,
            (Err(_), Ok(_)) => Ordering::Greater,
            (Err(_), Err(_)) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for CustomerId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CustomerId {
    fn from(raw: &str) -> Self {
        CustomerId::new(raw)
    }
}

impl From<String> for CustomerId {
    fn from(raw: String) -> Self {
        CustomerId::new(raw)
    }
}

impl From<i64> for CustomerId {
    fn from(raw: i64) -> Self {
        CustomerId(raw.to_string())
    }
}

/// A single input row
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub customer_id: CustomerId,
    pub transaction_date: NaiveDateTime,
    /// Signed amount; refunds arrive as negative values
    pub transaction_value: f64,
}

impl Transaction {
    pub fn new(
        customer_id: impl Into<CustomerId>,
        transaction_date: NaiveDateTime,
        transaction_value: f64,
    ) -> Self {
        Transaction {
            customer_id: customer_id.into(),
            transaction_date,
            transaction_value,
        }
    }
}

/// Names of the source columns holding the three transaction fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    pub customer_id: String,
    pub transaction_date: String,
    pub transaction_value: String,
}

impl ColumnMapping {
    pub fn new(
        customer_id: impl Into<String>,
        transaction_date: impl Into<String>,
        transaction_value: impl Into<String>,
    ) -> Self {
        ColumnMapping {
            customer_id: customer_id.into(),
            transaction_date: transaction_date.into(),
            transaction_value: transaction_value.into(),
        }
    }

    /// Check that every mapped column exists in the frame
    pub fn validate_against(&self, frame: &DataFrame) -> crate::Result<()> {
        let available: Vec<String> = frame
            .get_column_names()
            .iter()
            .map(|name| name.to_string())
            .collect();

        for column in [
            &self.customer_id,
            &self.transaction_date,
            &self.transaction_value,
        ] {
            if !available.iter().any(|name| name == column) {
                return Err(RfmError::ColumnMismatch {
                    column: column.clone(),
                    available,
                });
            }
        }

        Ok(())
    }
}

impl Default for ColumnMapping {
    fn default() -> Self {
        ColumnMapping::new("CustomerID", "TransactionDate", "TransactionValue")
    }
}

/// Load a CSV file with a header row and convert it to transactions
///
/// # Arguments
/// * `file_path` - Path to the CSV file
/// * `columns` - Which source columns hold the id, date and value
///
/// # Returns
/// * All rows as `Transaction`s, or the first column or parse error
pub fn load_transactions(
    file_path: impl AsRef<Path>,
    columns: &ColumnMapping,
) -> crate::Result<Vec<Transaction>> {
    let frame = CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(file_path.as_ref().to_path_buf()))?
        .finish()?;

    log::debug!(
        "Read {} rows x {} columns from {}",
        frame.height(),
        frame.width(),
        file_path.as_ref().display()
    );

    transactions_from_frame(&frame, columns)
}

/// Convert an in-memory table to transactions.
///
/// The column mapping is checked before any row is read. Any bad cell fails
/// the whole table; no rows are skipped.
pub fn transactions_from_frame(
    frame: &DataFrame,
    columns: &ColumnMapping,
) -> crate::Result<Vec<Transaction>> {
    columns.validate_against(frame)?;

    let customer_ids = required_strings(frame, &columns.customer_id, "customer_id")?
        .into_iter()
        .enumerate()
        .map(|(row, raw)| {
            if raw.trim().is_empty() {
                Err(RfmError::parse("customer_id", row, raw))
            } else {
                Ok(CustomerId::new(raw))
            }
        })
        .collect::<crate::Result<Vec<_>>>()?;
    let dates = normalize_dates(&required_strings(
        frame,
        &columns.transaction_date,
        "transaction_date",
    )?)?;
    let values = amounts(frame, &columns.transaction_value)?;

    Ok(customer_ids
        .into_iter()
        .zip(dates)
        .zip(values)
        .map(|((customer_id, date), value)| Transaction::new(customer_id, date, value))
        .collect())
}

/// Build the transactions of a single manually entered customer
///
/// # Arguments
/// * `customer_id` - Id of the synthetic customer
/// * `dates` - Comma-separated `YYYY-MM-DD` dates
/// * `values` - Comma-separated decimal amounts, one per date
pub fn manual_transactions(
    customer_id: &str,
    dates: &str,
    values: &str,
) -> crate::Result<Vec<Transaction>> {
    if customer_id.trim().is_empty() {
        return Err(RfmError::parse("customer_id", 0, customer_id));
    }

    let dates = dates
        .split(',')
        .enumerate()
        .map(|(row, raw)| parse_manual_date(raw, row))
        .collect::<crate::Result<Vec<_>>>()?;
    let values = values
        .split(',')
        .enumerate()
        .map(|(row, raw)| parse_value(raw, row))
        .collect::<crate::Result<Vec<_>>>()?;

    if dates.len() != values.len() {
        return Err(RfmError::ManualEntryMismatch {
            dates: dates.len(),
            values: values.len(),
        });
    }

    let customer_id = CustomerId::new(customer_id);
    Ok(dates
        .into_iter()
        .zip(values)
        .map(|(date, value)| Transaction::new(customer_id.clone(), date, value))
        .collect())
}

/// Parse a transaction amount; non-finite values are rejected
fn parse_value(raw: &str, row: usize) -> crate::Result<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| RfmError::parse("transaction_value", row, raw))
}

/// Read a column as strings, whatever its inferred dtype; a null cell fails the batch
fn required_strings(
    frame: &DataFrame,
    column: &str,
    field: &'static str,
) -> crate::Result<Vec<String>> {
    let series = frame.column(column)?.cast(&DataType::String)?;
    series
        .str()?
        .into_iter()
        .enumerate()
        .map(|(row, cell)| {
            cell.map(str::to_owned)
                .ok_or_else(|| RfmError::parse(field, row, ""))
        })
        .collect()
}

/// Cast the value column to `Float64`; cells that do not cast, or are not finite, fail the batch
fn amounts(frame: &DataFrame, column: &str) -> crate::Result<Vec<f64>> {
    let source = frame.column(column)?;
    let numeric = source.cast(&DataType::Float64)?;

    numeric
        .f64()?
        .into_iter()
        .enumerate()
        .map(|(row, cell)| {
            cell.filter(|value| value.is_finite()).ok_or_else(|| {
                let raw = source
                    .str_value(row)
                    .map(|value| value.into_owned())
                    .unwrap_or_default();
                RfmError::parse("transaction_value", row, raw)
            })
        })
        .collect()
}
