//! Date normalization and the reference instant used for recency

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, Utc};

use crate::error::RfmError;

/// The only format accepted for manually entered dates
pub const MANUAL_DATE_FORMAT: &str = "%Y-%m-%d";

const DATETIME_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%m/%d/%Y"];

/// Capture "now" from the local wall clock.
///
/// Naive timestamps in exports are local times, so "now" is too. Read this
/// once per computation and pass it down; every recency in a batch must be
/// measured against the same instant.
pub fn reference_now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Parse a pinned reference date (`YYYY-MM-DD`, taken at midnight)
pub fn parse_reference_date(raw: &str) -> crate::Result<NaiveDateTime> {
    parse_manual_date(raw, 0).map_err(|_| RfmError::parse("reference_date", 0, raw))
}

/// Parse a date cell coming from a tabular source.
///
/// Accepts RFC 3339 timestamps (converted to UTC), ISO-like date-times with
/// optional fractional seconds, plain ISO dates and US-style `M/D/YYYY`
/// exports. `row` is only used for the error message.
pub fn parse_transaction_date(raw: &str, row: usize) -> crate::Result<NaiveDateTime> {
    let trimmed = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc).naive_utc());
    }

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(dt);
        }
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Ok(date.and_time(chrono::NaiveTime::MIN));
        }
    }

    Err(RfmError::parse("transaction_date", row, raw))
}

/// Parse a manually entered date; only `YYYY-MM-DD` is accepted
pub fn parse_manual_date(raw: &str, row: usize) -> crate::Result<NaiveDateTime> {
    NaiveDate::parse_from_str(raw.trim(), MANUAL_DATE_FORMAT)
        .map(|date| date.and_time(chrono::NaiveTime::MIN))
        .map_err(|_| RfmError::parse("transaction_date", row, raw))
}

/// Parse a whole column of tabular dates, failing on the first bad cell
pub fn normalize_dates<S: AsRef<str>>(raw_dates: &[S]) -> crate::Result<Vec<NaiveDateTime>> {
    raw_dates
        .iter()
        .enumerate()
        .map(|(row, raw)| parse_transaction_date(raw.as_ref(), row))
        .collect()
}
