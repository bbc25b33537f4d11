// SPDX-License-Identifier: MIT

//! Shared helpers for date parsing and formatting.

use crate::error::AppError;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

/// Parse a `YYYY-MM-DD` date string, mapping failures to `InvalidDate`.
pub fn parse_iso_date(s: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| AppError::InvalidDate(format!("Invalid date format: {s}. Use YYYY-MM-DD.")))
}

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}
