//! # Temporal Parsing: `date` and `date-time` Formats
//!
//! `date` values are calendar dates in `YYYY-MM-DD` form with no time
//! component. `date-time` values are RFC 3339 timestamps; an ISO 8601
//! timestamp without an offset is accepted and interpreted as UTC.
//!
//! Rendering goes the other way: dates as `YYYY-MM-DD`, timestamps as
//! RFC 3339 with `Z` for a zero offset, so a parsed literal re-formats to
//! itself.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, SecondsFormat};

use crate::error::FormatError;

/// Parse a full-date (`2020-01-02`).
///
/// # Errors
///
/// Returns a `FormatError` if the string is not a valid calendar date.
pub fn parse_date(s: &str) -> Result<NaiveDate, FormatError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| FormatError::new(format!("invalid date {s:?}: {e}")))
}

/// Parse a date-time (`2020-01-02T03:04:05Z`, `2020-01-02T03:04:05.5+02:00`,
/// or offset-less `2020-01-02T03:04:05` taken as UTC).
///
/// # Errors
///
/// Returns a `FormatError` if the string is neither RFC 3339 nor an
/// offset-less ISO 8601 timestamp.
pub fn parse_datetime(s: &str) -> Result<DateTime<FixedOffset>, FormatError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt);
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc().fixed_offset())
        .map_err(|e| FormatError::new(format!("invalid date-time {s:?}: {e}")))
}

/// Render a date as `YYYY-MM-DD`.
pub fn format_date(date: &NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Render a timestamp as RFC 3339, `Z` for UTC, sub-seconds only when present.
pub fn format_datetime(dt: &DateTime<FixedOffset>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}
