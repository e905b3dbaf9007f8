//! Time related utils.

use chrono::Utc;

use crate::Error;
use crate::Result;

/// DateTime in UTC.
pub type DateTime = chrono::DateTime<Utc>;

/// Get the current time in UTC.
pub fn now() -> DateTime {
    Utc::now()
}

/// Format a time into the HTTP date form used by `Date` style headers.
///
/// e.g. `Tue, 01 Jan 2019 00:00:00 GMT`
pub fn format_http_date(t: DateTime) -> String {
    t.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Format a time into RFC 3339 with second precision.
///
/// e.g. `2022-03-01T08:12:34Z`
///
/// Signing contracts compare these strings byte for byte, so fractional
/// seconds are always dropped.
pub fn format_rfc3339(t: DateTime) -> String {
    t.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Parse an RFC 3339 timestamp into UTC.
pub fn parse_rfc3339(s: &str) -> Result<DateTime> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::unexpected("failed to parse rfc3339 time").with_source(e))
}
