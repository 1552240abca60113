//! Time-related utilities

use chrono::{DateTime, NaiveDate, NaiveTime, ParseError, Utc};

/// Parse a birth date given either as `YYYY-MM-DD` (midnight UTC) or as a
/// full RFC 3339 timestamp.
pub fn parse_birth_date(s: &str) -> Result<DateTime<Utc>, ParseError> {
    let s = s.trim();
    match NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        Ok(date) => Ok(date.and_time(NaiveTime::MIN).and_utc()),
        Err(_) => DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc)),
    }
}
