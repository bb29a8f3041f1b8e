//! Date header formatting, parsing and the clock used for freshness checks.

use std::fmt;

use chrono::{DateTime, Utc};

/// RFC 1123 format used for the date header, e.g. `Tue, 15 Nov 1994 08:12:31 GMT`.
const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Format a timestamp as an RFC 1123 HTTP date.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use sharedkey_auth::date::format_http_date;
///
/// let time = Utc.with_ymd_and_hms(1994, 11, 15, 8, 12, 31).unwrap();
/// assert_eq!(format_http_date(time), "Tue, 15 Nov 1994 08:12:31 GMT");
/// ```
#[must_use]
pub fn format_http_date(time: DateTime<Utc>) -> String {
    time.format(HTTP_DATE_FORMAT).to_string()
}

/// Parse a date header value.
///
/// RFC 1123 (and the wider RFC 2822 family) is the wire format; RFC 3339 is accepted as well.
/// Returns `None` when the value is not a date.
#[must_use]
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    DateTime::parse_from_rfc2822(value)
        .or_else(|_| DateTime::parse_from_rfc3339(value))
        .ok()
        .map(|time| time.with_timezone(&Utc))
}

/// Source of the current time.
pub trait Clock: Send + Sync + fmt::Debug {
    /// The current UTC time.
    fn now(&self) -> DateTime<Utc>;
}

/// The system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at a given instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
