//! Retry-After resolution.
//!
//! Push services may answer a throttled or failed request with a `Retry-After`
//! header, either as delta-seconds (`Retry-After: 120`) or as an HTTP-date
//! (`Retry-After: Wed, 21 Oct 2015 07:28:00 GMT`). When the header is missing
//! or malformed, the retry time falls back to exponential backoff keyed to the
//! notification's retry generation: 2, 4, 8, 16... seconds.

use chrono::{DateTime, NaiveDateTime, TimeDelta, TimeZone, Utc};

/// Largest exponent used for the fallback backoff (2^24 s is roughly 194 days).
const MAX_BACKOFF_EXPONENT: u32 = 24;

/// HTTP-date forms (RFC 9110 §5.6.7), all in GMT.
const HTTP_DATE_FORMATS: &[&str] = &[
    // IMF-fixdate: Sun, 06 Nov 1994 08:49:37 GMT
    "%a, %d %b %Y %H:%M:%S GMT",
    // obsolete RFC 850: Sunday, 06-Nov-94 08:49:37 GMT
    "%A, %d-%b-%y %H:%M:%S GMT",
    // asctime: Sun Nov  6 08:49:37 1994
    "%a %b %e %H:%M:%S %Y",
];

/// Parse a raw `Retry-After` value into an absolute time.
///
/// Returns `None` for anything that is neither plain ASCII digits nor one of
/// the three HTTP-date forms. Dates with a numeric offset are rejected.
pub fn parse(value: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if value.bytes().all(|b| b.is_ascii_digit()) {
        let seconds: i64 = value.parse().ok()?;
        let offset = TimeDelta::try_seconds(seconds)?;
        return now.checked_add_signed(offset);
    }

    parse_http_date(value)
}

fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    HTTP_DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Exponential fallback: `now + 2^(retries + 1)` seconds.
pub fn backoff(retries: u32, now: DateTime<Utc>) -> DateTime<Utc> {
    let exponent = retries.saturating_add(1).min(MAX_BACKOFF_EXPONENT);
    now + TimeDelta::seconds(1i64 << exponent)
}

/// Resolve the time at which a failed endpoint may be retried.
///
/// A well-formed header always wins over the backoff fallback.
pub fn resolve(header: Option<&str>, retries: u32, now: DateTime<Utc>) -> DateTime<Utc> {
    header
        .and_then(|value| parse(value, now))
        .unwrap_or_else(|| backoff(retries, now))
}
