//! Lenient ISO-8601 timestamp parsing.
//!
//! Timeline APIs emit fractional seconds with anything from 0 to 7+ digits.
//! The fraction is cut or padded to exactly milliseconds before parsing.
//! Anything unparseable is `None`; parsing never fails loudly.

use std::borrow::Cow;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Parse a timeline timestamp into UTC.
///
/// Accepts RFC 3339 (`Z` or numeric offset), naive date-times (taken as UTC),
/// and bare dates (midnight UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let normalized = normalize_fraction(trimmed);

    if let Ok(parsed) = DateTime::parse_from_rfc3339(&normalized) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(&normalized, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(&normalized, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Rewrite the fractional-second part of the time to exactly three digits.
fn normalize_fraction(raw: &str) -> Cow<'_, str> {
    let Some(time_start) = raw.find(|c: char| c == 'T' || c == 't' || c == ' ') else {
        return Cow::Borrowed(raw);
    };
    let Some(dot_offset) = raw[time_start..].find('.') else {
        return Cow::Borrowed(raw);
    };
    let dot = time_start + dot_offset;
    let digits_start = dot + 1;
    let digits_end = raw[digits_start..]
        .find(|c: char| !c.is_ascii_digit())
        .map_or(raw.len(), |i| digits_start + i);

    let digits = &raw[digits_start..digits_end];
    if digits.is_empty() || digits.len() == 3 {
        return Cow::Borrowed(raw);
    }

    let mut millis: String = digits.chars().take(3).collect();
    while millis.len() < 3 {
        millis.push('0');
    }
    Cow::Owned(format!("{}.{}{}", &raw[..dot], millis, &raw[digits_end..]))
}
