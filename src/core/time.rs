//! WIB (UTC+7) timestamp helpers.
//!
//! Timestamps are stored in cells as text such as `2024-01-15 14:30:00 WIB`. Older rows may
//! carry the `dd/mm/yyyy, hh.mm.ss` shape produced by an Indonesian locale, or plain dates,
//! so parsing accepts several layouts. Everything is converted to UTC internally.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, TimeZone, Utc};

/// Offset of Western Indonesian Time from UTC, in hours.
pub const WIB_OFFSET_HOURS: i64 = 7;

const WIB_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const DATETIME_FORMATS: &[&str] = &[
    WIB_FORMAT,
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y, %H.%M.%S",
    "%d/%m/%Y %H.%M.%S",
    "%d/%m/%Y, %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y"];

fn wib_offset() -> TimeDelta {
    TimeDelta::hours(WIB_OFFSET_HOURS)
}

/// Wall-clock time in WIB for a UTC instant.
#[must_use]
pub fn to_wib(instant: DateTime<Utc>) -> NaiveDateTime {
    instant.naive_utc() + wib_offset()
}

/// UTC instant for a WIB wall-clock time.
#[must_use]
pub fn from_wib(local: NaiveDateTime) -> DateTime<Utc> {
    Utc.from_utc_datetime(&(local - wib_offset()))
}

/// Formats an instant the way ledger cells store it, e.g. `2024-01-15 14:30:00 WIB`.
#[must_use]
pub fn format_wib(instant: DateTime<Utc>) -> String {
    format!("{} WIB", to_wib(instant).format(WIB_FORMAT))
}

/// Formats only the WIB calendar date, e.g. `2024-01-15`.
#[must_use]
pub fn format_wib_date(instant: DateTime<Utc>) -> String {
    to_wib(instant).format("%Y-%m-%d").to_string()
}

/// Parses a cell timestamp. Returns `None` for blank or unrecognised text.
///
/// Text without an explicit offset is read as WIB wall-clock time. RFC 3339 strings keep
/// their own offset.
#[must_use]
pub fn parse_wib(text: &str) -> Option<DateTime<Utc>> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(with_offset) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(with_offset.with_timezone(&Utc));
    }

    let local = trimmed
        .strip_suffix("WIB")
        .map_or(trimmed, str::trim_end)
        .trim_end_matches(',');

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(local, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(local, fmt).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        .map(from_wib)
}

/// Builds a record id from the creation instant. `seq` separates ids minted in the same
/// millisecond by one operation.
#[must_use]
pub fn record_id(prefix: &str, now: DateTime<Utc>, seq: usize) -> String {
    format!("{prefix}-{}-{seq}", now.timestamp_millis())
}
