//! Lenient calendar-date parsing shared by both stores

use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Canonical rendering for dates in API payloads
pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

/// Date-only layouts, month-first where ambiguous
const DATE_FORMATS: &[&str] = &[
    ISO_DATE_FORMAT,
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d-%b-%Y",
    "%d %b %Y",
    "%b %d, %Y",
    "%B %d, %Y",
];

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// Parse a raw cell into a calendar date.
///
/// Returns `None` for empty, malformed or non-calendrical input
/// (e.g. `2021-02-30`). Time-of-day components are discarded.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }

    if let Some(date) =
        DATE_FORMATS.iter().find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
    {
        return Some(date);
    }

    if let Some(datetime) =
        DATETIME_FORMATS.iter().find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
    {
        return Some(datetime.date());
    }

    DateTime::parse_from_rfc3339(value).ok().map(|dt| dt.date_naive())
}

/// Render a date as `YYYY-MM-DD`
pub fn format_date(date: NaiveDate) -> String {
    date.format(ISO_DATE_FORMAT).to_string()
}
