//! Date parsing and display formatting for post publication dates.

use chrono::{
    DateTime, FixedOffset, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc,
};

/// The text [`format_date`] returns for input that can't be read as a date.
pub const INVALID_DATE: &str = "Invalid Date";

/// The display format: abbreviated month, unpadded day, full year (e.g.,
/// `Dec 14, 2025`).
const DISPLAY_FORMAT: &str = "%b %-d, %Y";

/// Naive (offset-less) date-time layouts accepted by [`parse_date`]. These
/// are interpreted as UTC.
const NAIVE_DATE_TIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

/// Either an already-parsed timestamp or some text that should be parsed as
/// one.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DateInput<'a> {
    Timestamp(DateTime<FixedOffset>),
    Text(&'a str),
}

impl From<DateTime<FixedOffset>> for DateInput<'_> {
    fn from(date: DateTime<FixedOffset>) -> Self {
        DateInput::Timestamp(date)
    }
}

impl From<DateTime<Utc>> for DateInput<'_> {
    fn from(date: DateTime<Utc>) -> Self {
        DateInput::Timestamp(date.into())
    }
}

impl<'a> From<&'a str> for DateInput<'a> {
    fn from(text: &'a str) -> Self {
        DateInput::Text(text)
    }
}

impl<'a> From<&'a String> for DateInput<'a> {
    fn from(text: &'a String) -> Self {
        DateInput::Text(text)
    }
}

/// Formats a date for display, e.g. `Mar 2, 2024`. The date is rendered in
/// its own offset (a post dated `2024-03-02` reads as March 2 regardless of
/// where the site is built). Text that [`parse_date`] rejects yields
/// [`INVALID_DATE`] instead of an error.
pub fn format_date<'a>(input: impl Into<DateInput<'a>>) -> String {
    let date = match input.into() {
        DateInput::Timestamp(date) => date,
        DateInput::Text(text) => match parse_date(text) {
            Some(date) => date,
            None => return INVALID_DATE.to_owned(),
        },
    };
    date.format(DISPLAY_FORMAT).to_string()
}

/// Parses a date from RFC 3339 (`2024-03-02T09:30:00+01:00`), a naive
/// date-time (`2024-03-02T09:30:00` or `2024-03-02 09:30:00`), or a bare date
/// (`2024-03-02`). Naive values are taken to be UTC and bare dates to be
/// midnight.
pub fn parse_date(text: &str) -> Option<DateTime<FixedOffset>> {
    let text = text.trim();
    if let Ok(date) = DateTime::parse_from_rfc3339(text) {
        return Some(date);
    }

    let naive = NAIVE_DATE_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })?;
    Some(Utc.fix().from_utc_datetime(&naive))
}
