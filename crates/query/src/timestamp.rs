//! Lenient timestamp parsing.
//!
//! The remote service emits RFC 3339 timestamps for `timestamp` fields but
//! naive ISO-8601 values (no offset) for `datetime` fields. Naive values are
//! interpreted as UTC.

use time::format_description::BorrowedFormatItem;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, UtcOffset};

const NAIVE_DATETIME: &[BorrowedFormatItem<'_>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second][optional [.[subsecond]]]");
const NAIVE_DATETIME_SPACED: &[BorrowedFormatItem<'_>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second][optional [.[subsecond]]]");
const NAIVE_DATE: &[BorrowedFormatItem<'_>] = format_description!("[year]-[month]-[day]");

/// Parse a timestamp, normalising the result to UTC.
///
/// Returns `None` when the input matches none of the accepted shapes.
pub fn parse(input: &str) -> Option<OffsetDateTime> {
    let input = input.trim();
    if let Ok(parsed) = OffsetDateTime::parse(input, &Rfc3339) {
        return Some(parsed.to_offset(UtcOffset::UTC));
    }
    if let Ok(parsed) = PrimitiveDateTime::parse(input, NAIVE_DATETIME) {
        return Some(parsed.assume_utc());
    }
    if let Ok(parsed) = PrimitiveDateTime::parse(input, NAIVE_DATETIME_SPACED) {
        return Some(parsed.assume_utc());
    }
    Date::parse(input, NAIVE_DATE).ok().map(|date| date.midnight().assume_utc())
}

/// Format a timestamp as RFC 3339.
pub fn format(value: OffsetDateTime) -> Option<String> {
    value.to_offset(UtcOffset::UTC).format(&Rfc3339).ok()
}
