use chrono::{Datelike, NaiveDate, NaiveDateTime};

use crate::domain::{EventDate, EventKind};

/// Placeholder standing in for the year of a recurring date.
pub const RECURRING_PREFIX: &str = "----";

/// Parses a roster date cell for `kind`.
///
/// The `----MM-DD` shape is only honoured for name days; anything else must
/// be an ISO date (or date-time). Returns `None` when the cell can never
/// match a day.
pub fn parse_event_date(expr: &str, kind: EventKind) -> Option<EventDate> {
    let expr = expr.trim();
    if kind == EventKind::NameDay && expr.starts_with(RECURRING_PREFIX) {
        return parse_month_day(expr);
    }
    parse_fixed(expr).map(EventDate::Fixed)
}

// Only the trailing five characters are read; the placeholder itself is not validated.
fn parse_month_day(expr: &str) -> Option<EventDate> {
    let tail = expr.get(expr.len().checked_sub(5)?..)?;
    let (mm, dd) = tail.split_once('-')?;
    if !is_two_digits(mm) || !is_two_digits(dd) {
        return None;
    }
    let month: u32 = mm.parse().ok()?;
    let day: u32 = dd.parse().ok()?;
    // 2000 is a leap year, so 02-29 stays representable.
    NaiveDate::from_ymd_opt(2000, month, day)?;
    Some(EventDate::Recurring { month, day })
}

fn is_two_digits(s: &str) -> bool {
    s.len() == 2 && s.bytes().all(|b| b.is_ascii_digit())
}

// Zero-padded `YYYY-MM-DD` at the start of the cell.
fn has_padded_iso_date(expr: &str) -> bool {
    let Some(head) = expr.as_bytes().get(..10) else {
        return false;
    };
    head.iter().enumerate().all(|(i, b)| match i {
        4 | 7 => *b == b'-',
        _ => b.is_ascii_digit(),
    })
}

fn parse_fixed(expr: &str) -> Option<NaiveDate> {
    if !has_padded_iso_date(expr) {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(expr, "%Y-%m-%d") {
        return Some(date);
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(expr, fmt).ok())
        .map(|dt| dt.date())
}

/// True when `date` falls on the month and day of `local`.
pub fn matches_date(date: &EventDate, local: &impl Datelike) -> bool {
    let (month, day) = match *date {
        EventDate::Fixed(d) => (d.month(), d.day()),
        EventDate::Recurring { month, day } => (month, day),
    };
    (month, day) == (local.month(), local.day())
}

/// Parse-and-match in one step; malformed dates never match.
#[cfg(test)]
pub fn matches(expr: &str, kind: EventKind, local: &impl Datelike) -> bool {
    parse_event_date(expr, kind).is_some_and(|date| matches_date(&date, local))
}
