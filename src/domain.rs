use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Birthday,
    NameDay,
}

impl EventKind {
    /// Maps a roster `event_type` cell. Unknown values yield `None`.
    pub fn from_roster(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "cumple" => Some(Self::Birthday),
            "santo" => Some(Self::NameDay),
            _ => None,
        }
    }
}

/// Template sent for each kind unless the engine is given another table.
pub const DEFAULT_TEMPLATES: &[(EventKind, &str)] = &[
    (EventKind::Birthday, "feliz_cumple"),
    (EventKind::NameDay, "feliz_santo"),
];

/// A stored event date, parsed once when the row is admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventDate {
    /// Full calendar date; the year is carried but never compared.
    Fixed(NaiveDate),
    /// Month/day mark that recurs every year (`----MM-DD`).
    Recurring { month: u32, day: u32 },
}

/// One roster row as read from the file: trimmed cells, nothing validated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ContactRow {
    pub name: String,
    pub phone: String,
    pub event_type: String,
    pub date: String,
    pub lang: String,
    pub tz: String,
}

/// A row that passed admission: required fields present, kind and date understood.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    pub name: String,
    pub phone: String,
    pub kind: EventKind,
    pub date: EventDate,
    pub lang: String,

    /// Explicit IANA zone from the roster; wins over phone inference.
    pub tz: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EligibilityDecision {
    pub contact: Contact,
    pub zone: Tz,
    pub local_time: DateTime<Tz>,
    pub template_name: String,
    pub language_code: String,

    /// Ordered template body parameters: `[contact name, sender name]`.
    pub params: Vec<String>,
    pub should_send: bool,
}
