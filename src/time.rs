use chrono::{DateTime, Timelike, Utc};
use chrono_tz::Tz;

/// Parses an IANA zone name; `None` for blank or unknown names.
pub fn parse_tz(name: &str) -> Option<Tz> {
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    name.parse().ok()
}

/// Wall-clock time of `instant` in `tz`.
pub fn local_time(instant: DateTime<Utc>, tz: Tz) -> DateTime<Tz> {
    instant.with_timezone(&tz)
}

/// Daily send window: `hour:00` up to (not including) `hour:width_minutes`.
///
/// The width should match the invocation cadence; a run that misses the
/// window leaves that contact without a message for the day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendWindow {
    pub hour: u32,
    pub width_minutes: u32,
}

impl Default for SendWindow {
    fn default() -> Self {
        Self { hour: 9, width_minutes: 10 }
    }
}

impl SendWindow {
    pub fn contains(&self, local: &impl Timelike) -> bool {
        in_window(local, self.hour, self.width_minutes)
    }
}

pub fn in_window(local: &impl Timelike, target_hour: u32, tolerance_minutes: u32) -> bool {
    local.hour() == target_hour && local.minute() < tolerance_minutes
}
