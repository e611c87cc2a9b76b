use std::collections::HashMap;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::debug;

use crate::config::Config;
use crate::domain::{Contact, ContactRow, EligibilityDecision, EventKind, DEFAULT_TEMPLATES};
use crate::matcher::{matches_date, parse_event_date};
use crate::time::{local_time, parse_tz, SendWindow};
use crate::tz_resolver::TimezoneResolver;

/// Decides, per contact, whether the greeting goes out right now.
///
/// Every check runs in the contact's own local frame; the host zone never
/// enters the decision. Holds no per-contact state, so one engine can
/// evaluate a whole roster (or several rosters concurrently).
#[derive(Debug, Clone)]
pub struct EligibilityEngine {
    resolver: TimezoneResolver,
    templates: HashMap<EventKind, String>,
    window: SendWindow,
    default_lang: String,
    sender_name: String,
}

impl EligibilityEngine {
    pub fn new(resolver: TimezoneResolver, window: SendWindow, default_lang: &str, sender_name: &str) -> Self {
        Self {
            resolver,
            templates: HashMap::new(),
            window,
            default_lang: default_lang.to_lowercase(),
            sender_name: sender_name.to_string(),
        }
        .with_templates(DEFAULT_TEMPLATES)
    }

    pub fn from_config(cfg: &Config) -> Self {
        let window = SendWindow {
            hour: cfg.send_hour,
            width_minutes: cfg.send_window_minutes,
        };
        Self::new(TimezoneResolver::default(), window, &cfg.default_lang, &cfg.sender_name)
    }

    pub fn with_templates(mut self, table: &[(EventKind, &str)]) -> Self {
        self.templates = table.iter().map(|(kind, name)| (*kind, (*name).to_string())).collect();
        self
    }

    /// Validates a raw row. `None` means the row is not a candidate at all.
    pub fn admit(&self, row: &ContactRow) -> Option<Contact> {
        if row.phone.is_empty() || row.date.is_empty() {
            debug!(name = %row.name, "engine.skip.missing_field");
            return None;
        }
        let Some(kind) = EventKind::from_roster(&row.event_type) else {
            debug!(name = %row.name, event_type = %row.event_type, "engine.skip.unknown_kind");
            return None;
        };
        if !self.templates.contains_key(&kind) {
            debug!(name = %row.name, ?kind, "engine.skip.no_template");
            return None;
        }
        let Some(date) = parse_event_date(&row.date, kind) else {
            debug!(name = %row.name, date = %row.date, "engine.skip.bad_date");
            return None;
        };

        let lang = match row.lang.trim() {
            "" => self.default_lang.clone(),
            lang => lang.to_lowercase(),
        };
        let tz = Some(row.tz.trim()).filter(|s| !s.is_empty()).map(str::to_string);

        Some(Contact {
            name: row.name.clone(),
            phone: row.phone.clone(),
            kind,
            date,
            lang,
            tz,
        })
    }

    /// Explicit zone first (UTC if it is not a valid IANA name), then phone
    /// inference, then UTC.
    pub fn zone_for(&self, contact: &Contact) -> Tz {
        match contact.tz.as_deref() {
            Some(name) => parse_tz(name).unwrap_or_else(|| {
                debug!(phone = %contact.phone, tz = %name, "engine.bad_explicit_tz");
                Tz::UTC
            }),
            None => self.resolver.resolve(&contact.phone).unwrap_or(Tz::UTC),
        }
    }

    pub fn decide(&self, contact: &Contact, now: DateTime<Utc>) -> EligibilityDecision {
        let zone = self.zone_for(contact);
        let local = local_time(now, zone);

        let is_today = matches_date(&contact.date, &local);
        let in_window = self.window.contains(&local);
        let should_send = is_today && in_window && !contact.name.is_empty();

        EligibilityDecision {
            contact: contact.clone(),
            zone,
            local_time: local,
            template_name: self.templates.get(&contact.kind).cloned().unwrap_or_default(),
            language_code: contact.lang.clone(),
            params: vec![contact.name.clone(), self.sender_name.clone()],
            should_send,
        }
    }

    pub fn evaluate(&self, row: &ContactRow, now: DateTime<Utc>) -> Option<EligibilityDecision> {
        self.admit(row).map(|contact| self.decide(&contact, now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::{America, Europe};

    fn engine() -> EligibilityEngine {
        EligibilityEngine::new(TimezoneResolver::default(), SendWindow::default(), "es", "Un amigo")
    }

    fn row(phone: &str, event_type: &str, date: &str, tz: &str) -> ContactRow {
        ContactRow {
            name: "Lucia".into(),
            phone: phone.into(),
            event_type: event_type.into(),
            date: date.into(),
            lang: String::new(),
            tz: tz.into(),
        }
    }

    fn instant_in(tz: Tz, y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        tz.with_ymd_and_hms(y, mo, d, h, mi, 0).single().unwrap().with_timezone(&Utc)
    }

    #[test]
    fn birthday_inferred_zone_inside_window() {
        let now = instant_in(Europe::Madrid, 2030, 6, 15, 9, 3);
        let d = engine()
            .evaluate(&row("34600000000", "cumple", "2030-06-15", ""), now)
            .unwrap();
        assert_eq!(d.zone, Europe::Madrid);
        assert!(d.should_send);
        assert_eq!(d.template_name, "feliz_cumple");
        assert_eq!(d.language_code, "es");
        assert_eq!(d.params, vec!["Lucia".to_string(), "Un amigo".to_string()]);
    }

    #[test]
    fn name_day_with_explicit_zone_any_year() {
        for year in [2024, 2031, 2045] {
            let now = instant_in(America::New_York, year, 6, 15, 9, 5);
            let d = engine()
                .evaluate(&row("12015550123", "santo", "----06-15", "America/New_York"), now)
                .unwrap();
            assert!(d.should_send, "{year}");
            assert_eq!(d.template_name, "feliz_santo");
            assert_eq!(d.zone, America::New_York);
        }
    }

    #[test]
    fn outside_window_is_not_sent() {
        let now = instant_in(Europe::Madrid, 2030, 6, 15, 9, 11);
        let d = engine()
            .evaluate(&row("34600000000", "cumple", "2030-06-15", ""), now)
            .unwrap();
        assert!(!d.should_send);
    }

    #[test]
    fn unknown_kind_is_skipped() {
        let now = instant_in(Europe::Madrid, 2030, 6, 15, 9, 3);
        assert!(engine()
            .evaluate(&row("34600000000", "aniversario", "2030-06-15", ""), now)
            .is_none());
    }

    #[test]
    fn missing_phone_or_date_is_skipped() {
        let now = instant_in(Europe::Madrid, 2030, 6, 15, 9, 3);
        assert!(engine().evaluate(&row("", "cumple", "2030-06-15", ""), now).is_none());
        assert!(engine().evaluate(&row("34600000000", "cumple", "", ""), now).is_none());
        assert!(engine().evaluate(&row("34600000000", "cumple", "15/06", ""), now).is_none());
    }

    #[test]
    fn kind_is_case_insensitive() {
        let now = instant_in(Europe::Madrid, 2030, 6, 15, 9, 0);
        let d = engine()
            .evaluate(&row("34600000000", "CUMPLE", "1980-06-15", ""), now)
            .unwrap();
        assert!(d.should_send);
    }

    #[test]
    fn local_day_not_host_day() {
        // 09:00 in Madrid on the 15th is still the 15th; at the same instant
        // Auckland is already on the evening of the 15th, outside the window.
        let now = instant_in(Europe::Madrid, 2030, 6, 15, 9, 0);
        let d = engine()
            .evaluate(&row("34600000000", "cumple", "2000-06-15", "Pacific/Auckland"), now)
            .unwrap();
        assert!(!d.should_send);

        // 09:00 in Los Angeles on the 15th is already the 15th 16:00 UTC.
        let now = instant_in(America::Los_Angeles, 2030, 6, 15, 9, 0);
        let d = engine()
            .evaluate(&row("34600000000", "cumple", "2000-06-15", "America/Los_Angeles"), now)
            .unwrap();
        assert!(d.should_send);
        let d = engine()
            .evaluate(&row("34600000000", "cumple", "2000-06-15", ""), now)
            .unwrap();
        assert!(!d.should_send);
    }

    #[test]
    fn explicit_zone_bypasses_unparseable_phone() {
        let now = instant_in(America::New_York, 2030, 6, 15, 9, 1);
        let d = engine()
            .evaluate(&row("not-a-number", "cumple", "1990-06-15", "America/New_York"), now)
            .unwrap();
        assert_eq!(d.zone, America::New_York);
        assert!(d.should_send);
    }

    #[test]
    fn unresolvable_zone_falls_back_to_utc() {
        let now = Utc.with_ymd_and_hms(2030, 6, 15, 9, 4, 0).single().unwrap();
        let by_phone = engine()
            .evaluate(&row("abc", "cumple", "1990-06-15", ""), now)
            .unwrap();
        assert_eq!(by_phone.zone, Tz::UTC);
        assert!(by_phone.should_send);

        let by_name = engine()
            .evaluate(&row("34600000000", "cumple", "1990-06-15", "Europe/Atlantis"), now)
            .unwrap();
        assert_eq!(by_name.zone, Tz::UTC);
        assert!(by_name.should_send);
    }

    #[test]
    fn blank_lang_uses_default_and_lang_is_lowercased() {
        let now = instant_in(Europe::Madrid, 2030, 6, 15, 9, 3);
        let mut r = row("34600000000", "cumple", "2030-06-15", "");
        r.lang = "EN".into();
        assert_eq!(engine().evaluate(&r, now).unwrap().language_code, "en");

        let e = EligibilityEngine::new(TimezoneResolver::default(), SendWindow::default(), "PT_BR", "x");
        r.lang.clear();
        assert_eq!(e.evaluate(&r, now).unwrap().language_code, "pt_br");
    }

    #[test]
    fn blank_name_is_never_sent() {
        let now = instant_in(Europe::Madrid, 2030, 6, 15, 9, 3);
        let mut r = row("34600000000", "cumple", "2030-06-15", "");
        r.name.clear();
        assert!(!engine().evaluate(&r, now).unwrap().should_send);
    }

    #[test]
    fn templates_are_injectable() {
        let now = instant_in(Europe::Madrid, 2030, 6, 15, 9, 3);
        let e = engine().with_templates(&[(EventKind::Birthday, "happy_birthday")]);
        let d = e.evaluate(&row("34600000000", "cumple", "2030-06-15", ""), now).unwrap();
        assert_eq!(d.template_name, "happy_birthday");
        assert!(e.evaluate(&row("34600000000", "santo", "----06-15", ""), now).is_none());
    }

    #[test]
    fn same_inputs_same_decision() {
        let now = instant_in(Europe::Madrid, 2030, 6, 15, 9, 3);
        let r = row("34600000000", "cumple", "2030-06-15", "");
        let e = engine();
        assert_eq!(e.evaluate(&r, now), e.evaluate(&r, now));
    }
}
