use std::collections::HashMap;

use chrono_tz::Tz;
use tracing::{debug, warn};

use crate::zones::{zones_for_country, DEFAULT_COUNTRY_OVERRIDES};

/// Infers a contact's zone from the country behind their phone number.
///
/// Single-zone countries resolve directly. Multi-zone countries use the
/// override table when they have an entry, otherwise the first zone tzdata
/// lists for them.
#[derive(Debug, Clone)]
pub struct TimezoneResolver {
    overrides: HashMap<String, Tz>,
}

impl Default for TimezoneResolver {
    fn default() -> Self {
        Self::new(DEFAULT_COUNTRY_OVERRIDES)
    }
}

impl TimezoneResolver {
    pub fn new(overrides: &[(&str, &str)]) -> Self {
        let overrides = overrides
            .iter()
            .filter_map(|(cc, zone)| match zone.parse::<Tz>() {
                Ok(tz) => Some((cc.to_uppercase(), tz)),
                Err(_) => {
                    warn!(country = %cc, zone = %zone, "tz_resolver.bad_override");
                    None
                }
            })
            .collect();
        Self { overrides }
    }

    /// `None` when the number does not parse or its country has no known zone.
    pub fn resolve(&self, phone: &str) -> Option<Tz> {
        let Some(region) = region_for_phone(phone) else {
            debug!(phone = %phone, "tz_resolver.no_region");
            return None;
        };
        self.zone_for_region(&region)
    }

    pub fn zone_for_region(&self, region: &str) -> Option<Tz> {
        let zones: Vec<Tz> = zones_for_country(region)
            .iter()
            .filter_map(|z| z.parse().ok())
            .collect();

        match zones.as_slice() {
            [] => None,
            [only] => Some(*only),
            [first, ..] => Some(self.overrides.get(region).copied().unwrap_or(*first)),
        }
    }
}

/// ISO-3166 alpha-2 region that issued `phone` (digits, `+` optional).
pub fn region_for_phone(phone: &str) -> Option<String> {
    let phone = phone.trim();
    if phone.is_empty() {
        return None;
    }
    let international = if phone.starts_with('+') {
        phone.to_string()
    } else {
        format!("+{phone}")
    };

    let number = phonenumber::parse(None, &international).ok()?;
    let id = number.country().id()?;
    Some(id.as_ref().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::{America, Asia, Australia, Europe};

    #[test]
    fn region_lookup() {
        assert_eq!(region_for_phone("34612345678").as_deref(), Some("ES"));
        assert_eq!(region_for_phone("+34612345678").as_deref(), Some("ES"));
        assert_eq!(region_for_phone("12015550123").as_deref(), Some("US"));
        assert_eq!(region_for_phone(""), None);
        assert_eq!(region_for_phone("not a phone"), None);
    }

    #[test]
    fn prefixes_and_separators() {
        // A `00` exit code is not stripped: "+0034..." is not a valid number.
        assert_eq!(region_for_phone("0034600000000"), None);
        // Punctuation inside an international number is tolerated.
        assert_eq!(region_for_phone("+34-600-000-000").as_deref(), Some("ES"));
        assert_eq!(
            TimezoneResolver::default().resolve("+34-600-000-000"),
            Some(Europe::Madrid)
        );
    }

    #[test]
    fn single_zone_country() {
        let r = TimezoneResolver::default();
        assert_eq!(r.resolve("918123456789"), Some(Asia::Kolkata));
        assert_eq!(r.zone_for_region("FR"), Some(Europe::Paris));
    }

    #[test]
    fn multi_zone_country_uses_override() {
        let r = TimezoneResolver::default();
        assert_eq!(r.resolve("12015550123"), Some(America::New_York));
        assert_eq!(r.resolve("15062345678"), Some(America::Toronto));
        assert_eq!(r.resolve("61412345678"), Some(Australia::Sydney));
        assert_eq!(r.resolve("5511961234567"), Some(America::Sao_Paulo));
        assert_eq!(r.resolve("79123456789"), Some(Europe::Moscow));
        assert_eq!(r.resolve("8613123456789"), Some(Asia::Shanghai));
    }

    #[test]
    fn multi_zone_country_without_override_takes_first_listed() {
        let r = TimezoneResolver::default();
        assert_eq!(r.resolve("34612345678"), Some(Europe::Madrid));
        assert_eq!(r.zone_for_region("DE"), Some(Europe::Berlin));
        assert_eq!(r.zone_for_region("AR"), Some(America::Argentina::Buenos_Aires));
    }

    #[test]
    fn overrides_are_injectable() {
        let bare = TimezoneResolver::new(&[]);
        assert_eq!(bare.zone_for_region("AU"), Some(Australia::Lord_Howe));

        let custom = TimezoneResolver::new(&[("au", "Australia/Perth"), ("US", "Not/AZone")]);
        assert_eq!(custom.zone_for_region("AU"), Some(Australia::Perth));
        assert_eq!(custom.zone_for_region("US"), Some(America::New_York));
    }

    #[test]
    fn unresolvable_numbers() {
        let r = TimezoneResolver::default();
        assert_eq!(r.resolve(""), None);
        assert_eq!(r.resolve("abc"), None);
        assert_eq!(r.zone_for_region("ZZ"), None);
    }
}
