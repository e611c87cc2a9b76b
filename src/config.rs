use anyhow::{anyhow, Result};
use std::fmt;

#[derive(Clone)]
pub struct Config {
    // Graph API
    pub graph_base_url: String,
    pub api_version: String,
    pub phone_number_id: String,
    pub token: String,
    pub http_timeout_secs: u64,

    // Message
    pub sender_name: String,
    pub default_lang: String,

    // Roster
    pub events_path: String,

    // Send window (contact-local)
    pub send_hour: u32,
    pub send_window_minutes: u32,

    // Runtime
    pub dry_run: bool,
    pub send_concurrency: usize,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("graph_base_url", &self.graph_base_url)
            .field("api_version", &self.api_version)
            .field("phone_number_id", &self.phone_number_id)
            .field("token", &"<redacted>")
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("sender_name", &self.sender_name)
            .field("default_lang", &self.default_lang)
            .field("events_path", &self.events_path)
            .field("send_hour", &self.send_hour)
            .field("send_window_minutes", &self.send_window_minutes)
            .field("dry_run", &self.dry_run)
            .field("send_concurrency", &self.send_concurrency)
            .finish()
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn env_bool(get: &impl Fn(&str) -> Option<String>, key: &str, default: bool) -> bool {
    match get(key).map(|s| s.trim().to_lowercase()) {
        None => default,
        Some(v) if v.is_empty() => default,
        Some(v) if v == "1" || v == "true" || v == "yes" || v == "y" || v == "on" => true,
        Some(v) if v == "0" || v == "false" || v == "no" || v == "n" || v == "off" => false,
        Some(_) => default,
    }
}

fn env_parse<T: std::str::FromStr>(get: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    get(key).and_then(|x| x.trim().parse().ok())
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        // Graph API
        let graph_base_url = non_blank(get("GRAPH_API_BASE_URL"))
            .unwrap_or_else(|| "https://graph.facebook.com".to_string());
        let api_version = non_blank(get("WA_API_VERSION")).unwrap_or_else(|| "v21.0".to_string());
        let phone_number_id = non_blank(get("WABA_PHONE_NUMBER_ID"))
            .ok_or_else(|| anyhow!("WABA_PHONE_NUMBER_ID is required"))?;
        let token = non_blank(get("META_WA_TOKEN")).ok_or_else(|| anyhow!("META_WA_TOKEN is required"))?;
        let http_timeout_secs = env_parse::<u64>(&get, "HTTP_TIMEOUT_SECS").unwrap_or(30);

        // Message
        let sender_name = non_blank(get("SENDER_NAME")).unwrap_or_else(|| "Un amigo".to_string());
        let default_lang = non_blank(get("DEFAULT_LANG"))
            .map(|s| s.to_lowercase())
            .unwrap_or_else(|| "es".to_string());

        // Roster
        let events_path = non_blank(get("EVENTS_PATH")).unwrap_or_else(|| "./events.csv".to_string());

        // Send window
        let send_hour = env_parse::<u32>(&get, "SEND_HOUR").unwrap_or(9);
        let send_window_minutes = env_parse::<u32>(&get, "SEND_WINDOW_MINUTES").unwrap_or(10);
        if send_hour > 23 {
            return Err(anyhow!("SEND_HOUR must be 0-23, got {send_hour}"));
        }
        if send_window_minutes == 0 || send_window_minutes > 60 {
            return Err(anyhow!("SEND_WINDOW_MINUTES must be 1-60, got {send_window_minutes}"));
        }

        // Runtime
        let dry_run = env_bool(&get, "DRY_RUN", false);
        let send_concurrency = env_parse::<usize>(&get, "SEND_CONCURRENCY").unwrap_or(4);
        if send_concurrency == 0 {
            return Err(anyhow!("SEND_CONCURRENCY cannot be 0"));
        }

        Ok(Self {
            graph_base_url,
            api_version,
            phone_number_id,
            token,
            http_timeout_secs,
            sender_name,
            default_lang,
            events_path,
            send_hour,
            send_window_minutes,
            dry_run,
            send_concurrency,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    const REQUIRED: &[(&str, &str)] = &[("WABA_PHONE_NUMBER_ID", "1234"), ("META_WA_TOKEN", "secret")];

    #[test]
    fn defaults() {
        let cfg = Config::from_lookup(lookup(REQUIRED)).unwrap();
        assert_eq!(cfg.api_version, "v21.0");
        assert_eq!(cfg.graph_base_url, "https://graph.facebook.com");
        assert_eq!(cfg.sender_name, "Un amigo");
        assert_eq!(cfg.default_lang, "es");
        assert_eq!(cfg.events_path, "./events.csv");
        assert_eq!((cfg.send_hour, cfg.send_window_minutes), (9, 10));
        assert_eq!(cfg.http_timeout_secs, 30);
        assert_eq!(cfg.send_concurrency, 4);
        assert!(!cfg.dry_run);
    }

    #[test]
    fn overrides() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([
            ("WA_API_VERSION", "v22.0"),
            ("SENDER_NAME", "Ana"),
            ("DEFAULT_LANG", "EN_US"),
            ("SEND_HOUR", "18"),
            ("SEND_WINDOW_MINUTES", "5"),
            ("DRY_RUN", "yes"),
            ("SEND_CONCURRENCY", "1"),
        ]);
        let cfg = Config::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(cfg.api_version, "v22.0");
        assert_eq!(cfg.sender_name, "Ana");
        assert_eq!(cfg.default_lang, "en_us");
        assert_eq!((cfg.send_hour, cfg.send_window_minutes), (18, 5));
        assert!(cfg.dry_run);
        assert_eq!(cfg.send_concurrency, 1);
    }

    #[test]
    fn credentials_are_required() {
        let err = Config::from_lookup(lookup(&[("META_WA_TOKEN", "secret")])).unwrap_err();
        assert!(err.to_string().contains("WABA_PHONE_NUMBER_ID"));

        let err = Config::from_lookup(lookup(&[("WABA_PHONE_NUMBER_ID", "1"), ("META_WA_TOKEN", "  ")])).unwrap_err();
        assert!(err.to_string().contains("META_WA_TOKEN"));
    }

    #[test]
    fn rejects_bad_window() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("SEND_HOUR", "24"));
        assert!(Config::from_lookup(lookup(&pairs)).is_err());

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("SEND_WINDOW_MINUTES", "0"));
        assert!(Config::from_lookup(lookup(&pairs)).is_err());
    }

    #[test]
    fn debug_redacts_token() {
        let cfg = Config::from_lookup(lookup(REQUIRED)).unwrap();
        let shown = format!("{cfg:?}");
        assert!(!shown.contains("secret"));
        assert!(shown.contains("<redacted>"));
    }
}
