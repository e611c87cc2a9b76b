use anyhow::Result;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::Config;
use crate::domain::EligibilityDecision;

/// WhatsApp Cloud API client for template messages.
#[derive(Clone)]
pub struct WhatsAppClient {
    base_url: String,
    api_version: String,
    phone_number_id: String,
    token: String,
    http: Client,
}

#[derive(Debug, Clone, Serialize)]
pub struct TemplateMessage<'a> {
    pub messaging_product: &'static str,
    pub to: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub template: Template<'a>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Template<'a> {
    pub name: &'a str,
    pub language: Language<'a>,
    pub components: Vec<Component<'a>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Language<'a> {
    pub code: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct Component<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub parameters: Vec<TextParameter<'a>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TextParameter<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: &'a str,
}

impl<'a> TemplateMessage<'a> {
    pub fn new(to: &str, template: &'a str, lang: &'a str, params: &'a [String]) -> Self {
        Self {
            messaging_product: "whatsapp",
            to: to_e164(to),
            kind: "template",
            template: Template {
                name: template,
                language: Language { code: lang },
                components: vec![Component {
                    kind: "body",
                    parameters: params
                        .iter()
                        .map(|p| TextParameter { kind: "text", text: p })
                        .collect(),
                }],
            },
        }
    }
}

/// Result of one send. Failures are values, never errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub ok: bool,
    /// `None` on transport failure.
    pub status: Option<u16>,
    pub body: String,
}

pub fn to_e164(phone: &str) -> String {
    let phone = phone.trim();
    if phone.starts_with('+') {
        phone.to_string()
    } else {
        format!("+{phone}")
    }
}

/// `error.message` from a Graph API error body, when there is one.
pub fn api_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .pointer("/error/message")
        .and_then(|m| m.as_str())
        .map(str::to_string)
}

impl WhatsAppClient {
    pub fn new(
        base_url: &str,
        api_version: &str,
        phone_number_id: &str,
        token: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_version: api_version.to_string(),
            phone_number_id: phone_number_id.to_string(),
            token: token.to_string(),
            http,
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        Self::new(
            &cfg.graph_base_url,
            &cfg.api_version,
            &cfg.phone_number_id,
            &cfg.token,
            Duration::from_secs(cfg.http_timeout_secs),
        )
    }

    pub fn messages_url(&self) -> String {
        format!("{}/{}/{}/messages", self.base_url, self.api_version, self.phone_number_id)
    }

    pub async fn send_template(&self, to: &str, template: &str, lang: &str, params: &[String]) -> DispatchOutcome {
        let msg = TemplateMessage::new(to, template, lang, params);

        let resp = match self
            .http
            .post(self.messages_url())
            .bearer_auth(&self.token)
            .json(&msg)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(err) => {
                warn!(to = %msg.to, template, lang, error = %err, "dispatch.failed");
                return DispatchOutcome { ok: false, status: None, body: err.to_string() };
            }
        };

        let status = resp.status().as_u16();
        let ok = status < 300;
        let body = resp.text().await.unwrap_or_default();

        if ok {
            info!(to = %msg.to, template, lang, status, "dispatch.ok");
        } else {
            let reason = api_error_message(&body).unwrap_or_default();
            warn!(to = %msg.to, template, lang, status, reason = %reason, body = %body, "dispatch.failed");
        }

        DispatchOutcome { ok, status: Some(status), body }
    }

    pub async fn dispatch(&self, decision: &EligibilityDecision) -> DispatchOutcome {
        self.send_template(
            &decision.contact.phone,
            &decision.template_name,
            &decision.language_code,
            &decision.params,
        )
        .await
    }
}
