use serde::Serialize;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{error, info};

use crate::config::Config;
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Address {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Address {
    pub fn new(email: impl Into<String>) -> Self {
        Address {
            email: email.into(),
            name: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Email {
    pub sender: Address,
    pub to: Vec<Address>,
    pub subject: String,
    pub html: String,
}

pub trait Mailer {
    fn send(&self, email: &Email) -> Result<()>;
}

/// Split on commas, whitespace and newlines; drop case-insensitive repeats,
/// keeping the first spelling and the original order.
pub fn parse_recipients(raw: &str) -> Vec<Address> {
    let mut seen = HashSet::new();
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .filter(|p| seen.insert(p.to_lowercase()))
        .map(Address::new)
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════
// Brevo transactional email API
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BrevoPayload<'a> {
    pub sender: &'a Address,
    pub to: &'a [Address],
    pub subject: &'a str,
    pub html_content: &'a str,
}

impl<'a> From<&'a Email> for BrevoPayload<'a> {
    fn from(email: &'a Email) -> Self {
        BrevoPayload {
            sender: &email.sender,
            to: &email.to,
            subject: &email.subject,
            html_content: &email.html,
        }
    }
}

pub struct BrevoMailer {
    client: reqwest::blocking::Client,
    endpoint: String,
    api_key: String,
}

impl BrevoMailer {
    pub fn new(endpoint: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(Error::Config("BREVO_API_KEY missing".into()));
        }
        let client = reqwest::blocking::Client::builder().timeout(timeout).build()?;
        Ok(BrevoMailer {
            client,
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config
            .email
            .api_key
            .as_deref()
            .ok_or_else(|| Error::Config("BREVO_API_KEY missing".into()))?;
        Self::new(
            &config.email.endpoint,
            api_key,
            Duration::from_secs(config.email.timeout_secs),
        )
    }
}

impl Mailer for BrevoMailer {
    fn send(&self, email: &Email) -> Result<()> {
        if email.to.is_empty() {
            return Err(Error::Config("REPORT_TO_EMAIL(S) missing".into()));
        }

        let resp = self
            .client
            .post(&self.endpoint)
            .header("accept", "application/json")
            .header("api-key", &self.api_key)
            .json(&BrevoPayload::from(email))
            .send()?;

        let status = resp.status().as_u16();
        let body = resp.text().unwrap_or_default();
        if !matches!(status, 200 | 201 | 202) {
            error!(status, %body, "brevo rejected email");
            return Err(Error::Delivery { status, body });
        }

        info!(status, recipients = email.to.len(), "brevo accepted email");
        Ok(())
    }
}
