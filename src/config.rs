use chrono::NaiveDate;
use serde::de::{self, Deserializer};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

pub const DEFAULT_CONFIG_FILE: &str = "wager.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Party {
    pub name: String,
    pub ticker: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WagerConfig {
    /// Side whose lead counts as positive advantage.
    pub party_a: Party,
    pub party_b: Party,
    /// Either a bare TOML date (`2030-05-01`) or a quoted `"YYYY-MM-DD"` string.
    #[serde(deserialize_with = "toml_date")]
    pub resolution_date: NaiveDate,
}

fn toml_date<'de, D>(deserializer: D) -> std::result::Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    match toml::Value::deserialize(deserializer)? {
        toml::Value::String(raw) => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
            .map_err(|e| de::Error::custom(format!("invalid date '{}': {}", raw, e))),
        toml::Value::Datetime(dt) => match (dt.date, dt.time) {
            (Some(d), None) => NaiveDate::from_ymd_opt(d.year.into(), d.month.into(), d.day.into())
                .ok_or_else(|| de::Error::custom(format!("invalid date '{}'", dt))),
            _ => Err(de::Error::custom(format!("expected a date without time, got '{}'", dt))),
        },
        other => Err(de::Error::custom(format!("expected a date, got {}", other.type_str()))),
    }
}

impl Default for WagerConfig {
    fn default() -> Self {
        WagerConfig {
            party_a: Party {
                name: "Marty".into(),
                ticker: "COIN".into(),
            },
            party_b: Party {
                name: "Winslow".into(),
                ticker: "BP".into(),
            },
            resolution_date: NaiveDate::from_ymd_opt(2030, 5, 1).unwrap_or_default(),
        }
    }
}

impl WagerConfig {
    /// "Marty (COIN)"
    pub fn label_a(&self) -> String {
        format!("{} ({})", self.party_a.name, self.party_a.ticker)
    }

    pub fn label_b(&self) -> String {
        format!("{} ({})", self.party_b.name, self.party_b.ticker)
    }

    pub fn title(&self) -> String {
        format!("{} vs {}", self.party_a.name, self.party_b.name)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub history: PathBuf,
    pub site_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        PathsConfig {
            history: PathBuf::from("data/history.json"),
            site_dir: PathBuf::from("site"),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub base_url: Option<String>,
    /// `owner/repo`, used to derive a GitHub Pages URL when `base_url` is unset.
    pub github_repository: Option<String>,
}

impl SiteConfig {
    /// Public URL of the dashboard, if one can be determined.
    pub fn public_url(&self) -> Option<String> {
        if let Some(url) = self.base_url.as_deref().map(str::trim) {
            if !url.is_empty() {
                return Some(url.trim_end_matches('/').to_string());
            }
        }
        let repo = self.github_repository.as_deref()?;
        let (owner, name) = repo.split_once('/')?;
        if owner.is_empty() || name.is_empty() {
            return None;
        }
        Some(format!("https://{}.github.io/{}", owner, name))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    pub sender_name: Option<String>,
    pub sender_email: String,
    /// Raw recipient list; commas, spaces and newlines all separate addresses.
    pub recipients: String,
    pub api_key: Option<String>,
    pub endpoint: String,
    pub timeout_secs: u64,
}

impl Default for EmailConfig {
    fn default() -> Self {
        EmailConfig {
            sender_name: None,
            sender_email: "no-reply@example.com".into(),
            recipients: String::new(),
            api_key: None,
            endpoint: "https://api.brevo.com/v3/smtp/email".into(),
            timeout_secs: 45,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub base_url: String,
    /// Page visited once per run to obtain the session cookie the crumb is tied to.
    pub cookie_url: String,
    pub timeout_secs: u64,
    pub retries: u32,
    pub retry_delay_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        FetchConfig {
            base_url: "https://query1.finance.yahoo.com".into(),
            cookie_url: "https://fc.yahoo.com".into(),
            timeout_secs: 30,
            retries: 3,
            retry_delay_ms: 1000,
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub wager: WagerConfig,
    pub paths: PathsConfig,
    pub site: SiteConfig,
    pub email: EmailConfig,
    pub fetch: FetchConfig,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            wager: WagerConfig::default(),
            paths: PathsConfig::default(),
            site: SiteConfig::default(),
            email: EmailConfig::default(),
            fetch: FetchConfig::default(),
            log_level: "info".into(),
        }
    }
}

impl Config {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Load from `path`, or from `wager.toml` in the working directory when present.
    /// An explicit path that does not exist is an error; a missing default file is not.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => {
                let raw = std::fs::read_to_string(p).map_err(|e| {
                    Error::Config(format!("cannot read {}: {}", p.display(), e))
                })?;
                Self::from_toml_str(&raw)?
            }
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::from_toml_str(&std::fs::read_to_string(default_path)?)?
                } else {
                    Config::default()
                }
            }
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup`. Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = get("WAGER_TICKER_A") {
            self.wager.party_a.ticker = v;
        }
        if let Some(v) = get("WAGER_TICKER_B") {
            self.wager.party_b.ticker = v;
        }
        if let Some(v) = get("WAGER_RESOLUTION_DATE") {
            self.wager.resolution_date = NaiveDate::parse_from_str(&v, "%Y-%m-%d")
                .map_err(|e| Error::Config(format!("WAGER_RESOLUTION_DATE '{}': {}", v, e)))?;
        }
        if let Some(v) = get("WAGER_HISTORY_PATH") {
            self.paths.history = PathBuf::from(v);
        }
        if let Some(v) = get("WAGER_SITE_DIR") {
            self.paths.site_dir = PathBuf::from(v);
        }
        if let Some(v) = get("SITE_URL") {
            self.site.base_url = Some(v);
        }
        if let Some(v) = get("GITHUB_REPOSITORY") {
            self.site.github_repository = Some(v);
        }
        if let Some(v) = get("REPORT_FROM_EMAIL") {
            self.email.sender_email = v;
        }
        if let Some(v) = get("REPORT_TO_EMAILS").or_else(|| get("REPORT_TO_EMAIL")) {
            self.email.recipients = v;
        }
        if let Some(v) = get("BREVO_API_KEY") {
            self.email.api_key = Some(v);
        }
        Ok(())
    }

    pub fn sender_name(&self) -> String {
        self.email
            .sender_name
            .clone()
            .unwrap_or_else(|| self.wager.title())
    }

    pub fn chart_path(&self) -> PathBuf {
        self.paths.site_dir.join("images").join(crate::report::CHART_FILE_NAME)
    }
}
