use chrono::NaiveDate;
use std::collections::HashMap;
use std::path::PathBuf;
use wager_tracker::config::{Config, SiteConfig};
use wager_tracker::error::Error;

fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn test_defaults() {
    let config = Config::default();
    assert_eq!(config.wager.party_a.ticker, "COIN");
    assert_eq!(config.wager.party_b.ticker, "BP");
    assert_eq!(
        config.wager.resolution_date,
        NaiveDate::from_ymd_opt(2030, 5, 1).unwrap()
    );
    assert_eq!(config.paths.history, PathBuf::from("data/history.json"));
    assert_eq!(config.wager.label_a(), "Marty (COIN)");
    assert_eq!(config.sender_name(), "Marty vs Winslow");
    assert_eq!(config.chart_path(), PathBuf::from("site/images/weekly-chart.png"));
}

#[test]
fn test_partial_toml_keeps_defaults() {
    let raw = r#"
log_level = "debug"

[wager]
resolution_date = "2028-01-15"

[wager.party_b]
name = "Winslow"
ticker = "SHEL"

[paths]
site_dir = "public"
"#;
    let config = Config::from_toml_str(raw).unwrap();
    assert_eq!(config.log_level, "debug");
    assert_eq!(config.wager.party_a.ticker, "COIN");
    assert_eq!(config.wager.party_b.ticker, "SHEL");
    assert_eq!(
        config.wager.resolution_date,
        NaiveDate::from_ymd_opt(2028, 1, 15).unwrap()
    );
    assert_eq!(config.paths.site_dir, PathBuf::from("public"));
    assert_eq!(config.paths.history, PathBuf::from("data/history.json"));
    assert_eq!(config.fetch.retries, 3);
}

#[test]
fn test_invalid_toml_is_config_error() {
    let result = Config::from_toml_str("[wager]\nresolution_date = 12");
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_env_overrides() {
    let mut config = Config::default();
    config
        .apply_env(env(&[
            ("WAGER_TICKER_A", "MSTR"),
            ("WAGER_RESOLUTION_DATE", "2029-12-31"),
            ("WAGER_HISTORY_PATH", "/tmp/h.json"),
            ("REPORT_FROM_EMAIL", "bot@example.org"),
            ("REPORT_TO_EMAIL", "single@example.org"),
            ("BREVO_API_KEY", "  key-123  "),
            ("SITE_URL", ""),
        ]))
        .unwrap();

    assert_eq!(config.wager.party_a.ticker, "MSTR");
    assert_eq!(
        config.wager.resolution_date,
        NaiveDate::from_ymd_opt(2029, 12, 31).unwrap()
    );
    assert_eq!(config.paths.history, PathBuf::from("/tmp/h.json"));
    assert_eq!(config.email.sender_email, "bot@example.org");
    assert_eq!(config.email.recipients, "single@example.org");
    assert_eq!(config.email.api_key.as_deref(), Some("key-123"));
    assert!(config.site.base_url.is_none(), "empty values are ignored");
}

#[test]
fn test_plural_recipients_win_over_singular() {
    let mut config = Config::default();
    config
        .apply_env(env(&[
            ("REPORT_TO_EMAILS", "a@x.com,b@x.com"),
            ("REPORT_TO_EMAIL", "c@x.com"),
        ]))
        .unwrap();
    assert_eq!(config.email.recipients, "a@x.com,b@x.com");
}

#[test]
fn test_bad_env_date_is_rejected() {
    let mut config = Config::default();
    let result = config.apply_env(env(&[("WAGER_RESOLUTION_DATE", "May 1st")]));
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_public_url() {
    let explicit = SiteConfig {
        base_url: Some("https://wager.example.com/".into()),
        github_repository: Some("owner/repo".into()),
    };
    assert_eq!(explicit.public_url().as_deref(), Some("https://wager.example.com"));

    let derived = SiteConfig {
        base_url: None,
        github_repository: Some("owner/repo".into()),
    };
    assert_eq!(derived.public_url().as_deref(), Some("https://owner.github.io/repo"));

    let malformed = SiteConfig {
        base_url: None,
        github_repository: Some("no-slash".into()),
    };
    assert!(malformed.public_url().is_none());
    assert!(SiteConfig::default().public_url().is_none());
}

#[test]
fn test_load_missing_explicit_file_fails() {
    let path = std::env::temp_dir().join("wager_tracker_does_not_exist.toml");
    assert!(matches!(Config::load(Some(path.as_path())), Err(Error::Config(_))));
}

#[test]
fn test_bare_toml_date() {
    let config = Config::from_toml_str("[wager]\nresolution_date = 2031-02-03\n").unwrap();
    assert_eq!(
        config.wager.resolution_date,
        NaiveDate::from_ymd_opt(2031, 2, 3).unwrap()
    );

    let with_time = Config::from_toml_str("[wager]\nresolution_date = 2031-02-03T10:00:00\n");
    assert!(matches!(with_time, Err(Error::Config(_))));
}
