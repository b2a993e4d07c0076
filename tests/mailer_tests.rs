use std::time::Duration;
use wager_tracker::error::Error;
use wager_tracker::mailer::*;

#[test]
fn test_parse_recipients_separators_and_dedupe() {
    let raw = "alice@example.com, bob@example.com\nALICE@example.com  carol@example.com,,";
    let emails: Vec<String> = parse_recipients(raw).into_iter().map(|a| a.email).collect();
    assert_eq!(
        emails,
        vec!["alice@example.com", "bob@example.com", "carol@example.com"]
    );
}

#[test]
fn test_parse_recipients_empty() {
    assert!(parse_recipients("").is_empty());
    assert!(parse_recipients(" , \n ").is_empty());
}

#[test]
fn test_brevo_payload_shape() {
    let email = Email {
        sender: Address {
            email: "bot@example.com".into(),
            name: Some("Marty vs Winslow".into()),
        },
        to: vec![Address::new("a@example.com")],
        subject: "Weekly".into(),
        html: "<p>hi</p>".into(),
    };

    let json = serde_json::to_value(BrevoPayload::from(&email)).unwrap();
    assert_eq!(json["sender"]["email"], "bot@example.com");
    assert_eq!(json["sender"]["name"], "Marty vs Winslow");
    assert_eq!(json["to"][0]["email"], "a@example.com");
    assert!(json["to"][0].get("name").is_none());
    assert_eq!(json["subject"], "Weekly");
    assert_eq!(json["htmlContent"], "<p>hi</p>");
}

#[test]
fn test_brevo_requires_api_key() {
    let result = BrevoMailer::new("https://api.brevo.com/v3/smtp/email", " ", Duration::from_secs(1));
    assert!(matches!(result, Err(Error::Config(_))));
}
