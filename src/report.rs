use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::NaiveDate;
use std::path::PathBuf;
use tracing::info;

use crate::advantage::{change_over, leader_and_ahead, transform, Standing};
use crate::chart;
use crate::config::{Config, WagerConfig};
use crate::error::{Error, Result};
use crate::history::{History, Snapshot};
use crate::mailer::{parse_recipients, Address, Email, Mailer};
use crate::output::{escape_html, leader_color, leader_label, money_str, pct_str, save_text};

pub const CHART_FILE_NAME: &str = "weekly-chart.png";
pub const REPORT_FILE_NAME: &str = "weekly-report.html";

const RECENT_ROWS: usize = 7;
const DELTA_DAYS: i64 = 7;

// ═══════════════════════════════════════════════════════════════════════
// Summary
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct WeeklySummary {
    pub standing: Standing,
    /// Change in signed percent against the snapshot a week earlier.
    pub delta_7d: f64,
    /// Newest first.
    pub recent: Vec<Snapshot>,
}

pub fn summarize(history: &History, wager: &WagerConfig, today: NaiveDate) -> Result<WeeklySummary> {
    let standing = transform(history, wager.resolution_date, today)
        .standing
        .ok_or(Error::EmptyHistory)?;
    let delta_7d = change_over(history, DELTA_DAYS).unwrap_or(0.0);
    let recent = history.tail(RECENT_ROWS).iter().rev().cloned().collect();

    Ok(WeeklySummary {
        standing,
        delta_7d,
        recent,
    })
}

/// Public URL of the chart when the site is hosted, else an inline data URI.
pub fn image_src(config: &Config, png: &[u8]) -> String {
    match config.site.public_url() {
        Some(url) => format!("{}/images/{}", url, CHART_FILE_NAME),
        None => format!("data:image/png;base64,{}", STANDARD.encode(png)),
    }
}

pub fn subject(wager: &WagerConfig, today: NaiveDate) -> String {
    format!("{} — Weekly Update ({})", wager.title(), today.format("%Y-%m-%d"))
}

// ═══════════════════════════════════════════════════════════════════════
// HTML
// ═══════════════════════════════════════════════════════════════════════

const CELL: &str = "padding:8px;border-bottom:1px solid #e5e7eb";

fn row_html(s: &Snapshot, wager: &WagerConfig) -> String {
    let (leader, ahead) = leader_and_ahead(s);
    let pill = leader_color(leader);
    format!(
        "<tr><td style='{c}'>{date}</td><td style='{c}'>{a}</td><td style='{c}'>{b}</td>\
<td style='{c}'>{name}</td><td style='{c}'><span style='border:1px solid {pill};border-radius:999px;\
padding:3px 8px;color:{pill};font-size:12px'>{pct}</span></td></tr>",
        c = CELL,
        date = s.date,
        a = money_str(s.value_a),
        b = money_str(s.value_b),
        name = escape_html(&leader_label(leader, wager)),
        pill = pill,
        pct = pct_str(ahead),
    )
}

pub fn generate_email_html(
    summary: &WeeklySummary,
    wager: &WagerConfig,
    image_src: &str,
    dashboard_url: Option<&str>,
) -> String {
    let standing = &summary.standing;
    let title = escape_html(&wager.title());
    let rows: Vec<String> = summary.recent.iter().map(|s| row_html(s, wager)).collect();
    let link = dashboard_url
        .map(|url| {
            format!(
                "<p style='margin:8px 0 0'><a href='{}' style='color:#2563eb;text-decoration:none'>\
Open the live dashboard &rarr;</a></p>",
                escape_html(url)
            )
        })
        .unwrap_or_default();

    format!(
        r#"<!doctype html>
<html><body style="font-family:-apple-system,Segoe UI,Roboto,Helvetica,Arial,sans-serif;color:#0b1221;background:#ffffff;margin:0;padding:16px;">
  <div style="max-width:720px;margin:0 auto;">
    <h2 style="margin:0 0 4px 0;">{title} &mdash; Weekly Update</h2>
    <div style="color:#6b7280;margin-bottom:12px;">{ta} vs {tb} market capitalization &bull; Ends {end}</div>

    <div style="background:#f8fafc;border-radius:12px;padding:14px 16px;margin-bottom:12px;">
      <table role="presentation" style="width:100%;border-collapse:collapse">
        <tr>
          <td style="padding:6px 0;width:33%;">
            <div style="color:#6b7280;font-size:13px;">Days left</div>
            <div style="font-weight:700;font-size:22px;">{days_left}</div>
          </td>
          <td style="padding:6px 0;width:33%;">
            <div style="color:#6b7280;font-size:13px;">Currently winning</div>
            <div style="font-weight:800;font-size:22px;color:{leader_color}">{leader}</div>
          </td>
          <td style="padding:6px 0;width:33%;">
            <div style="color:#6b7280;font-size:13px;">% ahead</div>
            <div style="font-weight:700;font-size:22px;">{ahead} <span style="color:#6b7280;font-size:12px">(&Delta; vs 7d: {delta})</span></div>
          </td>
        </tr>
      </table>
      <div style="color:#6b7280;font-size:12px;margin-top:4px">% ahead = (leader &minus; loser) / loser</div>
    </div>

    <img src="{image_src}" alt="{title} chart" style="width:100%;max-width:1000px;border-radius:12px;display:block;margin:8px 0" />

    <div style="background:#f8fafc;border-radius:12px;padding:14px 16px;margin-top:12px;">
      <div style="margin-bottom:8px;"><strong>Last {n} entries</strong> <span style="color:#6b7280;font-size:12px;">Updated {as_of}</span></div>
      <table style="width:100%;border-collapse:collapse;">
        <thead>
          <tr>
            <th align="left" style="{cell}">Date</th>
            <th align="left" style="{cell}">{ta} Market Cap</th>
            <th align="left" style="{cell}">{tb} Market Cap</th>
            <th align="left" style="{cell}">Leader</th>
            <th align="left" style="{cell}">% Ahead</th>
          </tr>
        </thead>
        <tbody>
          {rows}
        </tbody>
      </table>
      {link}
    </div>
  </div>
</body></html>
"#,
        title = title,
        ta = escape_html(&wager.party_a.ticker),
        tb = escape_html(&wager.party_b.ticker),
        end = wager.resolution_date.format("%B %-d, %Y"),
        days_left = standing.days_remaining,
        leader_color = leader_color(standing.leader),
        leader = escape_html(&leader_label(standing.leader, wager)),
        ahead = pct_str(standing.percent_ahead),
        delta = pct_str(summary.delta_7d),
        image_src = escape_html(image_src),
        n = summary.recent.len(),
        as_of = standing.as_of,
        cell = CELL,
        rows = rows.join("\n          "),
        link = link,
    )
}

// ═══════════════════════════════════════════════════════════════════════
// Weekly run
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug)]
pub struct ReportOutcome {
    pub chart_path: PathBuf,
    /// Set on dry runs, where the email body is written instead of sent.
    pub html_path: Option<PathBuf>,
    pub recipients: usize,
}

pub fn build_email(config: &Config, html: String, today: NaiveDate) -> Email {
    Email {
        sender: Address {
            email: config.email.sender_email.clone(),
            name: Some(config.sender_name()),
        },
        to: parse_recipients(&config.email.recipients),
        subject: subject(&config.wager, today),
        html,
    }
}

/// Rasterize the chart, build the email and hand it to `mailer`. Without a
/// mailer the email body is written next to the chart instead. The history
/// is only read; a delivery failure is returned as an error.
pub fn run(
    config: &Config,
    history: &History,
    today: NaiveDate,
    mailer: Option<&dyn Mailer>,
) -> Result<ReportOutcome> {
    let summary = summarize(history, &config.wager, today)?;
    let advantage = transform(history, config.wager.resolution_date, today);

    let chart_path = config.chart_path();
    chart::render_png(&advantage.series, &chart_path, chart::DEFAULT_SIZE)?;
    let png = std::fs::read(&chart_path)?;

    let dashboard_url = config.site.public_url();
    let html = generate_email_html(
        &summary,
        &config.wager,
        &image_src(config, &png),
        dashboard_url.as_deref(),
    );
    let email = build_email(config, html, today);

    let Some(mailer) = mailer else {
        let html_path = chart_path.with_file_name(REPORT_FILE_NAME);
        save_text(&email.html, &html_path)?;
        info!(path = %html_path.display(), "dry run, report written instead of sent");
        return Ok(ReportOutcome {
            chart_path,
            html_path: Some(html_path),
            recipients: email.to.len(),
        });
    };

    if email.to.is_empty() {
        return Err(Error::Config("REPORT_TO_EMAIL(S) missing".into()));
    }
    mailer.send(&email)?;
    info!(recipients = email.to.len(), subject = %email.subject, "weekly report sent");

    Ok(ReportOutcome {
        chart_path,
        html_path: None,
        recipients: email.to.len(),
    })
}
