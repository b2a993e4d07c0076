use std::path::Path;

use crate::advantage::{split, AdvantagePoint, Leader, PointKind};
use crate::config::WagerConfig;
use crate::error::Result;

pub const COLOR_A: &str = "#184FF8";
pub const COLOR_B: &str = "#007F01";
pub const COLOR_TIE: &str = "#6b7280";

pub fn leader_color(leader: Leader) -> &'static str {
    match leader {
        Leader::A => COLOR_A,
        Leader::B => COLOR_B,
        Leader::Tie => COLOR_TIE,
    }
}

pub fn leader_label(leader: Leader, wager: &WagerConfig) -> String {
    match leader {
        Leader::A => wager.label_a(),
        Leader::B => wager.label_b(),
        Leader::Tie => "Tied".to_string(),
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Formatting
// ═══════════════════════════════════════════════════════════════════════

/// 1.23T / 4.56B / 7.89M, or a thousands-separated integer below a million.
pub fn money_str(n: f64) -> String {
    if n >= 1e12 {
        format!("{:.2}T", n / 1e12)
    } else if n >= 1e9 {
        format!("{:.2}B", n / 1e9)
    } else if n >= 1e6 {
        format!("{:.2}M", n / 1e6)
    } else {
        group_thousands(n.round() as i64)
    }
}

fn group_thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if n < 0 {
        out.insert(0, '-');
    }
    out
}

/// Percent value (already scaled by 100) with two decimals.
pub fn pct_str(percent: f64) -> String {
    format!("{:.2}%", percent)
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

// ═══════════════════════════════════════════════════════════════════════
// File I/O
// ═══════════════════════════════════════════════════════════════════════

pub fn save_text(body: &str, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, body)?;
    Ok(())
}

/// Write the augmented series as CSV: x,date,kind,percent,positive,negative.
pub fn save_series_csv(series: &[AdvantagePoint], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let parts = split(series);
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(["x", "date", "kind", "percent", "positive", "negative"])?;

    for (i, p) in series.iter().enumerate() {
        let kind = match p.kind {
            PointKind::Observed => "observed",
            PointKind::Crossing => "crossing",
        };
        let cell = |v: Option<f64>| v.map(|v| format!("{:.6}", v)).unwrap_or_default();
        wtr.write_record(&[
            format!("{:.6}", p.x),
            p.date.to_string(),
            kind.to_string(),
            format!("{:.6}", p.percent),
            cell(parts.positive[i]),
            cell(parts.negative[i]),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
