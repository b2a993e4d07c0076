//! Signed advantage series with zero-crossing interpolation.
//!
//! Both the dashboard chart and the emailed PNG are drawn from the output of
//! [`transform`], so the two always show the same shape for the same history.

use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::history::{History, Snapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PointKind {
    Observed,
    Crossing,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdvantagePoint {
    /// Days since the first snapshot. Fractional for crossings.
    pub x: f64,
    /// Calendar day containing `x`.
    pub date: NaiveDate,
    /// `(A - B) / B * 100`; exactly 0.0 for crossings.
    pub percent: f64,
    pub kind: PointKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Leader {
    A,
    B,
    Tie,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Standing {
    pub leader: Leader,
    /// `(leader - loser) / loser * 100`, 0 on a tie.
    pub percent_ahead: f64,
    pub days_remaining: i64,
    pub as_of: NaiveDate,
}

/// Two index-aligned views of the series: `None` marks a gap in the line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SplitSeries {
    pub positive: Vec<Option<f64>>,
    pub negative: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Advantage {
    pub series: Vec<AdvantagePoint>,
    pub standing: Option<Standing>,
}

impl Advantage {
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn split(&self) -> SplitSeries {
        split(&self.series)
    }

    pub fn crossings(&self) -> impl Iterator<Item = &AdvantagePoint> {
        self.series.iter().filter(|p| p.kind == PointKind::Crossing)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Transform
// ═══════════════════════════════════════════════════════════════════════

pub fn transform(history: &History, resolution_date: NaiveDate, today: NaiveDate) -> Advantage {
    let raw = observed_points(history);
    let series = insert_crossings(&raw);
    let standing = history
        .latest()
        .map(|last| standing_of(last, resolution_date, today));

    Advantage { series, standing }
}

fn observed_points(history: &History) -> Vec<AdvantagePoint> {
    let Some(origin) = history.first().map(|s| s.date) else {
        return Vec::new();
    };

    history
        .snapshots()
        .iter()
        .map(|s| AdvantagePoint {
            x: (s.date - origin).num_days() as f64,
            date: s.date,
            percent: s.signed_percent(),
            kind: PointKind::Observed,
        })
        .collect()
}

/// Insert one zero point between every adjacent pair whose percents have
/// strictly opposite signs. A point that is exactly 0 is its own boundary.
pub fn insert_crossings(raw: &[AdvantagePoint]) -> Vec<AdvantagePoint> {
    let mut out = Vec::with_capacity(raw.len() * 2);

    for (i, p) in raw.iter().enumerate() {
        if i > 0 {
            let prev = &raw[i - 1];
            if prev.percent * p.percent < 0.0 {
                out.push(crossing_between(prev, p));
            }
        }
        out.push(p.clone());
    }

    out
}

fn crossing_between(p1: &AdvantagePoint, p2: &AdvantagePoint) -> AdvantagePoint {
    let (y1, y2) = (p1.percent, p2.percent);
    let x = p1.x + (0.0 - y1) / (y2 - y1) * (p2.x - p1.x);
    let offset = (x - p1.x).floor() as i64;

    AdvantagePoint {
        x,
        date: p1.date + Duration::days(offset),
        percent: 0.0,
        kind: PointKind::Crossing,
    }
}

pub fn split(series: &[AdvantagePoint]) -> SplitSeries {
    let positive = series
        .iter()
        .map(|p| (p.percent >= 0.0).then_some(p.percent))
        .collect();
    let negative = series
        .iter()
        .map(|p| (p.percent <= 0.0).then_some(p.percent))
        .collect();

    SplitSeries { positive, negative }
}

// ═══════════════════════════════════════════════════════════════════════
// Standing
// ═══════════════════════════════════════════════════════════════════════

pub fn standing_of(last: &Snapshot, resolution_date: NaiveDate, today: NaiveDate) -> Standing {
    let (leader, percent_ahead) = leader_and_ahead(last);
    Standing {
        leader,
        percent_ahead,
        days_remaining: days_remaining(resolution_date, today),
        as_of: last.date,
    }
}

pub fn leader_and_ahead(s: &Snapshot) -> (Leader, f64) {
    if s.value_a > s.value_b {
        (Leader::A, (s.value_a - s.value_b) / s.value_b * 100.0)
    } else if s.value_b > s.value_a {
        (Leader::B, (s.value_b - s.value_a) / s.value_a * 100.0)
    } else {
        (Leader::Tie, 0.0)
    }
}

pub fn days_remaining(resolution_date: NaiveDate, today: NaiveDate) -> i64 {
    (resolution_date - today).num_days().max(0)
}

/// Change in signed percent between the latest snapshot and the most recent
/// one dated at least `days` earlier (the first snapshot if none is that old).
pub fn change_over(history: &History, days: i64) -> Option<f64> {
    let latest = history.latest()?;
    let threshold = latest.date - Duration::days(days);

    let base = history
        .snapshots()
        .iter()
        .rev()
        .find(|s| s.date <= threshold)
        .or(history.first())?;

    Some(latest.signed_percent() - base.signed_percent())
}

/// Symmetric y-axis bound: at least 5, otherwise 110% of the largest
/// magnitude rounded up.
pub fn y_bound(series: &[AdvantagePoint]) -> f64 {
    let max_abs = series.iter().map(|p| p.percent.abs()).fold(0.0_f64, f64::max);
    (max_abs * 1.1).ceil().max(5.0)
}
