use approx::assert_relative_eq;
use chrono::NaiveDate;
use wager_tracker::advantage::*;
use wager_tracker::history::{History, Snapshot};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn snap(date: NaiveDate, a: f64, b: f64) -> Snapshot {
    Snapshot::new(date, a, b).unwrap()
}

fn resolution() -> NaiveDate {
    d(2030, 5, 1)
}

// ═══════════════════════════════════════════════════════════════════════
// Worked examples
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_two_point_crossing_example() {
    let history = History::from_snapshots(vec![
        snap(d(2025, 1, 1), 100.0, 120.0),
        snap(d(2025, 1, 2), 130.0, 120.0),
    ]);
    let adv = transform(&history, resolution(), d(2025, 1, 2));

    assert_eq!(adv.series.len(), 3);
    assert_relative_eq!(adv.series[0].percent, -16.666_666, epsilon = 1e-4);
    assert_relative_eq!(adv.series[2].percent, 8.333_333, epsilon = 1e-4);

    let crossing = &adv.series[1];
    assert_eq!(crossing.kind, PointKind::Crossing);
    assert_relative_eq!(crossing.percent, 0.0);
    assert_relative_eq!(crossing.x, 2.0 / 3.0, epsilon = 1e-9);
    assert_eq!(crossing.date, d(2025, 1, 1));

    let standing = adv.standing.unwrap();
    assert_eq!(standing.leader, Leader::A);
    assert_relative_eq!(standing.percent_ahead, 8.333_333, epsilon = 1e-4);
    assert_eq!(standing.as_of, d(2025, 1, 2));
}

#[test]
fn test_single_tie_snapshot() {
    let history = History::from_snapshots(vec![snap(d(2025, 6, 1), 50.0, 50.0)]);
    let adv = transform(&history, resolution(), d(2025, 6, 1));

    assert_eq!(adv.series.len(), 1);
    assert_relative_eq!(adv.series[0].percent, 0.0);
    assert_eq!(adv.crossings().count(), 0);

    let standing = adv.standing.unwrap();
    assert_eq!(standing.leader, Leader::Tie);
    assert_relative_eq!(standing.percent_ahead, 0.0);
}

#[test]
fn test_empty_history_has_no_standing() {
    let adv = transform(&History::new(), resolution(), d(2025, 1, 1));
    assert!(adv.is_empty());
    assert!(adv.standing.is_none());
    assert_eq!(adv.split(), SplitSeries::default());
}

// ═══════════════════════════════════════════════════════════════════════
// Crossing properties
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_one_crossing_per_sign_change() {
    // percents: +10, -10, +20, +5, -5
    let history = History::from_snapshots(vec![
        snap(d(2025, 1, 1), 110.0, 100.0),
        snap(d(2025, 1, 2), 90.0, 100.0),
        snap(d(2025, 1, 3), 120.0, 100.0),
        snap(d(2025, 1, 4), 105.0, 100.0),
        snap(d(2025, 1, 5), 95.0, 100.0),
    ]);
    let adv = transform(&history, resolution(), d(2025, 1, 5));

    assert_eq!(adv.crossings().count(), 3);
    assert_eq!(adv.series.len(), 8);

    for (i, p) in adv.series.iter().enumerate() {
        if p.kind == PointKind::Crossing {
            let prev = &adv.series[i - 1];
            let next = &adv.series[i + 1];
            assert_eq!(prev.kind, PointKind::Observed);
            assert_eq!(next.kind, PointKind::Observed);
            assert!(prev.percent * next.percent < 0.0);
            assert!(p.x > prev.x && p.x < next.x, "crossing must sit between neighbours");
            assert_relative_eq!(p.percent, 0.0, epsilon = 1e-12);
        }
    }

    // +10 -> -10 crosses exactly halfway
    assert_relative_eq!(adv.series[1].x, 0.5, epsilon = 1e-9);
}

#[test]
fn test_exact_zero_is_not_interpolated() {
    // percents: -50, 0, +50
    let history = History::from_snapshots(vec![
        snap(d(2025, 1, 1), 50.0, 100.0),
        snap(d(2025, 1, 2), 100.0, 100.0),
        snap(d(2025, 1, 3), 150.0, 100.0),
    ]);
    let adv = transform(&history, resolution(), d(2025, 1, 3));

    assert_eq!(adv.series.len(), 3);
    assert_eq!(adv.crossings().count(), 0);

    let parts = adv.split();
    assert_eq!(parts.positive, vec![None, Some(0.0), Some(50.0)]);
    assert_eq!(parts.negative, vec![Some(-50.0), Some(0.0), None]);
}

#[test]
fn test_crossing_respects_date_gaps() {
    // Ten-day gap: the crossing position is in day units, not index units.
    let history = History::from_snapshots(vec![
        snap(d(2025, 3, 1), 50.0, 100.0),
        snap(d(2025, 3, 11), 150.0, 100.0),
    ]);
    let adv = transform(&history, resolution(), d(2025, 3, 11));

    let crossing = adv.crossings().next().unwrap();
    assert_relative_eq!(crossing.x, 5.0, epsilon = 1e-9);
    assert_eq!(crossing.date, d(2025, 3, 6));
    assert_relative_eq!(adv.series[2].x, 10.0);
}

#[test]
fn test_split_series_stay_index_aligned() {
    let history = History::from_snapshots(vec![
        snap(d(2025, 1, 1), 110.0, 100.0),
        snap(d(2025, 1, 2), 90.0, 100.0),
        snap(d(2025, 1, 3), 95.0, 100.0),
    ]);
    let adv = transform(&history, resolution(), d(2025, 1, 3));
    let parts = adv.split();

    assert_eq!(parts.positive.len(), adv.series.len());
    assert_eq!(parts.negative.len(), adv.series.len());

    // Crossing point belongs to both halves so the fills meet at zero.
    assert_eq!(parts.positive[1], Some(0.0));
    assert_eq!(parts.negative[1], Some(0.0));
    assert_eq!(parts.positive[2], None);
    assert_eq!(parts.positive[3], None);
    assert!(parts.negative[0].is_none());
}

// ═══════════════════════════════════════════════════════════════════════
// Standing
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_leader_follows_last_snapshot_sign() {
    let cases = [(130.0, 120.0, Leader::A), (100.0, 120.0, Leader::B), (75.0, 75.0, Leader::Tie)];
    for (a, b, expected) in cases {
        let history = History::from_snapshots(vec![
            snap(d(2025, 1, 1), 500.0, 1.0),
            snap(d(2025, 1, 2), a, b),
        ]);
        let standing = transform(&history, resolution(), d(2025, 1, 2)).standing.unwrap();
        assert_eq!(standing.leader, expected, "a={} b={}", a, b);
    }
}

#[test]
fn test_percent_ahead_uses_loser_as_denominator() {
    let history = History::from_snapshots(vec![snap(d(2025, 1, 1), 100.0, 125.0)]);
    let standing = transform(&history, resolution(), d(2025, 1, 1)).standing.unwrap();
    assert_eq!(standing.leader, Leader::B);
    assert_relative_eq!(standing.percent_ahead, 25.0, epsilon = 1e-9);
}

#[test]
fn test_days_remaining_never_negative() {
    assert_eq!(days_remaining(d(2030, 5, 1), d(2030, 4, 30)), 1);
    assert_eq!(days_remaining(d(2030, 5, 1), d(2030, 5, 1)), 0);
    assert_eq!(days_remaining(d(2030, 5, 1), d(2031, 1, 1)), 0);

    let history = History::from_snapshots(vec![snap(d(2025, 1, 1), 1.0, 2.0)]);
    let standing = transform(&history, d(2024, 1, 1), d(2025, 1, 1)).standing.unwrap();
    assert_eq!(standing.days_remaining, 0);
}

#[test]
fn test_change_over_week() {
    let snaps: Vec<Snapshot> = (1..=10)
        .map(|day| snap(d(2025, 1, day), 100.0 + day as f64, 100.0))
        .collect();
    let history = History::from_snapshots(snaps);

    // latest Jan 10 (+10%), base is Jan 3 (+3%)
    assert_relative_eq!(change_over(&history, 7).unwrap(), 7.0, epsilon = 1e-9);

    // nothing a month old: falls back to the first snapshot
    assert_relative_eq!(change_over(&history, 30).unwrap(), 9.0, epsilon = 1e-9);

    assert!(change_over(&History::new(), 7).is_none());
}

#[test]
fn test_y_bound() {
    let history = History::from_snapshots(vec![snap(d(2025, 1, 1), 101.0, 100.0)]);
    let adv = transform(&history, resolution(), d(2025, 1, 1));
    assert_relative_eq!(y_bound(&adv.series), 5.0);

    let history = History::from_snapshots(vec![
        snap(d(2025, 1, 1), 130.0, 100.0),
        snap(d(2025, 1, 2), 80.0, 100.0),
    ]);
    let adv = transform(&history, resolution(), d(2025, 1, 2));
    // max |y| is 30 up to float error, so the bound is 33 or 34
    let bound = y_bound(&adv.series);
    assert!(bound >= 33.0 && bound <= 34.0, "bound = {}", bound);
}
