//! Append-only daily history of the two tracked market caps.
//!
//! The persisted file is a JSON array of `{date, valueA, valueB}` objects.
//! Readers are lenient: malformed entries are skipped with a warning and the
//! result is always sorted by date with one snapshot per date. Writers work on
//! the raw entries so nothing a reader skipped is lost.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::data_fetcher::{fetch_pair, MarketCapSource, RetryPolicy};
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub date: NaiveDate,
    #[serde(rename = "valueA", alias = "coinMarketCap")]
    pub value_a: f64,
    #[serde(rename = "valueB", alias = "bpMarketCap")]
    pub value_b: f64,
}

impl Snapshot {
    pub fn new(date: NaiveDate, value_a: f64, value_b: f64) -> Result<Self> {
        validate_value("valueA", value_a)?;
        validate_value("valueB", value_b)?;
        Ok(Snapshot {
            date,
            value_a,
            value_b,
        })
    }

    /// `(A - B) / B * 100`. Positive when A leads.
    pub fn signed_percent(&self) -> f64 {
        (self.value_a - self.value_b) / self.value_b * 100.0
    }
}

fn validate_value(field: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(Error::Validation(format!(
            "{} must be a positive number, got {}",
            field, value
        )));
    }
    Ok(())
}

/// Snapshots sorted ascending by date, at most one per date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct History {
    snapshots: Vec<Snapshot>,
}

impl History {
    pub fn new() -> Self {
        History::default()
    }

    /// Build from snapshots in any order. Later duplicates of a date win.
    pub fn from_snapshots<I>(snapshots: I) -> Self
    where
        I: IntoIterator<Item = Snapshot>,
    {
        let by_date: BTreeMap<NaiveDate, Snapshot> =
            snapshots.into_iter().map(|s| (s.date, s)).collect();
        History {
            snapshots: by_date.into_values().collect(),
        }
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn first(&self) -> Option<&Snapshot> {
        self.snapshots.first()
    }

    pub fn latest(&self) -> Option<&Snapshot> {
        self.snapshots.last()
    }

    pub fn get(&self, date: NaiveDate) -> Option<&Snapshot> {
        self.snapshots
            .binary_search_by_key(&date, |s| s.date)
            .ok()
            .map(|i| &self.snapshots[i])
    }

    /// Most recent `n` snapshots, oldest first.
    pub fn tail(&self, n: usize) -> &[Snapshot] {
        &self.snapshots[self.snapshots.len().saturating_sub(n)..]
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Appender
// ═══════════════════════════════════════════════════════════════════════

/// Insert or replace the snapshot for `date`, keeping date order. The input
/// history is never modified; invalid values return an error.
pub fn append(history: &History, date: NaiveDate, value_a: f64, value_b: f64) -> Result<History> {
    let snapshot = Snapshot::new(date, value_a, value_b)?;
    let mut snapshots = history.snapshots.clone();

    match snapshots.binary_search_by_key(&date, |s| s.date) {
        Ok(i) => {
            debug!(%date, "replacing existing snapshot");
            snapshots[i] = snapshot;
        }
        Err(i) => snapshots.insert(i, snapshot),
    }
    Ok(History { snapshots })
}

// ═══════════════════════════════════════════════════════════════════════
// File I/O
// ═══════════════════════════════════════════════════════════════════════

/// Parse a JSON array leniently. Entries that do not form a valid snapshot
/// are skipped. A document that is not an array is an error.
pub fn parse(raw: &str) -> Result<History> {
    let doc: Value = serde_json::from_str(raw)?;
    let entries = doc
        .as_array()
        .ok_or_else(|| Error::Validation("history file must contain a JSON array".into()))?;

    let mut snapshots = Vec::with_capacity(entries.len());
    for (idx, entry) in entries.iter().enumerate() {
        let parsed = serde_json::from_value::<Snapshot>(entry.clone())
            .map_err(Error::from)
            .and_then(|s| Snapshot::new(s.date, s.value_a, s.value_b));
        match parsed {
            Ok(s) => snapshots.push(s),
            Err(e) => warn!(index = idx, error = %e, "skipping malformed history entry"),
        }
    }

    Ok(History::from_snapshots(snapshots))
}

/// Load the history file. A missing file is an empty history.
pub fn load(path: &Path) -> Result<History> {
    if !path.exists() {
        debug!(path = %path.display(), "history file not found, starting empty");
        return Ok(History::new());
    }
    let raw = std::fs::read_to_string(path)?;
    if raw.trim().is_empty() {
        return Ok(History::new());
    }
    parse(&raw)
}

pub fn to_json(history: &History) -> Result<String> {
    Ok(serde_json::to_string_pretty(&history.snapshots)?)
}

/// Write through a sibling temp file and rename, so readers never observe a
/// half-written history.
pub fn save(history: &History, path: &Path) -> Result<()> {
    write_atomic(path, &to_json(history)?)
}

fn write_atomic(path: &Path, body: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, format!("{}\n", body))?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════
// Recording
// ═══════════════════════════════════════════════════════════════════════

/// Raw entries of the history file. Entries the reader would skip are kept
/// as-is so a write never drops them.
fn read_entries(path: &Path) -> Result<Vec<Value>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let raw = std::fs::read_to_string(path)?;
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    match serde_json::from_str::<Value>(&raw)? {
        Value::Array(entries) => Ok(entries),
        _ => Err(Error::Validation(format!(
            "{} must contain a JSON array",
            path.display()
        ))),
    }
}

fn entry_date(entry: &Value) -> Option<NaiveDate> {
    let raw = entry.get("date")?.as_str()?;
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

/// Replace every entry dated `snapshot.date` with `snapshot`, keep all other
/// entries untouched, and order by date. Undated entries sort first.
pub fn upsert_entry(entries: &mut Vec<Value>, snapshot: &Snapshot) -> Result<bool> {
    let before = entries.len();
    entries.retain(|e| entry_date(e) != Some(snapshot.date));
    let replaced = entries.len() != before;

    entries.push(serde_json::to_value(snapshot)?);
    entries.sort_by_key(entry_date);
    Ok(replaced)
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordOutcome {
    pub snapshot: Snapshot,
    pub replaced: bool,
    /// Entries in the file after the write, including ones readers skip.
    pub entries: usize,
}

/// Append (or replace) the snapshot for `date` in the file at `path`.
/// Values are rounded to whole units. The file is only rewritten once the
/// new snapshot is valid.
pub fn record(path: &Path, date: NaiveDate, value_a: f64, value_b: f64) -> Result<RecordOutcome> {
    let mut entries = read_entries(path)?;
    record_into(path, &mut entries, date, value_a, value_b)
}

fn record_into(
    path: &Path,
    entries: &mut Vec<Value>,
    date: NaiveDate,
    value_a: f64,
    value_b: f64,
) -> Result<RecordOutcome> {
    let snapshot = Snapshot::new(date, value_a.round(), value_b.round())?;
    let replaced = upsert_entry(entries, &snapshot)?;
    write_atomic(path, &serde_json::to_string_pretty(&*entries)?)?;

    info!(
        %date,
        value_a = snapshot.value_a,
        value_b = snapshot.value_b,
        replaced,
        entries = entries.len(),
        path = %path.display(),
        "snapshot recorded"
    );
    Ok(RecordOutcome {
        snapshot,
        replaced,
        entries: entries.len(),
    })
}

/// Fetch both market caps and record them for `date`. The history file is
/// read first and left untouched when either fetch fails.
pub fn record_fetched<S: MarketCapSource + ?Sized>(
    path: &Path,
    date: NaiveDate,
    source: &S,
    ticker_a: &str,
    ticker_b: &str,
    policy: RetryPolicy,
) -> Result<RecordOutcome> {
    let mut entries = read_entries(path)?;
    let (value_a, value_b) = fetch_pair(source, ticker_a, ticker_b, policy)?;
    record_into(path, &mut entries, date, value_a, value_b)
}
