//! Usage records (input to analytics) and the reports derived from them.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::{JobwatchError, Result};

/// Timestamp layout of usage records.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

pub const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| JobwatchError::Format(format!("timestamp {raw:?}: {e}")))
}

pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Cost record of one instance execution.
///
/// `start` / `end` are absent while the instance is still running, or when the
/// record was never completed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    /// Price per hour.
    pub price: f64,

    #[serde(default)]
    pub start: Option<String>,

    #[serde(default)]
    pub end: Option<String>,

    pub jobpath: String,

    #[serde(rename = "instance-id")]
    pub instance_id: String,
}

impl UsageRecord {
    /// `Ok(None)` when absent, `Err` when present but malformed.
    pub fn start_time(&self) -> Result<Option<DateTime<Utc>>> {
        self.start.as_deref().map(parse_timestamp).transpose()
    }

    pub fn end_time(&self) -> Result<Option<DateTime<Utc>>> {
        self.end.as_deref().map(parse_timestamp).transpose()
    }

    /// Run time in seconds, or `IncompleteRecord` if either end is missing.
    pub fn duration_secs(&self) -> Result<i64> {
        match (self.start_time()?, self.end_time()?) {
            (Some(start), Some(end)) => Ok((end - start).num_seconds()),
            _ => Err(JobwatchError::IncompleteRecord(self.instance_id.clone())),
        }
    }
}

/// Instances of one job and the window during which all of them were active.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct JobAggregate {
    pub instances: Vec<String>,

    /// Seconds per instance; `None` when the instance lacks a start or an end.
    pub durations: BTreeMap<String, Option<i64>>,

    /// Start of the slowest-to-start instance.
    pub laststart: Option<DateTime<Utc>>,

    /// End of the first instance to finish.
    pub firstend: Option<DateTime<Utc>>,

    #[serde(skip)]
    pub starts: BTreeMap<String, Option<DateTime<Utc>>>,

    #[serde(skip)]
    pub ends: BTreeMap<String, Option<DateTime<Utc>>>,
}

impl JobAggregate {
    /// Seconds during which every instance of the job was running at once.
    pub fn overlap_secs(&self) -> Option<i64> {
        match (self.laststart, self.firstend) {
            (Some(start), Some(end)) if end > start => Some((end - start).num_seconds()),
            (Some(_), Some(_)) => Some(0),
            _ => None,
        }
    }
}

/// Twelve calendar-month buckets, serialized as `{"January": .., ..., "December": ..}`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MonthlyTotals([f64; 12]);

impl MonthlyTotals {
    /// `month` is 1-based, as returned by `chrono::Datelike::month`.
    pub fn add(&mut self, month: u32, amount: f64) {
        if let Some(slot) = month.checked_sub(1).and_then(|i| self.0.get_mut(i as usize)) {
            *slot += amount;
        }
    }

    pub fn get(&self, month: u32) -> f64 {
        month
            .checked_sub(1)
            .and_then(|i| self.0.get(i as usize))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn total(&self) -> f64 {
        self.0.iter().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        MONTH_NAMES.iter().copied().zip(self.0.iter().copied())
    }
}

impl Serialize for MonthlyTotals {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(12))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, &value)?;
        }
        map.end()
    }
}

/// Per-user monthly cost and run time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserUsageReport {
    pub username: String,
    pub cost: MonthlyTotals,
    pub duration: MonthlyTotals,
}
