//! Earliest / latest tracking relative to a fixed baseline.

use chrono::{DateTime, Utc};

/// Tracks the earliest and latest of a stream of timestamps.
///
/// Each timestamp is measured as `baseline - ts` in seconds. The largest
/// difference is the earliest timestamp (`starttime`), the smallest is the
/// latest (`endtime`).
#[derive(Debug, Clone, PartialEq)]
pub struct RangeFinder {
    baseline: DateTime<Utc>,
    diff_min: Option<i64>,
    diff_max: Option<i64>,
    starttime: Option<DateTime<Utc>>,
    endtime: Option<DateTime<Utc>>,
}

impl RangeFinder {
    pub fn new(baseline: DateTime<Utc>) -> Self {
        Self {
            baseline,
            diff_min: None,
            diff_max: None,
            starttime: None,
            endtime: None,
        }
    }

    pub fn update(&mut self, ts: DateTime<Utc>) {
        let diff = (self.baseline - ts).num_seconds();
        if self.diff_max.is_none_or(|max| diff > max) {
            self.diff_max = Some(diff);
            self.starttime = Some(ts);
        }
        if self.diff_min.is_none_or(|min| diff < min) {
            self.diff_min = Some(diff);
            self.endtime = Some(ts);
        }
    }

    /// Earliest timestamp seen.
    pub fn starttime(&self) -> Option<DateTime<Utc>> {
        self.starttime
    }

    /// Latest timestamp seen.
    pub fn endtime(&self) -> Option<DateTime<Utc>> {
        self.endtime
    }
}
