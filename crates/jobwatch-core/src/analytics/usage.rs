//! Monthly cost and run time, analysis cost, and the store-backed report loaders.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Datelike;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::{calculate_parallelism, postprocess_jobdict};
use crate::config::JobwatchConfig;
use crate::domain::{JobAggregate, MonthlyTotals, UsageRecord, UserUsageReport};
use crate::error::Result;
use crate::ports::{Clock, ObjectStore};

const SECONDS_PER_HOUR: f64 = 3600.0;

/// Bucket cost (`price * hours`) and run time by the month each record started.
///
/// Records missing either timestamp, or carrying a malformed one, are skipped.
pub fn calculate_usage(records: &[UsageRecord], user: &str) -> UserUsageReport {
    let mut cost = MonthlyTotals::default();
    let mut duration = MonthlyTotals::default();

    for record in records {
        let (start, end) = match (record.start_time(), record.end_time()) {
            (Ok(Some(start)), Ok(Some(end))) => (start, end),
            _ => {
                warn!(instance = %record.instance_id, "incomplete usage record, skipping");
                continue;
            }
        };
        let secs = (end - start).num_seconds() as f64;
        cost.add(start.month(), record.price * secs / SECONDS_PER_HOUR);
        duration.add(start.month(), secs);
    }

    UserUsageReport {
        username: user.to_string(),
        cost,
        duration,
    }
}

/// Key prefix holding the usage records of `group`: `<group>/<usage_log_dir>/`.
pub fn usage_prefix(config: &JobwatchConfig, group: &str) -> String {
    format!(
        "{}/{}/",
        group.trim_end_matches('/'),
        config.usage_log_dir.trim_matches('/')
    )
}

/// Every `.json` usage record under `prefix`.
///
/// Listing failures propagate. A single record that cannot be read or parsed
/// is logged and left out.
pub async fn list_usage_records(
    store: &dyn ObjectStore,
    bucket: &str,
    prefix: &str,
) -> Result<Vec<UsageRecord>> {
    let keys = store.list(bucket, prefix).await?;
    let mut records = Vec::with_capacity(keys.len());

    for key in keys.iter().filter(|k| k.ends_with(".json")) {
        let bytes = match store.get(bucket, key).await {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(bucket, key = %key, error = %err, "usage record unreadable, skipping");
                continue;
            }
        };
        match serde_json::from_slice::<UsageRecord>(&bytes) {
            Ok(record) => records.push(record),
            Err(err) => warn!(bucket, key = %key, error = %err, "usage record malformed, skipping"),
        }
    }

    debug!(bucket, prefix, count = records.len(), "loaded usage records");
    Ok(records)
}

/// Total cost of the analyses recorded under `group`.
///
/// An instance whose run time cannot be determined is charged one hour at its price.
pub async fn get_analysis_cost(
    store: &dyn ObjectStore,
    config: &JobwatchConfig,
    bucket: &str,
    group: &str,
) -> Result<f64> {
    let records = list_usage_records(store, bucket, &usage_prefix(config, group)).await?;
    let total = records
        .iter()
        .map(|record| match record.duration_secs() {
            Ok(secs) => record.price * secs as f64 / SECONDS_PER_HOUR,
            Err(err) => {
                warn!(instance = %record.instance_id, error = %err, "charging flat hourly price");
                record.price
            }
        })
        .sum();
    Ok(total)
}

pub async fn user_usage_report(
    store: &dyn ObjectStore,
    config: &JobwatchConfig,
    bucket: &str,
    user: &str,
) -> Result<UserUsageReport> {
    let records = list_usage_records(store, bucket, &usage_prefix(config, user)).await?;
    Ok(calculate_usage(&records, user))
}

/// Post-processed parallelism of every job recorded under `group`.
pub async fn job_parallelism_report(
    store: &dyn ObjectStore,
    config: &JobwatchConfig,
    clock: &dyn Clock,
    bucket: &str,
    group: &str,
) -> Result<BTreeMap<String, JobAggregate>> {
    let records = list_usage_records(store, bucket, &usage_prefix(config, group)).await?;
    Ok(postprocess_jobdict(calculate_parallelism(&records, clock)))
}

/// One report per user, loaded concurrently and returned in the order of `users`.
pub async fn usage_reports(
    store: Arc<dyn ObjectStore>,
    config: &JobwatchConfig,
    bucket: &str,
    users: &[String],
) -> Result<Vec<UserUsageReport>> {
    let mut tasks = JoinSet::new();
    for (idx, user) in users.iter().enumerate() {
        let store = store.clone();
        let config = config.clone();
        let bucket = bucket.to_string();
        let user = user.clone();
        tasks.spawn(async move {
            let report = user_usage_report(store.as_ref(), &config, &bucket, &user).await;
            (idx, report)
        });
    }

    let mut reports = Vec::with_capacity(users.len());
    while let Some(joined) = tasks.join_next().await {
        let (idx, report) = joined.map_err(std::io::Error::from)?;
        reports.push((idx, report?));
    }
    reports.sort_by_key(|(idx, _)| *idx);

    info!(bucket, users = users.len(), "usage reports complete");
    Ok(reports.into_iter().map(|(_, report)| report).collect())
}
