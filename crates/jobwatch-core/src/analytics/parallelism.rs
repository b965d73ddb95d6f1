//! Per-job concurrency window: the span during which every instance of a job
//! was running at once.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::warn;

use super::RangeFinder;
use crate::domain::{JobAggregate, UsageRecord};
use crate::ports::Clock;

/// Group `records` by jobpath and compute each job's common window.
///
/// Records with neither a start nor an end carry nothing to aggregate and
/// are skipped. A malformed timestamp counts as absent.
pub fn calculate_parallelism(
    records: &[UsageRecord],
    clock: &dyn Clock,
) -> BTreeMap<String, JobAggregate> {
    let baseline = clock.now();
    let mut jobs: BTreeMap<String, (JobAggregate, RangeFinder, RangeFinder)> = BTreeMap::new();

    for record in records {
        let start = timestamp(record, record.start_time());
        let end = timestamp(record, record.end_time());
        if start.is_none() && end.is_none() {
            warn!(
                jobpath = %record.jobpath,
                instance = %record.instance_id,
                "usage record has neither start nor end, skipping"
            );
            continue;
        }

        let (job, starts, ends) = jobs.entry(record.jobpath.clone()).or_insert_with(|| {
            (
                JobAggregate::default(),
                RangeFinder::new(baseline),
                RangeFinder::new(baseline),
            )
        });

        if let Some(ts) = start {
            starts.update(ts);
        }
        if let Some(ts) = end {
            ends.update(ts);
        }

        let duration = match (start, end) {
            (Some(s), Some(e)) => Some((e - s).num_seconds()),
            _ => None,
        };
        job.instances.push(record.instance_id.clone());
        job.durations.insert(record.instance_id.clone(), duration);
        job.starts.insert(record.instance_id.clone(), start);
        job.ends.insert(record.instance_id.clone(), end);
    }

    jobs.into_iter()
        .map(|(jobpath, (mut job, starts, ends))| {
            job.laststart = starts.endtime();
            job.firstend = ends.starttime();
            (jobpath, job)
        })
        .collect()
}

/// Keep only jobs whose every instance has an end.
///
/// A job missing `laststart` or `firstend` is dropped. An instance with an
/// end but no start is assumed to have started at the job's `laststart`.
pub fn postprocess_jobdict(
    by_job: BTreeMap<String, JobAggregate>,
) -> BTreeMap<String, JobAggregate> {
    by_job
        .into_iter()
        .filter_map(|(jobpath, mut job)| {
            let (Some(laststart), Some(_)) = (job.laststart, job.firstend) else {
                warn!(jobpath = %jobpath, "job has no common window, dropping");
                return None;
            };

            for instance in &job.instances {
                let end = job.ends.get(instance).copied().flatten();
                let start = job.starts.get(instance).copied().flatten();
                if let (None, Some(end)) = (start, end) {
                    job.starts.insert(instance.clone(), Some(laststart));
                    job.durations
                        .insert(instance.clone(), Some((end - laststart).num_seconds()));
                }
            }

            let unfinished = job
                .instances
                .iter()
                .any(|i| job.ends.get(i).copied().flatten().is_none());
            if unfinished {
                warn!(jobpath = %jobpath, "job has unfinished instances, dropping");
                return None;
            }
            Some((jobpath, job))
        })
        .collect()
}

fn timestamp(
    record: &UsageRecord,
    parsed: crate::Result<Option<DateTime<Utc>>>,
) -> Option<DateTime<Utc>> {
    parsed.unwrap_or_else(|err| {
        warn!(instance = %record.instance_id, error = %err, "unparsable usage timestamp");
        None
    })
}
