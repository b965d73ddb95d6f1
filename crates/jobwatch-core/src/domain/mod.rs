//! Domain model (addresses, statuses, records, usage reports).

pub mod record;
pub mod status;
pub mod uri;
pub mod usage;

pub use record::{NOT_AVAILABLE, StatusRecord, status_key};
pub use status::{JobStatus, OOM_KILL_EXIT_CODE};
pub use uri::RemoteUri;
pub use usage::{
    JobAggregate, MonthlyTotals, UsageRecord, UserUsageReport, format_timestamp, parse_timestamp,
};
