//! Usage analytics over per-instance usage records.
//!
//! # 構成
//! - **range**: RangeFinder（基準時刻からの差分で最早・最遅を追跡）
//! - **parallelism**: jobpath ごとの同時実行ウィンドウ
//! - **usage**: 月次コスト・実行時間、解析コスト、store からの読み込み
//!
//! Everything here is read-only with respect to the store.

pub mod parallelism;
pub mod range;
pub mod usage;

pub use parallelism::{calculate_parallelism, postprocess_jobdict};
pub use range::RangeFinder;
pub use usage::{
    calculate_usage, get_analysis_cost, job_parallelism_report, list_usage_records, usage_prefix,
    usage_reports, user_usage_report,
};
