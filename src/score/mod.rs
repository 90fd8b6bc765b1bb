//! Aggregation of evaluations into tallies, tables and report files.

pub mod category;
pub mod report;
pub mod stats;

pub use category::{CategoryRow, CategoryTable, UNCATEGORIZED, category_for_task};
pub use report::{
    ComponentReport, ComponentRow, E2E_OUTPUT_FILE, E2E_SUMMARY_FILE, E2E_TASK_OUTPUT_FILE, IND_OUTPUT_FILE,
    IND_SUMMARY_FILE, TestSummary, TrajectoryReport,
};
pub use stats::{CheckpointMatchStats, CorrectMissing, PassStats, display_pass_stats};
