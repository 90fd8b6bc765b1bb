//! Playground Eval - scoring browser-agent trajectories against golden
//! checkpoints.
//!
//! This crate provides:
//! - Parsing of the playground's shared action log into per-test records
//! - A URL matcher with `[..]` placeholder query values
//! - A two-cursor alignment engine with lookahead and an orderless mode
//! - Checkpoint, end-to-end and individual-component evaluation
//! - Pass statistics rolled up by test, task and category, rendered as CSV
//!   and plain-text summaries
//! - A driver that runs an external agent under time and log-growth limits
//!
//! # Example
//!
//! ```rust,no_run
//! use playground_eval::evaluate::evaluate_trajectory_log;
//! use playground_eval::golden::library;
//! use playground_eval::score::TrajectoryReport;
//!
//! let text = std::fs::read_to_string("trajectories/log.txt").unwrap();
//! let evaluated = evaluate_trajectory_log(library::builtin(), &text, false).unwrap();
//! print!("{}", TrajectoryReport::from_evaluations(&evaluated).summary_text());
//! ```

pub mod config;
pub mod evaluate;
pub mod golden;
pub mod harness;
pub mod log;
pub mod runner;
pub mod score;
pub mod session;
pub mod url_match;

// Re-export log model
pub use log::{Action, Checkpoint, GoldenAction, LogError, LogResult, TestHeader, TestRecord};

// Re-export golden data
pub use golden::{
    ComponentLibrary, EndToEndSpec, GoldenCheckpoint, GoldenTest, LibraryError, LibraryResult, TrajectoryLibrary,
};

// Re-export evaluation entry points
pub use evaluate::{
    CheckpointStatus, EvaluatedCheckpoint, EvaluatedComponentTest, EvaluatedTest, RunEvaluation, align,
    evaluate_component_log, evaluate_trajectory_log,
};

// Re-export reports
pub use score::{CategoryTable, ComponentReport, TrajectoryReport};

// Re-export harness types
pub use harness::{HarnessConfig, HarnessError, HarnessResult, run_component_harness, run_trajectory_harness};

// Re-export runner and session types
pub use runner::{RunOutcome, RunReport};
pub use session::{RunManifest, RunMode, Session};
