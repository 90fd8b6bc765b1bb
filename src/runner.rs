//! Types for supervised agent runs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Why a supervised agent run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// The agent exited on its own
    Exited,

    /// The time limit elapsed
    TimedOut,

    /// The agent appended more log lines than allowed
    LineLimit,

    /// A caller-supplied stop predicate fired on a new log line
    CustomBreak,
}

impl RunOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunOutcome::Exited => "exited",
            RunOutcome::TimedOut => "timed_out",
            RunOutcome::LineLimit => "line_limit",
            RunOutcome::CustomBreak => "custom_break",
        }
    }

    /// True when the harness stopped the agent rather than it exiting
    pub fn was_stopped(&self) -> bool {
        !matches!(self, RunOutcome::Exited)
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one repetition of one selection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Header text the run was logged under
    pub header: String,

    /// Zero-based repetition index
    pub repetition: usize,

    pub outcome: RunOutcome,

    /// Complete lines the agent appended to the log
    pub lines_appended: usize,

    /// Wall-clock time of the run
    #[serde(with = "duration_millis")]
    pub elapsed: Duration,
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
