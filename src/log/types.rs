use serde::{Deserialize, Serialize};

use crate::log::action::Action;

/// One page visit and everything done there before navigating away
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// URL the `NAVIGATE` line reported
    pub url: String,

    /// Actions in the order they were logged
    pub actions: Vec<Action>,
}

impl Checkpoint {
    pub fn new(url: impl Into<String>, actions: Vec<Action>) -> Self {
        Self {
            url: url.into(),
            actions,
        }
    }
}

/// Parsed `TEST BEGIN:` header
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TestHeader {
    /// `playground` for trajectory tests, the component task otherwise
    pub task: String,

    /// Test name within the task
    pub test: String,

    /// Starting checkpoint (trajectory) or variant name (component)
    pub argument: Option<String>,

    /// Whether only a single checkpoint is evaluated
    pub checkpoint_only: bool,
}

impl TestHeader {
    /// Canonical header text, as written after `TEST BEGIN: `
    pub fn render(&self) -> String {
        let mut out = format!("{}/{}", self.task, self.test);
        if let Some(argument) = &self.argument {
            out.push(' ');
            out.push_str(argument);
        }
        if self.checkpoint_only {
            out.push_str(" -checkpointonly");
        }
        out
    }
}

/// Everything logged between one `TEST BEGIN` and its `TEST FINISH`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestRecord {
    pub header: TestHeader,

    /// Actions logged before the first `NAVIGATE`
    pub preamble: Vec<Action>,

    /// Checkpoints in visit order
    pub checkpoints: Vec<Checkpoint>,

    /// Final `SUBMIT` payload, if any (the last one wins)
    pub submit: Option<Action>,

    /// False when the record was closed by end of input or a new header
    pub finished: bool,
}

impl TestRecord {
    /// Flat action view used by component tests
    pub fn flat_actions(&self) -> Vec<&Action> {
        self.preamble
            .iter()
            .chain(self.checkpoints.iter().flat_map(|c| c.actions.iter()))
            .collect()
    }
}

/// Result type for log operations
pub type LogResult<T> = Result<T, LogError>;

/// Error types for log parsing
#[derive(Debug)]
pub enum LogError {
    /// A line that does not follow the log grammar
    Parse {
        line_number: usize,
        line: String,
        reason: String,
    },

    /// I/O error while reading a log
    Io(std::io::Error),
}

impl LogError {
    pub fn parse(line_number: usize, line: &str, reason: impl Into<String>) -> Self {
        LogError::Parse {
            line_number,
            line: line.to_string(),
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for LogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogError::Parse {
                line_number,
                line,
                reason,
            } => write!(f, "Parse error at line {}: {} ({:?})", line_number, reason, line),
            LogError::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for LogError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LogError::Parse { .. } => None,
            LogError::Io(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for LogError {
    fn from(err: std::io::Error) -> Self {
        LogError::Io(err)
    }
}
