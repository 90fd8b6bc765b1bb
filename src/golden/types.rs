use serde::{Deserialize, Serialize};

use crate::log::{GoldenAction, LogError};

/// How a golden checkpoint's actions are compared
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CheckpointKind {
    /// Actions aligned as an ordered sequence
    #[default]
    Sequential,

    /// Actions matched as a set, position ignored
    Orderless,

    /// Actions are not compared; the checkpoint is scored by the
    /// full-match verifier alone and reported as these task labels
    TaskOnly { relevant_tasks: Vec<GoldenAction> },
}

/// One expected page visit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoldenCheckpoint {
    /// Stable identifier, used to start a run mid-sequence
    pub name: String,

    /// Expected URL; bracketed query values are placeholders
    pub url: String,

    /// Expected actions on this page
    #[serde(default)]
    pub actions: Vec<GoldenAction>,

    #[serde(default)]
    pub kind: CheckpointKind,

    /// URL the next observed checkpoint must match for a full match
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_match_verifier_next_checkpoint: Option<String>,
}

impl GoldenCheckpoint {
    pub fn new(name: impl Into<String>, url: impl Into<String>, actions: Vec<GoldenAction>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            actions,
            kind: CheckpointKind::Sequential,
            full_match_verifier_next_checkpoint: None,
        }
    }

    pub fn orderless(mut self) -> Self {
        self.kind = CheckpointKind::Orderless;
        self
    }

    pub fn task_only(mut self, relevant_tasks: Vec<GoldenAction>) -> Self {
        self.kind = CheckpointKind::TaskOnly { relevant_tasks };
        self
    }

    pub fn verified_by(mut self, next_url: impl Into<String>) -> Self {
        self.full_match_verifier_next_checkpoint = Some(next_url.into());
        self
    }

    pub fn relevant_tasks(&self) -> Option<&[GoldenAction]> {
        match &self.kind {
            CheckpointKind::TaskOnly { relevant_tasks } => Some(relevant_tasks),
            _ => None,
        }
    }

    /// Units this checkpoint is scored in: relevant tasks when task-only,
    /// otherwise its actions
    pub fn scored_actions(&self) -> &[GoldenAction] {
        self.relevant_tasks().unwrap_or(self.actions.as_slice())
    }
}

/// Final URL and payload that certify the whole task was completed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndToEndSpec {
    pub path: String,

    /// Expected query parameters, each one JSON-decoded
    pub params: serde_json::Value,
}

/// A golden trajectory test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoldenTest {
    pub name: String,

    /// Instruction handed to the agent
    pub goal: String,

    pub checkpoints: Vec<GoldenCheckpoint>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_to_end: Option<EndToEndSpec>,
}

impl GoldenTest {
    pub fn checkpoint_index(&self, name: &str) -> LibraryResult<usize> {
        self.checkpoints
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| LibraryError::UnknownCheckpoint {
                test: self.name.clone(),
                checkpoint: name.to_string(),
            })
    }

    /// Golden checkpoints to score for a run that started at `start`
    /// (or at the beginning), optionally limited to that one checkpoint.
    pub fn golden_slice(&self, start: Option<&str>, checkpoint_only: bool) -> LibraryResult<&[GoldenCheckpoint]> {
        let from = match start {
            Some(name) => self.checkpoint_index(name)?,
            None => 0,
        };
        let rest = &self.checkpoints[from..];
        if checkpoint_only {
            Ok(&rest[..rest.len().min(1)])
        } else {
            Ok(rest)
        }
    }
}

/// Result type for golden library operations
pub type LibraryResult<T> = Result<T, LibraryError>;

/// Error types for golden library lookups and loading
#[derive(Debug)]
pub enum LibraryError {
    /// No trajectory test with this name
    UnknownTest(String),

    /// The test has no checkpoint with this name
    UnknownCheckpoint { test: String, checkpoint: String },

    /// No component test for this task/test/variant
    UnknownComponentTest(String),

    /// A library definition that cannot be used
    Invalid(String),

    /// A golden action string that does not parse
    InvalidAction(LogError),

    /// Library file is not valid JSON for the schema
    Json(serde_json::Error),

    /// I/O error reading a library file
    Io(std::io::Error),
}

impl std::fmt::Display for LibraryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LibraryError::UnknownTest(name) => write!(f, "Unable to find test {}", name),
            LibraryError::UnknownCheckpoint { test, checkpoint } => {
                write!(f, "Unable to find checkpoint {} in test {}", checkpoint, test)
            }
            LibraryError::UnknownComponentTest(name) => write!(f, "Unable to find component test {}", name),
            LibraryError::Invalid(msg) => write!(f, "Invalid library: {}", msg),
            LibraryError::InvalidAction(err) => write!(f, "Invalid golden action: {}", err),
            LibraryError::Json(err) => write!(f, "Library JSON error: {}", err),
            LibraryError::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for LibraryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LibraryError::InvalidAction(err) => Some(err),
            LibraryError::Json(err) => Some(err),
            LibraryError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<LogError> for LibraryError {
    fn from(err: LogError) -> Self {
        LibraryError::InvalidAction(err)
    }
}

impl From<serde_json::Error> for LibraryError {
    fn from(err: serde_json::Error) -> Self {
        LibraryError::Json(err)
    }
}

impl From<std::io::Error> for LibraryError {
    fn from(err: std::io::Error) -> Self {
        LibraryError::Io(err)
    }
}
