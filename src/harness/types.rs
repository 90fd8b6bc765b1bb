use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::config::Config;
use crate::golden::LibraryError;
use crate::log::{LogError, NAVIGATE};

/// Configuration for one harness invocation
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Shared trajectory log the playground appends to
    pub log_file: PathBuf,

    /// Directory where reports and the run manifest are written
    pub output_dir: PathBuf,

    /// Agent program and fixed arguments; goal, URL and timeout are appended
    pub agent_command: Vec<String>,

    /// Port the playground frontend listens on
    pub port: u16,

    /// Time limit when only one checkpoint is run
    pub checkpoint_timeout: Duration,

    /// Time limit for a full trajectory
    pub full_timeout: Duration,

    /// Lines an agent run may append before it is stopped
    pub line_limit: usize,

    /// Log polling interval while the agent runs
    pub poll_interval: Duration,

    /// Grace period between SIGTERM and a hard kill
    pub kill_grace: Duration,

    /// Count golden actions of missing checkpoints as missing
    pub include_missing_checkpoints: bool,

    /// Repetitions of each selection
    pub repetitions: usize,

    /// Skip the agent and only score the existing log
    pub eval_only: bool,

    /// Run and score each checkpoint on its own
    pub checkpoint_only: bool,
}

impl HarnessConfig {
    /// Default grace period before a stopped agent is killed
    pub const DEFAULT_KILL_GRACE: Duration = Duration::from_secs(2);

    pub fn from_config(config: &Config) -> Self {
        Self {
            log_file: config.paths.log_file.clone(),
            output_dir: config.paths.output_dir.clone(),
            agent_command: config.agent.command.clone(),
            port: config.agent.port,
            checkpoint_timeout: config.limits.checkpoint_timeout,
            full_timeout: config.limits.full_timeout,
            line_limit: config.limits.line_limit,
            poll_interval: config.limits.poll_interval,
            kill_grace: Self::DEFAULT_KILL_GRACE,
            include_missing_checkpoints: config.limits.include_missing_checkpoints,
            repetitions: 1,
            eval_only: false,
            checkpoint_only: false,
        }
    }

    /// Time limit for a run in the current mode
    pub fn timeout(&self) -> Duration {
        if self.checkpoint_only {
            self.checkpoint_timeout
        } else {
            self.full_timeout
        }
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self::from_config(&Config::defaults())
    }
}

/// One trajectory run to perform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrajectorySelection {
    pub test: String,

    /// Checkpoint to start from; `None` starts at the beginning
    pub starting_checkpoint: Option<String>,

    /// Path and query the agent starts on
    pub path: String,
}

/// One component variant to run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentSelection {
    pub task: String,
    pub test: String,
    pub variant: String,
}

/// Condition on newly appended log lines that ends a run early
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopRule {
    /// Run until exit, timeout or line limit
    Never,

    /// Stop on the first new `NAVIGATE` line
    FirstNavigate,

    /// Stop once a `NAVIGATE` line contains this text
    NavigateContaining(String),
}

impl StopRule {
    pub fn fires(&self, line: &str) -> bool {
        match self {
            StopRule::Never => false,
            StopRule::FirstNavigate => line.contains(NAVIGATE),
            StopRule::NavigateContaining(needle) => line.contains(NAVIGATE) && line.contains(needle.as_str()),
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            StopRule::Never => "none",
            StopRule::FirstNavigate => "only running for single checkpoint",
            StopRule::NavigateContaining(_) => "only running until the end-to-end goal path",
        }
    }
}

/// Result type for harness operations
pub type HarnessResult<T> = Result<T, HarnessError>;

/// Error types for harness operations
#[derive(Debug)]
pub enum HarnessError {
    /// Error spawning or supervising the agent
    Process(String),

    /// I/O error on the log or report files
    Io(std::io::Error),

    /// The trajectory log could not be parsed
    Log(LogError),

    /// A library lookup or load failed
    Library(LibraryError),

    /// Selectors were given but none named a known test
    NoTestsSelected,
}

impl std::fmt::Display for HarnessError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HarnessError::Process(msg) => write!(f, "Process error: {}", msg),
            HarnessError::Io(err) => write!(f, "I/O error: {}", err),
            HarnessError::Log(err) => write!(f, "Log error: {}", err),
            HarnessError::Library(err) => write!(f, "Library error: {}", err),
            HarnessError::NoTestsSelected => write!(f, "No tests matched the given selectors"),
        }
    }
}

impl std::error::Error for HarnessError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HarnessError::Process(_) | HarnessError::NoTestsSelected => None,
            HarnessError::Io(err) => Some(err),
            HarnessError::Log(err) => Some(err),
            HarnessError::Library(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for HarnessError {
    fn from(err: std::io::Error) -> Self {
        HarnessError::Io(err)
    }
}

impl From<LogError> for HarnessError {
    fn from(err: LogError) -> Self {
        HarnessError::Log(err)
    }
}

impl From<LibraryError> for HarnessError {
    fn from(err: LibraryError) -> Self {
        HarnessError::Library(err)
    }
}
