//! Configuration management with environment variable support.
//!
//! Every setting has a compiled-in default and can be overridden through an
//! environment variable. Command-line flags override both for a single
//! invocation.
//!
//! # Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `PLAYGROUND_EVAL_LOG_FILE` | Shared trajectory log written by the playground | `trajectories/log.txt` |
//! | `PLAYGROUND_EVAL_OUTPUT_DIR` | Directory for CSV and summary reports | `output` |
//! | `PLAYGROUND_EVAL_AGENT_CMD` | Agent command line (goal, URL and timeout seconds are appended) | `python -m evaluation.agent` |
//! | `PLAYGROUND_EVAL_PORT` | Port the playground frontend listens on | `3000` |
//! | `PLAYGROUND_EVAL_CHECKPOINT_TIMEOUT` | Agent time limit for checkpoint-only runs (seconds) | `90` |
//! | `PLAYGROUND_EVAL_FULL_TIMEOUT` | Agent time limit for full runs (seconds) | `300` |
//! | `PLAYGROUND_EVAL_LINE_LIMIT` | Maximum log lines an agent run may append | `100` |
//! | `PLAYGROUND_EVAL_POLL_INTERVAL_MS` | Log polling interval (milliseconds) | `1000` |
//! | `PLAYGROUND_EVAL_INCLUDE_MISSING` | Count golden actions of missing checkpoints as missing | `false` |
//!
//! # Example
//!
//! ```bash
//! export PLAYGROUND_EVAL_AGENT_CMD="python -m evaluation.agents.seeact"
//! export PLAYGROUND_EVAL_FULL_TIMEOUT=600
//! ```

use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;

// ============================================================================
// Default Values
// ============================================================================

/// Default trajectory log path
pub const DEFAULT_LOG_FILE: &str = "trajectories/log.txt";

/// Default report directory
pub const DEFAULT_OUTPUT_DIR: &str = "output";

/// Default agent command line
pub const DEFAULT_AGENT_CMD: &str = "python -m evaluation.agent";

/// Default playground port
pub const DEFAULT_PORT: u16 = 3000;

/// Default time limit for a single-checkpoint run (seconds)
pub const DEFAULT_CHECKPOINT_TIMEOUT: u64 = 90;

/// Default time limit for a full trajectory run (seconds)
pub const DEFAULT_FULL_TIMEOUT: u64 = 300;

/// Default number of log lines an agent run may append
pub const DEFAULT_LINE_LIMIT: usize = 100;

/// Default log polling interval (milliseconds)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

// ============================================================================
// Environment Variable Names
// ============================================================================

pub const ENV_LOG_FILE: &str = "PLAYGROUND_EVAL_LOG_FILE";
pub const ENV_OUTPUT_DIR: &str = "PLAYGROUND_EVAL_OUTPUT_DIR";
pub const ENV_AGENT_CMD: &str = "PLAYGROUND_EVAL_AGENT_CMD";
pub const ENV_PORT: &str = "PLAYGROUND_EVAL_PORT";
pub const ENV_CHECKPOINT_TIMEOUT: &str = "PLAYGROUND_EVAL_CHECKPOINT_TIMEOUT";
pub const ENV_FULL_TIMEOUT: &str = "PLAYGROUND_EVAL_FULL_TIMEOUT";
pub const ENV_LINE_LIMIT: &str = "PLAYGROUND_EVAL_LINE_LIMIT";
pub const ENV_POLL_INTERVAL_MS: &str = "PLAYGROUND_EVAL_POLL_INTERVAL_MS";
pub const ENV_INCLUDE_MISSING: &str = "PLAYGROUND_EVAL_INCLUDE_MISSING";

// ============================================================================
// Configuration Getters (with caching)
// ============================================================================

static CONFIG: OnceLock<Config> = OnceLock::new();

/// Get the global configuration (initialized from environment on first access)
pub fn get() -> &'static Config {
    CONFIG.get_or_init(Config::from_env)
}

/// Centralized configuration for the evaluation harness
#[derive(Debug, Clone)]
pub struct Config {
    /// File locations
    pub paths: PathSettings,
    /// How the agent is launched
    pub agent: AgentSettings,
    /// Run limits and scoring switches
    pub limits: LimitSettings,
}

/// File locations
#[derive(Debug, Clone)]
pub struct PathSettings {
    /// Shared append-only trajectory log
    pub log_file: PathBuf,
    /// Directory receiving CSV tables and summaries
    pub output_dir: PathBuf,
}

/// Agent launch settings
#[derive(Debug, Clone)]
pub struct AgentSettings {
    /// Program followed by its fixed arguments
    pub command: Vec<String>,
    /// Port the playground frontend is served on
    pub port: u16,
}

/// Limits applied to each agent run, plus scoring switches
#[derive(Debug, Clone)]
pub struct LimitSettings {
    /// Time limit for checkpoint-only runs
    pub checkpoint_timeout: Duration,
    /// Time limit for full trajectory runs
    pub full_timeout: Duration,
    /// Maximum number of lines a run may append to the log
    pub line_limit: usize,
    /// How often the log is polled while the agent runs
    pub poll_interval: Duration,
    /// Whether missing checkpoints report their golden actions as missing
    pub include_missing_checkpoints: bool,
}

impl Config {
    /// Create configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        Self {
            paths: PathSettings::from_env(),
            agent: AgentSettings::from_env(),
            limits: LimitSettings::from_env(),
        }
    }

    /// Create configuration with all defaults (ignoring environment)
    pub fn defaults() -> Self {
        Self {
            paths: PathSettings::defaults(),
            agent: AgentSettings::defaults(),
            limits: LimitSettings::defaults(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

impl PathSettings {
    pub fn from_env() -> Self {
        Self {
            log_file: env::var(ENV_LOG_FILE)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_LOG_FILE)),
            output_dir: env::var(ENV_OUTPUT_DIR)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_OUTPUT_DIR)),
        }
    }

    pub fn defaults() -> Self {
        Self {
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
        }
    }
}

impl AgentSettings {
    pub fn from_env() -> Self {
        let command = env::var(ENV_AGENT_CMD)
            .ok()
            .map(|s| split_command(&s))
            .filter(|parts| !parts.is_empty())
            .unwrap_or_else(|| split_command(DEFAULT_AGENT_CMD));

        Self {
            command,
            port: env::var(ENV_PORT)
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_PORT),
        }
    }

    pub fn defaults() -> Self {
        Self {
            command: split_command(DEFAULT_AGENT_CMD),
            port: DEFAULT_PORT,
        }
    }
}

impl LimitSettings {
    pub fn from_env() -> Self {
        Self {
            checkpoint_timeout: Duration::from_secs(
                env_parse(ENV_CHECKPOINT_TIMEOUT).unwrap_or(DEFAULT_CHECKPOINT_TIMEOUT),
            ),
            full_timeout: Duration::from_secs(
                env_parse(ENV_FULL_TIMEOUT).unwrap_or(DEFAULT_FULL_TIMEOUT),
            ),
            line_limit: env_parse(ENV_LINE_LIMIT).unwrap_or(DEFAULT_LINE_LIMIT),
            poll_interval: Duration::from_millis(
                env_parse(ENV_POLL_INTERVAL_MS).unwrap_or(DEFAULT_POLL_INTERVAL_MS),
            ),
            include_missing_checkpoints: env::var(ENV_INCLUDE_MISSING)
                .ok()
                .and_then(|s| parse_bool(&s))
                .unwrap_or(false),
        }
    }

    pub fn defaults() -> Self {
        Self {
            checkpoint_timeout: Duration::from_secs(DEFAULT_CHECKPOINT_TIMEOUT),
            full_timeout: Duration::from_secs(DEFAULT_FULL_TIMEOUT),
            line_limit: DEFAULT_LINE_LIMIT,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            include_missing_checkpoints: false,
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

/// Split a command line on whitespace. Quoting is not supported.
pub fn split_command(command: &str) -> Vec<String> {
    command.split_whitespace().map(str::to_string).collect()
}

/// Accepts 1/0, true/false, yes/no, on/off
fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Get the trajectory log path (convenience function)
pub fn log_file() -> PathBuf {
    get().paths.log_file.clone()
}

/// Get the report directory (convenience function)
pub fn output_dir() -> PathBuf {
    get().paths.output_dir.clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_command() {
        assert_eq!(
            split_command("python -m evaluation.agent"),
            vec!["python", "-m", "evaluation.agent"]
        );
        assert!(split_command("   ").is_empty());
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("true"), Some(true));
        assert_eq!(parse_bool(" ON "), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::defaults();
        assert_eq!(config.paths.log_file, PathBuf::from(DEFAULT_LOG_FILE));
        assert_eq!(config.agent.command, vec!["python", "-m", "evaluation.agent"]);
        assert_eq!(config.agent.port, 3000);
        assert_eq!(config.limits.checkpoint_timeout, Duration::from_secs(90));
        assert_eq!(config.limits.full_timeout, Duration::from_secs(300));
        assert_eq!(config.limits.line_limit, 100);
        assert!(!config.limits.include_missing_checkpoints);
    }
}
