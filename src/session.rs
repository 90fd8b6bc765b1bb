//! Output directory management.
//!
//! Each evaluation writes its reports into one output directory together with
//! a `.run.json` manifest recording what was run, when, and where.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::runner::RunReport;

/// Manifest file written into every output directory
pub const MANIFEST_FILE: &str = ".run.json";

/// Which evaluation a session belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Multi-checkpoint playground trajectories
    Trajectory,
    /// Individual component tests
    Component,
}

/// Contents of `.run.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub mode: RunMode,

    /// Selectors as given on the command line; empty means everything
    pub selectors: Vec<String>,

    pub checkpoint_only: bool,
    pub repetitions: usize,

    /// Whether the agent was skipped and only the existing log scored
    pub eval_only: bool,

    /// RFC 3339 creation time
    pub created: String,

    /// Host the evaluation ran on, when it could be determined
    pub hostname: Option<String>,

    /// Agent runs performed in this session
    pub runs: Vec<RunReport>,
}

/// An output directory for one evaluation
#[derive(Debug, Clone)]
pub struct Session {
    /// Directory receiving reports
    pub dir: PathBuf,
    pub manifest: RunManifest,
}

impl Session {
    pub fn new(dir: impl Into<PathBuf>, mode: RunMode) -> Self {
        Self {
            dir: dir.into(),
            manifest: RunManifest {
                mode,
                selectors: Vec::new(),
                checkpoint_only: false,
                repetitions: 1,
                eval_only: false,
                created: chrono::Utc::now().to_rfc3339(),
                hostname: hostname::get().ok().map(|h| h.to_string_lossy().to_string()),
                runs: Vec::new(),
            },
        }
    }

    pub fn with_selectors(mut self, selectors: &[String]) -> Self {
        self.manifest.selectors = selectors.to_vec();
        self
    }

    pub fn with_checkpoint_only(mut self, checkpoint_only: bool) -> Self {
        self.manifest.checkpoint_only = checkpoint_only;
        self
    }

    pub fn with_repetitions(mut self, repetitions: usize) -> Self {
        self.manifest.repetitions = repetitions;
        self
    }

    pub fn with_eval_only(mut self, eval_only: bool) -> Self {
        self.manifest.eval_only = eval_only;
        self
    }

    /// Create the directory and write the initial manifest
    pub fn init(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        self.write_manifest()
    }

    pub fn record_run(&mut self, report: RunReport) {
        self.manifest.runs.push(report);
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.dir.join(MANIFEST_FILE)
    }

    pub fn write_manifest(&self) -> std::io::Result<()> {
        let path = self.manifest_path();
        fs::write(&path, serde_json::to_string_pretty(&self.manifest)?)?;
        info!(path = %path.display(), runs = self.manifest.runs.len(), "wrote run manifest");
        Ok(())
    }
}

/// Read a manifest back from an output directory
pub fn read_manifest(dir: &Path) -> std::io::Result<RunManifest> {
    let text = fs::read_to_string(dir.join(MANIFEST_FILE))?;
    Ok(serde_json::from_str(&text)?)
}
