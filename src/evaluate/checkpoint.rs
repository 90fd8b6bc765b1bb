//! Checkpoint-level comparison of a golden trajectory against an observed one.

use serde::Serialize;

use crate::evaluate::align::{AlignStep, align, cover};
use crate::golden::{CheckpointKind, GoldenCheckpoint};
use crate::log::{Action, Checkpoint, GoldenAction};
use crate::url_match;

/// Outcome of one golden checkpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointStatus {
    FullMatch,
    PartialMatch,
    Missing,
}

impl CheckpointStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckpointStatus::FullMatch => "full_match",
            CheckpointStatus::PartialMatch => "partial_match",
            CheckpointStatus::Missing => "missing",
        }
    }
}

impl std::fmt::Display for CheckpointStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A golden checkpoint after comparison
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EvaluatedCheckpoint {
    pub name: String,

    /// Golden URL, placeholders included
    pub url: String,

    pub status: CheckpointStatus,

    /// Golden actions (or relevant tasks) that were satisfied
    pub matched: Vec<GoldenAction>,

    /// Golden actions (or relevant tasks) that were not
    pub missing: Vec<GoldenAction>,

    /// Observed actions no golden action accounts for
    pub extra: Vec<Action>,
}

impl EvaluatedCheckpoint {
    fn missing_checkpoint(golden: &GoldenCheckpoint, include_missing: bool) -> Self {
        Self {
            name: golden.name.clone(),
            url: golden.url.clone(),
            status: CheckpointStatus::Missing,
            matched: Vec::new(),
            missing: if include_missing {
                golden.scored_actions().to_vec()
            } else {
                Vec::new()
            },
            extra: Vec::new(),
        }
    }
}

/// Evaluated golden checkpoints plus the observed checkpoints none consumed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CheckpointComparison {
    pub checkpoints: Vec<EvaluatedCheckpoint>,
    pub extra_checkpoints: Vec<Checkpoint>,
}

/// Action-level result inside one matched checkpoint
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionComparison {
    pub matched: Vec<GoldenAction>,
    pub missing: Vec<GoldenAction>,
    pub extra: Vec<Action>,
}

/// Compare the actions of a checkpoint whose URL already matched.
pub fn compare_actions(golden: &GoldenCheckpoint, observed: &Checkpoint) -> ActionComparison {
    let matcher = |g: &GoldenAction, o: &Action| g.matches(o);

    if golden.kind == CheckpointKind::Orderless {
        let coverage = cover(&golden.actions, &observed.actions, matcher);
        return ActionComparison {
            matched: coverage.matched.iter().map(|&i| golden.actions[i].clone()).collect(),
            missing: coverage.missing.iter().map(|&i| golden.actions[i].clone()).collect(),
            extra: coverage.extra.iter().map(|&i| observed.actions[i].clone()).collect(),
        };
    }

    let alignment = align(&golden.actions, &observed.actions, matcher);
    ActionComparison {
        matched: alignment.matched().map(|(g, _)| golden.actions[g].clone()).collect(),
        missing: alignment.missing().map(|g| golden.actions[g].clone()).collect(),
        extra: alignment.extra().map(|o| observed.actions[o].clone()).collect(),
    }
}

/// Score a golden checkpoint against the observed checkpoint its URL
/// matched. `next_url` is the URL of the observed checkpoint that follows.
pub fn evaluate_matched(golden: &GoldenCheckpoint, observed: &Checkpoint, next_url: Option<&str>) -> EvaluatedCheckpoint {
    let verified = golden
        .full_match_verifier_next_checkpoint
        .as_deref()
        .map(|verifier| next_url.is_some_and(|next| url_match::matches(verifier, next)));

    let (full_match, comparison) = match golden.relevant_tasks() {
        Some(tasks) => {
            let full_match = verified.unwrap_or(false);
            let comparison = if full_match {
                ActionComparison {
                    matched: tasks.to_vec(),
                    ..ActionComparison::default()
                }
            } else {
                ActionComparison {
                    missing: tasks.to_vec(),
                    ..ActionComparison::default()
                }
            };
            (full_match, comparison)
        }
        None => {
            let comparison = compare_actions(golden, observed);
            let full_match = verified.unwrap_or_else(|| {
                comparison.matched.len() == golden.actions.len() && comparison.matched.len() == observed.actions.len()
            });
            (full_match, comparison)
        }
    };

    EvaluatedCheckpoint {
        name: golden.name.clone(),
        url: golden.url.clone(),
        status: if full_match {
            CheckpointStatus::FullMatch
        } else {
            CheckpointStatus::PartialMatch
        },
        matched: comparison.matched,
        missing: comparison.missing,
        extra: comparison.extra,
    }
}

/// Align golden checkpoints to observed ones by URL and score each match.
///
/// With `include_missing`, a missing checkpoint reports its golden actions
/// (relevant tasks for task-only checkpoints) as missing; otherwise none.
pub fn compare_checkpoints(golden: &[GoldenCheckpoint], observed: &[Checkpoint], include_missing: bool) -> CheckpointComparison {
    let alignment = align(golden, observed, |g: &GoldenCheckpoint, o: &Checkpoint| {
        url_match::matches(&g.url, &o.url)
    });

    let mut comparison = CheckpointComparison::default();
    for step in &alignment.steps {
        match *step {
            AlignStep::Matched { golden: g, observed: o } => {
                let next_url = observed.get(o + 1).map(|c| c.url.as_str());
                comparison
                    .checkpoints
                    .push(evaluate_matched(&golden[g], &observed[o], next_url));
            }
            AlignStep::Missing { golden: g } => {
                comparison
                    .checkpoints
                    .push(EvaluatedCheckpoint::missing_checkpoint(&golden[g], include_missing));
            }
            AlignStep::Extra { observed: o } => {
                comparison.extra_checkpoints.push(observed[o].clone());
            }
        }
    }
    comparison
}
