//! CSV tables and plain-text summaries.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::evaluate::{EvaluatedComponentTest, EvaluatedTest};
use crate::score::category::{CategoryTable, UNCATEGORIZED, category_for_task};
use crate::score::stats::{CheckpointMatchStats, PassStats};

pub const E2E_OUTPUT_FILE: &str = "e2e_output.csv";
pub const E2E_TASK_OUTPUT_FILE: &str = "e2e_task_output.csv";
pub const E2E_SUMMARY_FILE: &str = "e2e_summary.txt";
pub const IND_OUTPUT_FILE: &str = "ind_output.csv";
pub const IND_SUMMARY_FILE: &str = "ind_summary.txt";

const E2E_OUTPUT_HEADER: [&str; 8] = [
    "Test",
    "E2E Pass Count",
    "E2E Total Count",
    "Checkpoint",
    "Full Match",
    "Partial Match",
    "Missing",
    "Total",
];
const TASK_OUTPUT_HEADER: [&str; 5] = ["Category", "Task", "Test", "Correct", "Total"];
const IND_OUTPUT_HEADER: [&str; 8] = [
    "Category",
    "Task",
    "Test",
    "Name",
    "Correct",
    "Total",
    "Process Correct",
    "Process Total",
];

/// Quote a field when it holds a delimiter, quote or line break
fn csv_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn push_csv_row<S: AsRef<str>>(out: &mut String, fields: &[S]) {
    let line: Vec<String> = fields.iter().map(|f| csv_field(f.as_ref())).collect();
    out.push_str(&line.join(","));
    out.push('\n');
}

fn write_report(dir: &Path, name: &str, contents: &str) -> std::io::Result<PathBuf> {
    let path = dir.join(name);
    fs::write(&path, contents)?;
    info!(path = %path.display(), "wrote report");
    Ok(path)
}

/// Per-header roll-up of trajectory runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestSummary {
    pub test: String,

    /// Full header text the runs were grouped under
    pub header: String,

    /// `None` when no run was scored end to end
    pub end_to_end: Option<PassStats>,

    /// Checkpoint names in first-seen order
    pub checkpoints: Vec<(String, CheckpointMatchStats)>,

    /// Unconsumed checkpoint URLs, tagged with their run index
    pub extra_urls: Vec<(usize, String)>,
}

impl TestSummary {
    fn from_evaluated(evaluated: &EvaluatedTest) -> Self {
        let mut summary = Self {
            test: evaluated.test_name().to_string(),
            header: evaluated.header.render(),
            end_to_end: None,
            checkpoints: Vec::new(),
            extra_urls: Vec::new(),
        };

        for (index, run) in evaluated.runs.iter().enumerate() {
            if let Some(passed) = run.end_to_end {
                summary.end_to_end.get_or_insert_with(PassStats::default).record(passed);
            }
            for checkpoint in &run.checkpoints {
                let position = summary.checkpoints.iter().position(|(name, _)| *name == checkpoint.name);
                let stats = match position {
                    Some(i) => &mut summary.checkpoints[i].1,
                    None => {
                        summary
                            .checkpoints
                            .push((checkpoint.name.clone(), CheckpointMatchStats::default()));
                        let last = summary.checkpoints.len() - 1;
                        &mut summary.checkpoints[last].1
                    }
                };
                stats.record(checkpoint.status);
            }
            summary
                .extra_urls
                .extend(run.extra_checkpoints.iter().map(|c| (index, c.url.clone())));
        }
        summary
    }
}

/// Everything written for a trajectory evaluation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TrajectoryReport {
    pub tests: Vec<TestSummary>,
    pub tasks: CategoryTable,
}

impl TrajectoryReport {
    pub fn from_evaluations(evaluated: &[EvaluatedTest]) -> Self {
        Self {
            tests: evaluated.iter().map(TestSummary::from_evaluated).collect(),
            tasks: CategoryTable::from_trajectories(evaluated),
        }
    }

    /// A three-cell row per test header, then one row per checkpoint
    pub fn output_csv(&self) -> String {
        let mut out = String::new();
        push_csv_row(&mut out, &E2E_OUTPUT_HEADER);
        for test in &self.tests {
            let e2e = test.end_to_end.unwrap_or_default();
            push_csv_row(
                &mut out,
                &[test.test.clone(), e2e.pass_count.to_string(), e2e.total().to_string()],
            );
            for (name, stats) in &test.checkpoints {
                push_csv_row(
                    &mut out,
                    &[
                        test.test.clone(),
                        String::new(),
                        String::new(),
                        name.clone(),
                        stats.full_match.to_string(),
                        stats.partial_match.to_string(),
                        stats.missing.to_string(),
                        stats.total().to_string(),
                    ],
                );
            }
        }
        out
    }

    pub fn task_csv(&self) -> String {
        let mut out = String::new();
        push_csv_row(&mut out, &TASK_OUTPUT_HEADER);
        for row in self.tasks.rows() {
            push_csv_row(
                &mut out,
                &[
                    row.category,
                    row.task,
                    row.test,
                    row.stats.correct.to_string(),
                    row.stats.total().to_string(),
                ],
            );
        }
        out
    }

    pub fn summary_text(&self) -> String {
        let mut out = String::new();
        for test in &self.tests {
            out.push_str(&test.header);
            if let Some(e2e) = &test.end_to_end {
                out.push_str(&format!(" pass {}", e2e));
            }
            out.push('\n');
            for (name, stats) in &test.checkpoints {
                out.push_str(&format!("    {} {}\n", name, stats));
            }
            for (index, url) in &test.extra_urls {
                out.push_str(&format!("    EXTRA ({}): {}\n", index, url));
            }
        }
        out.push_str("\n\n");
        out.push_str(&self.tasks.render_summary());
        out
    }

    /// Write the CSV tables and summary into `dir`
    pub fn write_to(&self, dir: &Path) -> std::io::Result<Vec<PathBuf>> {
        fs::create_dir_all(dir)?;
        Ok(vec![
            write_report(dir, E2E_OUTPUT_FILE, &self.output_csv())?,
            write_report(dir, E2E_TASK_OUTPUT_FILE, &self.task_csv())?,
            write_report(dir, E2E_SUMMARY_FILE, &self.summary_text())?,
        ])
    }
}

/// One component variant's tallies
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentRow {
    pub category: String,
    pub task: String,
    pub test: String,
    pub variant: String,
    pub result: PassStats,

    /// Present for variants scored on a form submission
    pub process: Option<PassStats>,
}

/// Everything written for a component evaluation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ComponentReport {
    pub rows: Vec<ComponentRow>,
    pub tasks: CategoryTable,
}

impl ComponentReport {
    pub fn from_evaluations(evaluated: &[EvaluatedComponentTest]) -> Self {
        let rows = evaluated
            .iter()
            .map(|test| {
                let task = test.header.task.as_str();
                let mut result = PassStats::default();
                let mut process = test.checks_submission.then(PassStats::default);
                for run in &test.runs {
                    result.record(run.passed);
                    if let (Some(stats), Some(passed)) = (process.as_mut(), run.process) {
                        stats.record(passed);
                    }
                }
                ComponentRow {
                    category: category_for_task(task).unwrap_or(UNCATEGORIZED).to_string(),
                    task: task.to_string(),
                    test: test.header.test.clone(),
                    variant: test.variant.clone(),
                    result,
                    process,
                }
            })
            .collect();

        Self {
            rows,
            tasks: CategoryTable::from_components(evaluated),
        }
    }

    /// Process cells are only written for variants with a submission
    pub fn output_csv(&self) -> String {
        let mut out = String::new();
        push_csv_row(&mut out, &IND_OUTPUT_HEADER);
        for row in &self.rows {
            let mut cells = vec![
                row.category.clone(),
                row.task.clone(),
                row.test.clone(),
                row.variant.clone(),
                row.result.pass_count.to_string(),
                row.result.total().to_string(),
            ];
            if let Some(process) = &row.process {
                cells.push(process.pass_count.to_string());
                cells.push(process.total().to_string());
            }
            push_csv_row(&mut out, &cells);
        }
        out
    }

    pub fn summary_text(&self) -> String {
        let mut out = self.tasks.render_summary();
        if !self.rows.is_empty() {
            out.push('\n');
        }
        for row in &self.rows {
            out.push_str(&format!("{}/{} {} pass {}", row.task, row.test, row.variant, row.result));
            if let Some(process) = &row.process {
                out.push_str(&format!(", process {}", process));
            }
            out.push('\n');
        }
        out
    }

    pub fn write_to(&self, dir: &Path) -> std::io::Result<Vec<PathBuf>> {
        fs::create_dir_all(dir)?;
        Ok(vec![
            write_report(dir, IND_OUTPUT_FILE, &self.output_csv())?,
            write_report(dir, IND_SUMMARY_FILE, &self.summary_text())?,
        ])
    }
}
