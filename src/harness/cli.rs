//! The harness driver: select tests, run the agent against each, then score
//! the shared log and write reports.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{info, warn};

use crate::evaluate::{EvaluatedComponentTest, EvaluatedTest, evaluate_component_groups, evaluate_trajectory_groups};
use crate::golden::{ComponentGroup, ComponentLibrary, PLAYGROUND_START_PATH, PLAYGROUND_TASK, TrajectoryLibrary};
use crate::harness::agent::{AgentRun, run_agent};
use crate::harness::types::{
    ComponentSelection, HarnessConfig, HarnessError, HarnessResult, StopRule, TrajectorySelection,
};
use crate::log::{NAVIGATE, TEST_BEGIN, TEST_FINISH, TestHeader, group_records, read_records};
use crate::runner::RunReport;
use crate::score::{ComponentReport, TrajectoryReport};
use crate::session::{RunMode, Session};
use crate::url_match::{encode_for_agent, strip_placeholders};

/// Everything a trajectory invocation produced
#[derive(Debug, Clone, Serialize)]
pub struct TrajectoryResults {
    pub evaluated: Vec<EvaluatedTest>,
    pub report: TrajectoryReport,
    pub runs: Vec<RunReport>,

    /// Report files written, manifest excluded
    pub written: Vec<PathBuf>,
}

/// Everything a component invocation produced
#[derive(Debug, Clone, Serialize)]
pub struct ComponentResults {
    pub evaluated: Vec<EvaluatedComponentTest>,
    pub report: ComponentReport,
    pub runs: Vec<RunReport>,
    pub written: Vec<PathBuf>,
}

/// Resolve trajectory selectors (`<test>` or `<test>/<checkpoint>`).
///
/// With no selectors every test is selected, or every checkpoint of every
/// test when `checkpoint_only` is set.
pub fn select_trajectories(
    library: &TrajectoryLibrary,
    selectors: &[String],
    checkpoint_only: bool,
) -> HarnessResult<Vec<TrajectorySelection>> {
    if selectors.is_empty() {
        let mut selections = Vec::new();
        for test in library.tests() {
            if checkpoint_only {
                selections.extend(test.checkpoints.iter().map(|checkpoint| TrajectorySelection {
                    test: test.name.clone(),
                    starting_checkpoint: Some(checkpoint.name.clone()),
                    path: strip_placeholders(&checkpoint.url),
                }));
            } else {
                selections.push(from_start(&test.name));
            }
        }
        return Ok(selections);
    }

    let mut selections = Vec::new();
    for selector in selectors {
        match resolve_trajectory(library, selector) {
            Ok(selection) => selections.push(selection),
            Err(err) => warn!(selector = %selector, %err, "skipping selector"),
        }
    }
    if selections.is_empty() {
        return Err(HarnessError::NoTestsSelected);
    }
    Ok(selections)
}

fn from_start(test: &str) -> TrajectorySelection {
    TrajectorySelection {
        test: test.to_string(),
        starting_checkpoint: None,
        path: PLAYGROUND_START_PATH.to_string(),
    }
}

fn resolve_trajectory(library: &TrajectoryLibrary, selector: &str) -> HarnessResult<TrajectorySelection> {
    match selector.split_once('/') {
        None => Ok(from_start(&library.get(selector)?.name)),
        Some((test, checkpoint)) => {
            let test = library.get(test)?;
            let checkpoint = &test.checkpoints[test.checkpoint_index(checkpoint)?];
            Ok(TrajectorySelection {
                test: test.name.clone(),
                starting_checkpoint: Some(checkpoint.name.clone()),
                path: strip_placeholders(&checkpoint.url),
            })
        }
    }
}

/// Resolve component selectors (`<task>` or `<task>/<test>`) to variants.
pub fn select_components(library: &ComponentLibrary, selectors: &[String]) -> HarnessResult<Vec<ComponentSelection>> {
    let expand = |groups: Vec<&ComponentGroup>| -> Vec<ComponentSelection> {
        groups
            .into_iter()
            .flat_map(|group| {
                group.variants.iter().map(|variant| ComponentSelection {
                    task: group.task.clone(),
                    test: group.test.clone(),
                    variant: variant.name.clone(),
                })
            })
            .collect()
    };

    if selectors.is_empty() {
        return Ok(expand(library.groups().iter().collect()));
    }

    let mut selections = Vec::new();
    for selector in selectors {
        let resolved = match selector.split_once('/') {
            None => library.for_task(selector),
            Some((task, test)) => library.group(task, test).map(|group| vec![group]),
        };
        match resolved {
            Ok(groups) => selections.extend(expand(groups)),
            Err(err) => warn!(selector = %selector, %err, "skipping selector"),
        }
    }
    if selections.is_empty() {
        return Err(HarnessError::NoTestsSelected);
    }
    Ok(selections)
}

/// Header a trajectory selection is logged under
pub fn trajectory_header(selection: &TrajectorySelection, checkpoint_only: bool) -> TestHeader {
    TestHeader {
        task: PLAYGROUND_TASK.to_string(),
        test: selection.test.clone(),
        argument: selection.starting_checkpoint.clone(),
        checkpoint_only,
    }
}

/// Header a component selection is logged under
pub fn component_header(selection: &ComponentSelection) -> TestHeader {
    TestHeader {
        task: selection.task.clone(),
        test: selection.test.clone(),
        argument: Some(selection.variant.clone()),
        checkpoint_only: false,
    }
}

/// URL the agent is started on for a playground path
pub fn playground_url(port: u16, path: &str) -> String {
    format!("http://localhost:{}{}", port, encode_for_agent(path))
}

/// One agent run as the driver will perform it
struct PlannedRun {
    header: TestHeader,

    /// Initial `NAVIGATE` line payload, trajectory runs only
    navigate: Option<String>,
    goal: String,
    url: String,
    timeout: Duration,
    stop: StopRule,
}

/// Run, score and report trajectory tests
pub fn run_trajectory_harness(
    config: &HarnessConfig,
    library: &TrajectoryLibrary,
    selectors: &[String],
) -> HarnessResult<TrajectoryResults> {
    let mut session = Session::new(&config.output_dir, RunMode::Trajectory)
        .with_selectors(selectors)
        .with_checkpoint_only(config.checkpoint_only)
        .with_repetitions(config.repetitions)
        .with_eval_only(config.eval_only);
    session.init()?;

    if !config.eval_only {
        let selections = select_trajectories(library, selectors, config.checkpoint_only)?;
        let mut planned = Vec::with_capacity(selections.len());
        for selection in &selections {
            let test = library.get(&selection.test)?;
            let stop = match (&selection.starting_checkpoint, config.checkpoint_only, &test.end_to_end) {
                (Some(_), true, _) => StopRule::FirstNavigate,
                (_, _, Some(e2e)) => StopRule::NavigateContaining(e2e.path.clone()),
                _ => StopRule::Never,
            };
            planned.push(PlannedRun {
                header: trajectory_header(selection, config.checkpoint_only),
                navigate: Some(selection.path.clone()),
                goal: test.goal.clone(),
                url: playground_url(config.port, &selection.path),
                timeout: config.timeout(),
                stop,
            });
        }
        execute(config, &planned, &mut session)?;
    }

    let groups = group_records(read_records(&config.log_file)?);
    let evaluated = evaluate_trajectory_groups(library, &groups, config.include_missing_checkpoints);
    let report = TrajectoryReport::from_evaluations(&evaluated);
    let written = report.write_to(&config.output_dir)?;
    session.write_manifest()?;

    Ok(TrajectoryResults {
        evaluated,
        report,
        runs: session.manifest.runs.clone(),
        written,
    })
}

/// Run, score and report individual component tests
pub fn run_component_harness(
    config: &HarnessConfig,
    library: &ComponentLibrary,
    selectors: &[String],
) -> HarnessResult<ComponentResults> {
    let mut session = Session::new(&config.output_dir, RunMode::Component)
        .with_selectors(selectors)
        .with_repetitions(config.repetitions)
        .with_eval_only(config.eval_only);
    session.init()?;

    if !config.eval_only {
        let selections = select_components(library, selectors)?;
        let mut planned = Vec::with_capacity(selections.len());
        for selection in &selections {
            let group = library.group(&selection.task, &selection.test)?;
            let variant = group.variant(&selection.variant)?;
            planned.push(PlannedRun {
                header: component_header(selection),
                navigate: None,
                goal: variant.goal.clone(),
                url: group.url(config.port),
                timeout: config.full_timeout,
                stop: StopRule::Never,
            });
        }
        execute(config, &planned, &mut session)?;
    }

    let groups = group_records(read_records(&config.log_file)?);
    let evaluated = evaluate_component_groups(library, &groups);
    let report = ComponentReport::from_evaluations(&evaluated);
    let written = report.write_to(&config.output_dir)?;
    session.write_manifest()?;

    Ok(ComponentResults {
        evaluated,
        report,
        runs: session.manifest.runs.clone(),
        written,
    })
}

/// Clear the log, then perform every planned run `repetitions` times in order
fn execute(config: &HarnessConfig, planned: &[PlannedRun], session: &mut Session) -> HarnessResult<()> {
    clear_log(&config.log_file)?;

    for run in planned {
        for repetition in 0..config.repetitions {
            let header = run.header.render();
            info!(header = %header, repetition, "starting run");

            let mut opening = vec![format!("{} {}", TEST_BEGIN, header)];
            if let Some(path) = &run.navigate {
                opening.push(format!("{} // {}", NAVIGATE, path));
            }
            append_log(&config.log_file, &opening)?;

            let mut command = config.agent_command.clone();
            command.push(run.goal.clone());
            command.push(run.url.clone());
            command.push(run.timeout.as_secs().to_string());

            let started = Instant::now();
            let exit = run_agent(&AgentRun {
                command,
                log_file: config.log_file.clone(),
                timeout: run.timeout,
                line_limit: config.line_limit,
                poll_interval: config.poll_interval,
                kill_grace: config.kill_grace,
                stop: run.stop.clone(),
            })?;

            append_log(&config.log_file, &[TEST_FINISH.to_string()])?;
            session.record_run(RunReport {
                header,
                repetition,
                outcome: exit.outcome,
                lines_appended: exit.lines_appended,
                elapsed: started.elapsed(),
            });
        }
    }
    Ok(())
}

fn clear_log(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::File::create(path)?;
    Ok(())
}

fn append_log(path: &Path, lines: &[String]) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    for line in lines {
        writeln!(file, "{}", line)?;
    }
    Ok(())
}
