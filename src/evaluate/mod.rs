//! Evaluation of parsed trajectory logs against the golden libraries.
//!
//! Everything here is a pure function of (library, records): no I/O and no
//! state carried between calls.

pub mod align;
pub mod checkpoint;
pub mod component;
pub mod e2e;

use serde::Serialize;
use tracing::warn;

pub use align::{AlignStep, Alignment, Coverage, align, cover};
pub use checkpoint::{
    ActionComparison, CheckpointComparison, CheckpointStatus, EvaluatedCheckpoint, compare_actions,
    compare_checkpoints, evaluate_matched,
};
pub use component::{ComponentOutcome, evaluate_component};

use crate::golden::{ComponentLibrary, DEFAULT_VARIANT, GoldenTest, LibraryResult, PLAYGROUND_TASK, TrajectoryLibrary};
use crate::log::{Checkpoint, LogResult, RecordGroup, TestHeader, TestRecord, extract_records, group_records};

/// One trajectory run after comparison
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunEvaluation {
    pub checkpoints: Vec<EvaluatedCheckpoint>,

    /// Observed checkpoints no golden checkpoint consumed
    pub extra_checkpoints: Vec<Checkpoint>,

    /// `None` when the run was checkpoint-only or the test has no goal
    pub end_to_end: Option<bool>,

    /// False when the record had no `TEST FINISH`
    pub finished: bool,
}

/// All runs of one trajectory header
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EvaluatedTest {
    pub header: TestHeader,
    pub runs: Vec<RunEvaluation>,
}

impl EvaluatedTest {
    pub fn test_name(&self) -> &str {
        &self.header.test
    }
}

/// Score one trajectory record.
pub fn evaluate_record(test: &GoldenTest, record: &TestRecord, include_missing: bool) -> LibraryResult<RunEvaluation> {
    let header = &record.header;
    let golden = test.golden_slice(header.argument.as_deref(), header.checkpoint_only)?;
    let comparison = compare_checkpoints(golden, &record.checkpoints, include_missing);

    let end_to_end = match (&test.end_to_end, header.checkpoint_only) {
        (Some(spec), false) => Some(e2e::verify(spec, &comparison.extra_checkpoints)),
        _ => None,
    };

    Ok(RunEvaluation {
        checkpoints: comparison.checkpoints,
        extra_checkpoints: comparison.extra_checkpoints,
        end_to_end,
        finished: record.finished,
    })
}

fn evaluate_trajectory_group(
    library: &TrajectoryLibrary,
    group: &RecordGroup,
    include_missing: bool,
) -> LibraryResult<EvaluatedTest> {
    let test = library.get(&group.header.test)?;
    let runs = group
        .runs
        .iter()
        .map(|record| evaluate_record(test, record, include_missing))
        .collect::<LibraryResult<Vec<_>>>()?;
    Ok(EvaluatedTest {
        header: group.header.clone(),
        runs,
    })
}

/// Score every trajectory group, in log order.
///
/// Groups for component tasks are ignored; groups naming an unknown test or
/// checkpoint are skipped with a warning.
pub fn evaluate_trajectory_groups(
    library: &TrajectoryLibrary,
    groups: &[RecordGroup],
    include_missing: bool,
) -> Vec<EvaluatedTest> {
    groups
        .iter()
        .filter(|group| group.header.task == PLAYGROUND_TASK)
        .filter_map(|group| match evaluate_trajectory_group(library, group, include_missing) {
            Ok(evaluated) => Some(evaluated),
            Err(err) => {
                warn!(header = %group.header.render(), %err, "skipping test group");
                None
            }
        })
        .collect()
}

/// Parse a raw log and score its trajectory tests.
pub fn evaluate_trajectory_log(library: &TrajectoryLibrary, text: &str, include_missing: bool) -> LogResult<Vec<EvaluatedTest>> {
    let groups = group_records(extract_records(text)?);
    Ok(evaluate_trajectory_groups(library, &groups, include_missing))
}

/// All runs of one component variant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EvaluatedComponentTest {
    pub header: TestHeader,

    /// Variant name, `default` when the header has none
    pub variant: String,

    /// Whether pass/fail came from a form submission
    pub checks_submission: bool,

    pub runs: Vec<ComponentOutcome>,
}

/// Score every component group, in log order.
///
/// Trajectory groups are ignored; unknown component tests are skipped with
/// a warning.
pub fn evaluate_component_groups(library: &ComponentLibrary, groups: &[RecordGroup]) -> Vec<EvaluatedComponentTest> {
    let mut evaluated = Vec::new();
    for group in groups.iter().filter(|g| g.header.task != PLAYGROUND_TASK) {
        let header = &group.header;
        let variant = header.argument.as_deref().unwrap_or(DEFAULT_VARIANT);
        let test = match library.variant(&header.task, &header.test, variant) {
            Ok(test) => test,
            Err(err) => {
                warn!(header = %header.render(), %err, "skipping test group");
                continue;
            }
        };
        evaluated.push(EvaluatedComponentTest {
            header: header.clone(),
            variant: variant.to_string(),
            checks_submission: test.submission.is_some(),
            runs: group.runs.iter().map(|record| evaluate_component(test, record)).collect(),
        });
    }
    evaluated
}

/// Parse a raw log and score its component tests.
pub fn evaluate_component_log(library: &ComponentLibrary, text: &str) -> LogResult<Vec<EvaluatedComponentTest>> {
    let groups = group_records(extract_records(text)?);
    Ok(evaluate_component_groups(library, &groups))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::golden::{component, library};
    use pretty_assertions::assert_eq;

    const FULL_ORDER: &str = r#"
        TEST BEGIN: playground/order
        NAVIGATE // /playground
        type/text // Search items // laptop //
        click/iconbutton // Search
        NAVIGATE // /playground/search?query=laptop
        click/link // 2023 MacBook Pro - M3 chip, 14-inch
        NAVIGATE // /playground/product/1
        click/button // Buy now
        NAVIGATE // /playground/checkout?cart={"id":"1","customizations":{"memory":"8GB","storage":"512GB"},"price":1599}
        type/text // First name // John //
        click/button // Order
        NAVIGATE // /playground/thanks?cart={"customizations":{"memory":"8GB","storage":"512GB"},"id":"1"}&location={"city":"Cambridge","firstName":"John","lastName":"Doe","state":"MA","streetAddress":"123 Main Street","zipCode":"02138"}
        TEST FINISH
    "#;

    #[test]
    fn test_full_order_passes_end_to_end() {
        let evaluated = evaluate_trajectory_log(library::builtin(), FULL_ORDER, false).unwrap();
        assert_eq!(evaluated.len(), 1);
        let run = &evaluated[0].runs[0];
        assert_eq!(run.end_to_end, Some(true));
        assert!(run.checkpoints.iter().all(|c| c.status == CheckpointStatus::FullMatch));
        assert_eq!(run.extra_checkpoints.len(), 1);
    }

    #[test]
    fn test_last_golden_checkpoint_is_not_an_end_to_end_candidate() {
        // Stopping on the checkout page: every checkpoint reached, none extra
        let truncated = FULL_ORDER
            .lines()
            .filter(|line| !line.contains("/playground/thanks"))
            .collect::<Vec<_>>()
            .join("\n");
        let evaluated = evaluate_trajectory_log(library::builtin(), &truncated, false).unwrap();
        let run = &evaluated[0].runs[0];
        assert_eq!(run.end_to_end, Some(false));
        assert!(run.extra_checkpoints.is_empty());
        assert_eq!(run.checkpoints[3].status, CheckpointStatus::PartialMatch);
    }

    #[test]
    fn test_checkpoint_only_has_no_end_to_end() {
        let log = "
            TEST BEGIN: playground/order 3_purchase_item -checkpointonly
            NAVIGATE // /playground/product/1
            click/button // Buy now
            NAVIGATE // /playground/checkout?cart={\"id\":\"1\",\"customizations\":{\"memory\":\"8GB\",\"storage\":\"512GB\"},\"price\":1599}
            TEST FINISH
        ";
        let evaluated = evaluate_trajectory_log(library::builtin(), log, false).unwrap();
        let run = &evaluated[0].runs[0];
        assert_eq!(run.end_to_end, None);
        assert_eq!(run.checkpoints.len(), 1);
        assert_eq!(run.checkpoints[0].name, "3_purchase_item");
        assert_eq!(run.checkpoints[0].status, CheckpointStatus::FullMatch);
    }

    #[test]
    fn test_unknown_groups_are_skipped() {
        let log = "
            TEST BEGIN: playground/refund
            TEST FINISH
            TEST BEGIN: playground/order 9_nowhere -checkpointonly
            TEST FINISH
            TEST BEGIN: click/button default
            click/button // Submit
            TEST FINISH
        ";
        assert!(evaluate_trajectory_log(library::builtin(), log, false).unwrap().is_empty());
        let components = evaluate_component_log(component::builtin(), log).unwrap();
        assert_eq!(components.len(), 1);
        assert_eq!(components[0].variant, "default");
        assert_eq!(components[0].runs, vec![ComponentOutcome { passed: true, process: None }]);
    }

    #[test]
    fn test_parse_errors_propagate() {
        let log = "TEST BEGIN: playground/order\nNAVIGATE // /playground\ngarbage\nTEST FINISH";
        assert!(evaluate_trajectory_log(library::builtin(), log, false).is_err());
    }
}
