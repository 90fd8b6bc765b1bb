//! Category → task → test tallies of golden action outcomes.

use serde::{Serialize, Serializer};
use tracing::warn;

use crate::evaluate::{EvaluatedComponentTest, EvaluatedTest};
use crate::log::{GoldenAction, split_component};
use crate::score::stats::CorrectMissing;

/// Category of tasks not in the map
pub const UNCATEGORIZED: &str = "uncategorized";

/// Category a task belongs to, `None` for unknown tasks
pub fn category_for_task(task: &str) -> Option<&'static str> {
    match task {
        "click" | "type" | "select" => Some("operational"),
        "search" | "fill" | "find" | "filter" => Some("informational"),
        _ => None,
    }
}

/// One flattened table cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryRow {
    pub category: String,
    pub task: String,
    pub test: String,
    pub stats: CorrectMissing,
}

/// String-keyed entries in first-seen key order
#[derive(Debug, Clone)]
struct Ordered<V>(Vec<(String, V)>);

impl<V> Default for Ordered<V> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<V: Default> Ordered<V> {
    fn entry(&mut self, key: &str) -> &mut V {
        let index = match self.0.iter().position(|(k, _)| k == key) {
            Some(index) => index,
            None => {
                self.0.push((key.to_string(), V::default()));
                self.0.len() - 1
            }
        };
        &mut self.0[index].1
    }
}

impl<V> Ordered<V> {
    fn get(&self, key: &str) -> Option<&V> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    fn iter(&self) -> impl Iterator<Item = (&String, &V)> {
        self.0.iter().map(|(k, v)| (k, v))
    }
}

impl<V: Serialize> Serialize for Ordered<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

type TestMap = Ordered<CorrectMissing>;
type TaskMap = Ordered<TestMap>;

/// Nested tally in first-seen order; merging two tables equals tallying
/// their inputs together. Equality ignores order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CategoryTable {
    categories: Ordered<TaskMap>,
}

impl PartialEq for CategoryTable {
    fn eq(&self, other: &Self) -> bool {
        let sorted = |table: &CategoryTable| {
            let mut rows = table.rows();
            rows.sort_by(|a, b| (&a.category, &a.task, &a.test).cmp(&(&b.category, &b.task, &b.test)));
            rows
        };
        sorted(self) == sorted(other)
    }
}

impl Eq for CategoryTable {}

impl CategoryTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the task table of a set of trajectory evaluations
    pub fn from_trajectories(evaluated: &[EvaluatedTest]) -> Self {
        let mut table = Self::new();
        for checkpoint in evaluated.iter().flat_map(|t| &t.runs).flat_map(|r| &r.checkpoints) {
            for action in &checkpoint.matched {
                table.record_golden(action, true);
            }
            for action in &checkpoint.missing {
                table.record_golden(action, false);
            }
        }
        table
    }

    /// Build the pass table of component evaluations
    pub fn from_components(evaluated: &[EvaluatedComponentTest]) -> Self {
        let mut table = Self::new();
        for test in evaluated {
            let component = format!("{}/{}", test.header.task, test.header.test);
            for run in &test.runs {
                table.record(&component, run.passed);
            }
        }
        table
    }

    /// Count a golden action toward its component and untracked component
    pub fn record_golden(&mut self, action: &GoldenAction, correct: bool) {
        for component in action.tracked_components() {
            self.record(component, correct);
        }
    }

    /// Count one outcome for a `task/test` component
    pub fn record(&mut self, component: &str, correct: bool) {
        let (task, test) = split_component(component);
        let category = category_for_task(task).unwrap_or_else(|| {
            warn!(task, "task has no category");
            UNCATEGORIZED
        });

        let cell = self.categories.entry(category).entry(task).entry(test);
        if correct {
            cell.correct += 1;
        } else {
            cell.missing += 1;
        }
    }

    pub fn merge(&mut self, other: &CategoryTable) {
        for (category, tasks) in other.categories.iter() {
            let ours = self.categories.entry(category);
            for (task, tests) in tasks.iter() {
                let ours = ours.entry(task);
                for (test, stats) in tests.iter() {
                    ours.entry(test).merge(stats);
                }
            }
        }
    }

    pub fn get(&self, category: &str, task: &str, test: &str) -> Option<CorrectMissing> {
        self.categories.get(category)?.get(task)?.get(test).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.0.is_empty()
    }

    /// Cells in the order their category, task and test were first seen
    pub fn rows(&self) -> Vec<CategoryRow> {
        let mut rows = Vec::new();
        for (category, tasks) in self.categories.iter() {
            for (task, tests) in tasks.iter() {
                for (test, stats) in tests.iter() {
                    rows.push(CategoryRow {
                        category: category.clone(),
                        task: task.clone(),
                        test: test.clone(),
                        stats: *stats,
                    });
                }
            }
        }
        rows
    }

    /// Indented pass ratios, one line per category, task and test
    pub fn render_summary(&self) -> String {
        let mut out = String::new();
        for (category, tasks) in self.categories.iter() {
            let mut category_total = CorrectMissing::default();
            let mut body = String::new();
            for (task, tests) in tasks.iter() {
                let mut task_total = CorrectMissing::default();
                let mut task_body = String::new();
                for (test, stats) in tests.iter() {
                    task_total.merge(stats);
                    task_body.push_str(&format!("        {}: {}\n", test, stats));
                }
                category_total.merge(&task_total);
                body.push_str(&format!("    {}: {}\n", task, task_total));
                body.push_str(&task_body);
            }
            out.push_str(&format!("{}: {}\n", category, category_total));
            out.push_str(&body);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_category_map() {
        assert_eq!(category_for_task("click"), Some("operational"));
        assert_eq!(category_for_task("select"), Some("operational"));
        assert_eq!(category_for_task("search"), Some("informational"));
        assert_eq!(category_for_task("filter"), Some("informational"));
        assert_eq!(category_for_task("drag"), None);
    }

    #[test]
    fn test_untracked_component_counts_twice() {
        let mut table = CategoryTable::new();
        let action = GoldenAction::parse("click/link // Laptop").unwrap().with_untracked("search/appropriate");
        table.record_golden(&action, false);
        assert_eq!(table.get("operational", "click", "link"), Some(CorrectMissing { correct: 0, missing: 1 }));
        assert_eq!(
            table.get("informational", "search", "appropriate"),
            Some(CorrectMissing { correct: 0, missing: 1 })
        );
    }

    #[test]
    fn test_unknown_task_is_uncategorized() {
        let mut table = CategoryTable::new();
        table.record("drag/handle", true);
        assert_eq!(table.get(UNCATEGORIZED, "drag", "handle"), Some(CorrectMissing { correct: 1, missing: 0 }));
    }

    #[test]
    fn test_merge_equals_combined_tally() {
        let outcomes = [
            ("click/button", true),
            ("type/text", false),
            ("click/button", false),
            ("fill/complex", true),
            ("type/text", true),
        ];
        let mut combined = CategoryTable::new();
        for (component, correct) in outcomes {
            combined.record(component, correct);
        }

        let mut left = CategoryTable::new();
        let mut right = CategoryTable::new();
        for (i, (component, correct)) in outcomes.iter().enumerate() {
            if i % 2 == 0 {
                left.record(component, *correct);
            } else {
                right.record(component, *correct);
            }
        }
        let mut merged_lr = left.clone();
        merged_lr.merge(&right);
        let mut merged_rl = right.clone();
        merged_rl.merge(&left);

        assert_eq!(merged_lr, combined);
        assert_eq!(merged_rl, combined);
    }

    #[test]
    fn test_render_summary() {
        let mut table = CategoryTable::new();
        table.record("click/button", true);
        table.record("click/link", false);
        table.record("type/text", true);
        assert_eq!(
            table.render_summary(),
            "operational: 2/3 (66.7%)\n\
             \x20   click: 1/2 (50.0%)\n\
             \x20       button: 1/1 (100.0%)\n\
             \x20       link: 0/1 (0.0%)\n\
             \x20   type: 1/1 (100.0%)\n\
             \x20       text: 1/1 (100.0%)\n"
        );
    }

    #[test]
    fn test_rows_keep_first_seen_order() {
        let mut table = CategoryTable::new();
        table.record("type/text", true);
        table.record("search/appropriate", false);
        table.record("click/link", true);
        table.record("type/date", true);
        let cells: Vec<(String, String, String)> =
            table.rows().into_iter().map(|r| (r.category, r.task, r.test)).collect();
        let expected = [
            ("operational", "type", "text"),
            ("operational", "type", "date"),
            ("operational", "click", "link"),
            ("informational", "search", "appropriate"),
        ];
        assert_eq!(
            cells,
            expected
                .iter()
                .map(|(c, t, n)| (c.to_string(), t.to_string(), n.to_string()))
                .collect::<Vec<_>>()
        );
        assert!(table.render_summary().starts_with("operational: 3/3 (100.0%)\n    type: 2/2 (100.0%)\n"));
    }
}
