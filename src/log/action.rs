use serde::{Deserialize, Serialize};
use std::fmt;

use crate::log::types::{LogError, LogResult};

/// Field separator used by the playground log writer
pub const FIELD_SEPARATOR: &str = "//";

/// A single observed (or expected) interface event.
///
/// Parsed from `<component> // <label> [// <newValue> [// <oldValue>]]`.
/// Trailing fields that are not written are `None`; a field written as an
/// empty string is `Some("")`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Action {
    /// Interaction type, e.g. `click/button`
    pub component: String,

    /// Human-readable target description
    pub label: String,

    /// Value after the interaction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_value: Option<String>,

    /// Value before the interaction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_value: Option<String>,
}

impl Action {
    pub fn new(component: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            label: label.into(),
            new_value: None,
            old_value: None,
        }
    }

    pub fn with_new_value(mut self, value: impl Into<String>) -> Self {
        self.new_value = Some(value.into());
        self
    }

    pub fn with_old_value(mut self, value: impl Into<String>) -> Self {
        self.old_value = Some(value.into());
        self
    }

    /// Parse one action line (already stripped of surrounding whitespace).
    ///
    /// `line_number` is only used for error reporting.
    pub fn parse_line(line: &str, line_number: usize) -> LogResult<Self> {
        let fields: Vec<&str> = line.split(FIELD_SEPARATOR).map(str::trim).collect();

        if fields.len() < 2 {
            return Err(LogError::parse(line_number, line, "missing `//` delimiter"));
        }
        if fields.len() > 4 {
            return Err(LogError::parse(
                line_number,
                line,
                format!("expected at most 4 fields, found {}", fields.len()),
            ));
        }
        if fields[0].is_empty() {
            return Err(LogError::parse(line_number, line, "empty component"));
        }

        Ok(Self {
            component: fields[0].to_string(),
            label: fields[1].to_string(),
            new_value: fields.get(2).map(|s| s.to_string()),
            old_value: fields.get(3).map(|s| s.to_string()),
        })
    }

    /// Parse a string that is known to be well-formed (golden definitions).
    pub fn parse(text: &str) -> LogResult<Self> {
        Self::parse_line(text.trim(), 0)
    }

    /// Task half of the component (`click` for `click/button`)
    pub fn task(&self) -> &str {
        split_component(&self.component).0
    }

    /// Test half of the component (`button` for `click/button`)
    pub fn test(&self) -> &str {
        split_component(&self.component).1
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} // {}", self.component, self.label)?;
        if let Some(new_value) = &self.new_value {
            write!(f, " // {}", new_value)?;
            if let Some(old_value) = &self.old_value {
                write!(f, " // {}", old_value)?;
            }
        }
        Ok(())
    }
}

/// Split `task/test`, tolerating components without a slash.
pub fn split_component(component: &str) -> (&str, &str) {
    match component.split_once('/') {
        Some((task, test)) => (task.trim(), test.trim()),
        None => (component.trim(), ""),
    }
}

/// An expected action in a golden trajectory.
///
/// `untracked_component` lets the action count toward a second statistics
/// bucket (for example `search/appropriate` on top of `click/link`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoldenAction {
    #[serde(flatten)]
    pub action: Action,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub untracked_component: Option<String>,
}

impl GoldenAction {
    pub fn new(action: Action) -> Self {
        Self {
            action,
            untracked_component: None,
        }
    }

    pub fn parse(text: &str) -> LogResult<Self> {
        Ok(Self::new(Action::parse(text)?))
    }

    pub fn with_untracked(mut self, component: impl Into<String>) -> Self {
        self.untracked_component = Some(component.into());
        self
    }

    /// Whether an observed action satisfies this golden action.
    ///
    /// Component and label must be equal. A golden new/old value that is
    /// absent or empty matches anything.
    pub fn matches(&self, observed: &Action) -> bool {
        let golden = &self.action;
        golden.component == observed.component
            && golden.label == observed.label
            && value_matches(golden.new_value.as_deref(), observed.new_value.as_deref())
            && value_matches(golden.old_value.as_deref(), observed.old_value.as_deref())
    }

    /// Components this action is attributed to when scoring
    pub fn tracked_components(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.action.component.as_str()).chain(self.untracked_component.as_deref())
    }
}

impl From<Action> for GoldenAction {
    fn from(action: Action) -> Self {
        Self::new(action)
    }
}

impl fmt::Display for GoldenAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.action.fmt(f)
    }
}

fn value_matches(golden: Option<&str>, observed: Option<&str>) -> bool {
    match golden {
        None | Some("") => true,
        Some(expected) => observed == Some(expected),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_all_fields() {
        let action = Action::parse_line("type/text // First name // John // Jo", 1).unwrap();
        assert_eq!(action.component, "type/text");
        assert_eq!(action.label, "First name");
        assert_eq!(action.new_value.as_deref(), Some("John"));
        assert_eq!(action.old_value.as_deref(), Some("Jo"));
    }

    #[test]
    fn test_parse_absent_fields_are_none() {
        let action = Action::parse_line("click/button // Buy now", 1).unwrap();
        assert_eq!(action.new_value, None);
        assert_eq!(action.old_value, None);
    }

    #[test]
    fn test_parse_trailing_empty_field() {
        let action = Action::parse_line("type/text // Email // johndoe@gmail.com //", 1).unwrap();
        assert_eq!(action.new_value.as_deref(), Some("johndoe@gmail.com"));
        assert_eq!(action.old_value.as_deref(), Some(""));
    }

    #[test]
    fn test_parse_errors_name_line() {
        let err = Action::parse_line("click/button", 7).unwrap_err();
        assert!(err.to_string().contains("line 7"));
        assert!(Action::parse_line("a // b // c // d // e", 1).is_err());
        assert!(Action::parse_line(" // label", 1).is_err());
    }

    #[test]
    fn test_matches_wildcards() {
        let golden = GoldenAction::parse("type/text // Search items").unwrap();
        let observed = Action::parse("type/text // Search items // laptop // ").unwrap();
        assert!(golden.matches(&observed));

        let golden = GoldenAction::parse("type/text // First name // John").unwrap();
        assert!(!golden.matches(&Action::parse("type/text // First name // John Doe").unwrap()));
        assert!(golden.matches(&Action::parse("type/text // First name // John // J").unwrap()));
    }

    #[test]
    fn test_matches_is_case_sensitive() {
        let golden = GoldenAction::parse("click/button // Order").unwrap();
        assert!(!golden.matches(&Action::parse("click/button // order").unwrap()));
        assert!(!golden.matches(&Action::parse("click/link // Order").unwrap()));
    }

    #[test]
    fn test_display_roundtrip_shape() {
        let action = Action::new("select/select", "State").with_new_value("MA");
        assert_eq!(action.to_string(), "select/select // State // MA");
        assert_eq!(action.task(), "select");
        assert_eq!(action.test(), "select");
    }

    #[test]
    fn test_tracked_components() {
        let golden = GoldenAction::parse("click/link // 2023 MacBook Pro")
            .unwrap()
            .with_untracked("search/appropriate");
        let components: Vec<&str> = golden.tracked_components().collect();
        assert_eq!(components, vec!["click/link", "search/appropriate"]);
    }
}
