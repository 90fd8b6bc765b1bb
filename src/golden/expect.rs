//! Predicate combinators over flat action lists, used by component tests.

use std::fmt;
use std::sync::Arc;

use crate::log::Action;

type Predicate = Arc<dyn Fn(&Action) -> bool + Send + Sync>;

/// Field constraints for [`Matcher::exact`]; unset fields match anything
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionPattern {
    pub component: Option<String>,
    pub label: Option<String>,
    pub new_value: Option<String>,
    pub old_value: Option<String>,
}

impl ActionPattern {
    pub fn component(component: impl Into<String>) -> Self {
        Self {
            component: Some(component.into()),
            ..Self::default()
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn new_value(mut self, value: impl Into<String>) -> Self {
        self.new_value = Some(value.into());
        self
    }

    pub fn old_value(mut self, value: impl Into<String>) -> Self {
        self.old_value = Some(value.into());
        self
    }

    fn accepts(&self, action: &Action) -> bool {
        field_equals(self.component.as_deref(), Some(&action.component))
            && field_equals(self.label.as_deref(), Some(&action.label))
            && field_equals(self.new_value.as_deref(), action.new_value.as_deref())
            && field_equals(self.old_value.as_deref(), action.old_value.as_deref())
    }
}

fn field_equals(expected: Option<&str>, actual: Option<&str>) -> bool {
    match expected {
        None => true,
        Some(expected) => actual == Some(expected),
    }
}

/// A named predicate over a single action
#[derive(Clone)]
pub struct Matcher {
    description: String,
    predicate: Predicate,
}

impl Matcher {
    fn from_fn(description: impl Into<String>, predicate: impl Fn(&Action) -> bool + Send + Sync + 'static) -> Self {
        Self {
            description: description.into(),
            predicate: Arc::new(predicate),
        }
    }

    /// Every field set in `pattern` must be equal
    pub fn exact(pattern: ActionPattern) -> Self {
        let description = format!("exact({:?})", pattern);
        Self::from_fn(description, move |action| pattern.accepts(action))
    }

    pub fn label_contains(needle: impl Into<String>) -> Self {
        let needle = needle.into();
        Self::from_fn(format!("label contains {:?}", needle), move |action| {
            action.label.contains(needle.as_str())
        })
    }

    pub fn new_value_contains(needle: impl Into<String>) -> Self {
        let needle = needle.into();
        Self::from_fn(format!("new value contains {:?}", needle), move |action| {
            action
                .new_value
                .as_deref()
                .is_some_and(|value| value.contains(needle.as_str()))
        })
    }

    /// Both values parse as integers and `compare(new, old)` holds
    pub fn compare_values(description: &str, compare: fn(i64, i64) -> bool) -> Self {
        Self::from_fn(format!("compare_values({})", description), move |action| {
            let parse = |value: Option<&String>| value.and_then(|v| v.trim().parse::<i64>().ok());
            match (parse(action.new_value.as_ref()), parse(action.old_value.as_ref())) {
                (Some(new), Some(old)) => compare(new, old),
                _ => false,
            }
        })
    }

    /// The new value is JSON and satisfies `check`
    pub fn new_value_json(description: &str, check: fn(&serde_json::Value) -> bool) -> Self {
        Self::from_fn(format!("new_value_json({})", description), move |action| {
            action
                .new_value
                .as_deref()
                .and_then(|raw| serde_json::from_str::<serde_json::Value>(raw).ok())
                .is_some_and(|value| check(&value))
        })
    }

    pub fn all(matchers: Vec<Matcher>) -> Self {
        let description = format!(
            "all({})",
            matchers.iter().map(|m| m.description.as_str()).collect::<Vec<_>>().join(", ")
        );
        Self::from_fn(description, move |action| matchers.iter().all(|m| m.matches(action)))
    }

    pub fn matches(&self, action: &Action) -> bool {
        (self.predicate)(action)
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Matcher").field(&self.description).finish()
    }
}

/// What a component run's action list must contain
#[derive(Debug, Clone)]
pub enum Expectation {
    /// Matchers satisfied, in order, by a subsequence of the actions
    Ordered(Vec<Matcher>),

    /// Each matcher satisfied by some action, in any order
    Unordered(Vec<Matcher>),

    /// At least one action satisfies the matcher
    AtLeastOne(Matcher),

    /// Nothing was logged
    NoActions,
}

impl Expectation {
    pub fn check(&self, actions: &[&Action]) -> bool {
        match self {
            Expectation::Ordered(matchers) => {
                let mut remaining = matchers.iter().peekable();
                for action in actions {
                    if remaining.peek().is_none() {
                        break;
                    }
                    remaining.next_if(|m| m.matches(action));
                }
                remaining.peek().is_none()
            }
            Expectation::Unordered(matchers) => matchers.iter().all(|m| actions.iter().any(|a| m.matches(a))),
            Expectation::AtLeastOne(matcher) => actions.iter().any(|a| matcher.matches(a)),
            Expectation::NoActions => actions.is_empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actions(lines: &[&str]) -> Vec<Action> {
        lines.iter().map(|l| Action::parse(l).unwrap()).collect()
    }

    #[test]
    fn test_exact_unset_fields_are_wildcards() {
        let matcher = Matcher::exact(ActionPattern::component("click/slider").new_value("100"));
        assert!(matcher.matches(&Action::parse("click/slider // Volume // 100 // 30").unwrap()));
        assert!(!matcher.matches(&Action::parse("click/slider // Volume // 90 // 30").unwrap()));
        assert!(!matcher.matches(&Action::parse("click/slider // Volume").unwrap()));
    }

    #[test]
    fn test_ordered_is_a_subsequence() {
        let log = actions(&[
            "type/text // First name // John Doe //",
            "type/text // Last name // Doe //",
            "type/text // First name // John // John Doe",
            "click/button // Submit",
        ]);
        let refs: Vec<&Action> = log.iter().collect();

        let first_then_submit = Expectation::Ordered(vec![
            Matcher::exact(ActionPattern::component("type/text").label("First name").new_value("John")),
            Matcher::exact(ActionPattern::component("click/button").label("Submit")),
        ]);
        assert!(first_then_submit.check(&refs));

        let first_then_last = Expectation::Ordered(vec![
            Matcher::exact(ActionPattern::component("type/text").label("First name").new_value("John")),
            Matcher::exact(ActionPattern::component("type/text").label("Last name")),
        ]);
        assert!(!first_then_last.check(&refs));
    }

    #[test]
    fn test_ordered_empty_always_holds() {
        assert!(Expectation::Ordered(Vec::new()).check(&[]));
    }

    #[test]
    fn test_unordered_and_at_least_one() {
        let log = actions(&[
            "select/checkbox // I accept the privacy policy // true // false",
            "select/checkbox // I accept the terms and conditions // true // false",
        ]);
        let refs: Vec<&Action> = log.iter().collect();
        let checked = || Matcher::exact(ActionPattern::component("select/checkbox").new_value("true"));
        let expectation = Expectation::Unordered(vec![
            Matcher::all(vec![checked(), Matcher::label_contains("terms and conditions")]),
            Matcher::all(vec![checked(), Matcher::label_contains("privacy policy")]),
        ]);
        assert!(expectation.check(&refs));
        assert!(!expectation.check(&refs[..1]));

        let any_checked = Expectation::AtLeastOne(checked());
        assert!(any_checked.check(&refs));
        assert!(!any_checked.check(&[]));
    }

    #[test]
    fn test_compare_values() {
        let louder = Matcher::compare_values("new > old", |new, old| new > old);
        assert!(louder.matches(&Action::parse("click/slider // Volume // 60 // 30").unwrap()));
        assert!(!louder.matches(&Action::parse("click/slider // Volume // 20 // 30").unwrap()));
        assert!(!louder.matches(&Action::parse("click/slider // Volume // loud // 30").unwrap()));
        assert!(!louder.matches(&Action::parse("click/slider // Volume // 60").unwrap()));
    }

    #[test]
    fn test_new_value_json() {
        let has_usa = Matcher::new_value_json("any USA value", |value| {
            value
                .as_array()
                .is_some_and(|items| items.iter().any(|item| item["value"] == "USA"))
        });
        assert!(has_usa.matches(&Action::parse(r#"click/gridfilter // Orders // [{"value":"USA"}] // []"#).unwrap()));
        assert!(!has_usa.matches(&Action::parse("click/gridfilter // Orders // not json // []").unwrap()));
    }

    #[test]
    fn test_no_actions() {
        assert!(Expectation::NoActions.check(&[]));
        let log = actions(&["click/switch // Do not disturb // false // true"]);
        let refs: Vec<&Action> = log.iter().collect();
        assert!(!Expectation::NoActions.check(&refs));
    }
}
