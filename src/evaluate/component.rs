//! Scoring of individual-component runs.

use serde::Serialize;
use tracing::debug;

use crate::golden::ComponentTest;
use crate::log::TestRecord;

/// Result of one component run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ComponentOutcome {
    pub passed: bool,

    /// Whether the expected steps were taken; only scored for tests that
    /// check a form submission
    pub process: Option<bool>,
}

/// Score one run of a component test.
pub fn evaluate_component(test: &ComponentTest, record: &TestRecord) -> ComponentOutcome {
    let actions = record.flat_actions();
    let expectation_met = test.expectation.check(&actions);

    match &test.submission {
        None => ComponentOutcome {
            passed: expectation_met,
            process: None,
        },
        Some(expected) => ComponentOutcome {
            passed: submission_matches(expected, record),
            process: Some(expectation_met),
        },
    }
}

fn submission_matches(expected: &serde_json::Value, record: &TestRecord) -> bool {
    let Some(submit) = &record.submit else {
        return false;
    };
    match serde_json::from_str::<serde_json::Value>(&submit.label) {
        Ok(submitted) => &submitted == expected,
        Err(err) => {
            debug!(%err, header = %record.header.render(), "SUBMIT payload is not JSON");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::golden::component::{DEFAULT_VARIANT, builtin};
    use crate::log::extract_records;

    fn outcome(task: &str, test: &str, variant: &str, log: &str) -> ComponentOutcome {
        let records = extract_records(log).unwrap();
        let test = builtin().variant(task, test, variant).unwrap();
        evaluate_component(test, &records[0])
    }

    #[test]
    fn test_button_pass_and_fail() {
        let pass = outcome(
            "click",
            "button",
            DEFAULT_VARIANT,
            "TEST BEGIN: click/button default\nclick/button // Submit\nTEST FINISH",
        );
        assert_eq!(pass, ComponentOutcome { passed: true, process: None });

        let fail = outcome("click", "button", DEFAULT_VARIANT, "TEST BEGIN: click/button default\nTEST FINISH");
        assert!(!fail.passed);
    }

    #[test]
    fn test_switch_off_from_off_wants_nothing() {
        let log = "TEST BEGIN: click/switch off-from-off\nTEST FINISH";
        assert!(outcome("click", "switch", "off-from-off", log).passed);
        let log = "TEST BEGIN: click/switch off-from-off\nclick/switch // Do not disturb // true // false\nTEST FINISH";
        assert!(!outcome("click", "switch", "off-from-off", log).passed);
    }

    #[test]
    fn test_slider_louder() {
        let log = "TEST BEGIN: click/slider louder\nclick/slider // Volume // 70 // 20\nTEST FINISH";
        assert!(outcome("click", "slider", "louder", log).passed);
        assert!(!outcome("click", "slider", "quieter", log).passed);
    }

    #[test]
    fn test_submission_decides_pass() {
        let log = r#"
            TEST BEGIN: fill/basicform default
            type/text // First name // John Doe //
            type/text // Last name // Doe //
            type/text // Email // johndoe@gmail.com //
            type/text // First name // John // John DOe
            click/button // Submit
            SUBMIT // {"email":"johndoe@gmail.com","firstName":"John","lastName":"Doe"}
            TEST FINISH
        "#;
        assert_eq!(
            outcome("fill", "basicform", DEFAULT_VARIANT, log),
            ComponentOutcome { passed: true, process: Some(false) }
        );
    }

    #[test]
    fn test_missing_or_garbled_submission_fails() {
        let log = "TEST BEGIN: fill/basicform default\nclick/button // Submit\nTEST FINISH";
        assert_eq!(
            outcome("fill", "basicform", DEFAULT_VARIANT, log),
            ComponentOutcome { passed: false, process: Some(false) }
        );
        let log = "TEST BEGIN: fill/basicform default\nSUBMIT // not json\nTEST FINISH";
        assert!(!outcome("fill", "basicform", DEFAULT_VARIANT, log).passed);
    }
}
