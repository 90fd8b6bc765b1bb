//! Trajectory extraction: turns the raw shared log into per-run records.

use std::fs;
use std::path::Path;

use tracing::{debug, warn};

use crate::log::action::{Action, FIELD_SEPARATOR};
use crate::log::types::{Checkpoint, LogError, LogResult, TestHeader, TestRecord};

pub const TEST_BEGIN: &str = "TEST BEGIN:";
pub const TEST_FINISH: &str = "TEST FINISH";
pub const NAVIGATE: &str = "NAVIGATE";
pub const SUBMIT: &str = "SUBMIT";
pub const CHECKPOINT_ONLY_FLAG: &str = "-checkpointonly";

/// All runs that share one header, in log order
#[derive(Debug, Clone)]
pub struct RecordGroup {
    pub header: TestHeader,
    pub runs: Vec<TestRecord>,
}

/// Parse the text after `TEST BEGIN:`.
pub fn parse_header(text: &str, line_number: usize) -> LogResult<TestHeader> {
    let mut tokens = text.split_whitespace();
    let path = tokens
        .next()
        .ok_or_else(|| LogError::parse(line_number, text, "missing <task>/<test>"))?;
    let (task, test) = path
        .split_once('/')
        .ok_or_else(|| LogError::parse(line_number, text, "expected <task>/<test>"))?;
    if task.is_empty() || test.is_empty() {
        return Err(LogError::parse(line_number, text, "empty task or test name"));
    }

    let mut argument = None;
    let mut checkpoint_only = false;
    for token in tokens {
        if token == CHECKPOINT_ONLY_FLAG {
            checkpoint_only = true;
        } else if argument.is_none() {
            argument = Some(token.to_string());
        } else {
            return Err(LogError::parse(
                line_number,
                text,
                format!("unexpected header token {:?}", token),
            ));
        }
    }

    Ok(TestHeader {
        task: task.to_string(),
        test: test.to_string(),
        argument,
        checkpoint_only,
    })
}

/// Returns the payload after `<keyword> //` when the line is that record type.
fn keyword_payload<'a>(line: &'a str, keyword: &str) -> Option<&'a str> {
    let (head, rest) = line.split_once(FIELD_SEPARATOR)?;
    (head.trim() == keyword).then(|| rest.trim())
}

struct RecordBuilder {
    header: TestHeader,
    preamble: Vec<Action>,
    checkpoints: Vec<Checkpoint>,
    submit: Option<Action>,
}

impl RecordBuilder {
    fn new(header: TestHeader) -> Self {
        Self {
            header,
            preamble: Vec::new(),
            checkpoints: Vec::new(),
            submit: None,
        }
    }

    fn push_action(&mut self, action: Action) {
        match self.checkpoints.last_mut() {
            Some(checkpoint) => checkpoint.actions.push(action),
            None => self.preamble.push(action),
        }
    }

    fn finish(self, finished: bool) -> TestRecord {
        TestRecord {
            header: self.header,
            preamble: self.preamble,
            checkpoints: self.checkpoints,
            submit: self.submit,
            finished,
        }
    }
}

/// Parse a complete log into records, in log order.
///
/// Lines outside a `TEST BEGIN`/`TEST FINISH` pair are ignored. A malformed
/// line inside a record fails the whole parse.
pub fn extract_records(text: &str) -> LogResult<Vec<TestRecord>> {
    let mut records = Vec::new();
    let mut open: Option<RecordBuilder> = None;

    for (index, raw) in text.lines().enumerate() {
        let line_number = index + 1;
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(rest) = line.strip_prefix(TEST_BEGIN) {
            let header = parse_header(rest, line_number)?;
            if let Some(previous) = open.take() {
                warn!(
                    header = %previous.header.render(),
                    line_number,
                    "record closed by a new TEST BEGIN without TEST FINISH"
                );
                records.push(previous.finish(false));
            }
            open = Some(RecordBuilder::new(header));
            continue;
        }

        if line.starts_with(TEST_FINISH) {
            match open.take() {
                Some(builder) => records.push(builder.finish(true)),
                None => debug!(line_number, "TEST FINISH without an open record"),
            }
            continue;
        }

        let Some(builder) = open.as_mut() else {
            debug!(line_number, "ignoring line outside of a test record");
            continue;
        };

        if let Some(url) = keyword_payload(line, NAVIGATE) {
            builder.checkpoints.push(Checkpoint::new(url, Vec::new()));
        } else if let Some(payload) = keyword_payload(line, SUBMIT) {
            builder.submit = Some(Action::new(SUBMIT, payload));
        } else {
            builder.push_action(Action::parse_line(line, line_number)?);
        }
    }

    if let Some(builder) = open.take() {
        warn!(header = %builder.header.render(), "log ended inside a test record");
        records.push(builder.finish(false));
    }

    Ok(records)
}

/// Read and parse a log file.
pub fn read_records(path: &Path) -> LogResult<Vec<TestRecord>> {
    let text = fs::read_to_string(path)?;
    extract_records(&text)
}

/// Group runs by header, keeping first-seen order.
pub fn group_records(records: Vec<TestRecord>) -> Vec<RecordGroup> {
    let mut groups: Vec<RecordGroup> = Vec::new();
    for record in records {
        match groups.iter_mut().find(|g| g.header == record.header) {
            Some(group) => group.runs.push(record),
            None => groups.push(RecordGroup {
                header: record.header.clone(),
                runs: vec![record],
            }),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRAJECTORY: &str = "
        TEST BEGIN: playground/order
        NAVIGATE // /playground
        type/text // Search items // laptop //
        click/iconbutton // Search
        NAVIGATE // /playground/search?query=laptop
        click/link // 2023 MacBook Pro - M3 chip, 14-inch
        TEST FINISH
    ";

    #[test]
    fn test_parse_header_variants() {
        let header = parse_header(" playground/order", 1).unwrap();
        assert_eq!(header.task, "playground");
        assert_eq!(header.test, "order");
        assert_eq!(header.argument, None);
        assert!(!header.checkpoint_only);

        let header = parse_header("playground/order 2_select_item_from_search -checkpointonly", 1).unwrap();
        assert_eq!(header.argument.as_deref(), Some("2_select_item_from_search"));
        assert!(header.checkpoint_only);

        let header = parse_header("playground/order  -checkpointonly", 1).unwrap();
        assert_eq!(header.argument, None);
        assert!(header.checkpoint_only);

        assert!(parse_header("", 1).is_err());
        assert!(parse_header("order", 1).is_err());
        assert!(parse_header("a/b c d", 1).is_err());
    }

    #[test]
    fn test_header_render() {
        let header = parse_header("click/button default", 1).unwrap();
        assert_eq!(header.render(), "click/button default");
        let header = parse_header("playground/order 1_search -checkpointonly", 1).unwrap();
        assert_eq!(header.render(), "playground/order 1_search -checkpointonly");
    }

    #[test]
    fn test_extract_checkpoints() {
        let records = extract_records(TRAJECTORY).unwrap();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert!(record.finished);
        assert!(record.preamble.is_empty());
        assert_eq!(record.checkpoints.len(), 2);
        assert_eq!(record.checkpoints[0].url, "/playground");
        assert_eq!(record.checkpoints[0].actions.len(), 2);
        assert_eq!(record.checkpoints[1].url, "/playground/search?query=laptop");
        assert_eq!(record.checkpoints[1].actions[0].component, "click/link");
    }

    #[test]
    fn test_extract_flat_with_submit() {
        let log = r#"
            TEST BEGIN: fill/basicform default
            type/text // First name // John //
            click/button // Submit
            SUBMIT // {"firstName":"John","url":"http://x"}
            TEST FINISH
        "#;
        let records = extract_records(log).unwrap();
        let record = &records[0];
        assert_eq!(record.flat_actions().len(), 2);
        let submit = record.submit.as_ref().unwrap();
        assert_eq!(submit.component, SUBMIT);
        assert_eq!(submit.label, r#"{"firstName":"John","url":"http://x"}"#);
    }

    #[test]
    fn test_navigate_url_keeps_separators() {
        let log = "TEST BEGIN: playground/order\nNAVIGATE // http://localhost:3000/playground\nTEST FINISH";
        let records = extract_records(log).unwrap();
        assert_eq!(records[0].checkpoints[0].url, "http://localhost:3000/playground");
    }

    #[test]
    fn test_unterminated_records_are_kept() {
        let log = "
            TEST BEGIN: playground/order
            NAVIGATE // /playground
            TEST BEGIN: playground/order
            NAVIGATE // /playground
            click/button // Buy now
        ";
        let records = extract_records(log).unwrap();
        assert_eq!(records.len(), 2);
        assert!(!records[0].finished);
        assert!(!records[1].finished);
        assert_eq!(records[1].checkpoints[0].actions.len(), 1);
    }

    #[test]
    fn test_lines_outside_records_are_ignored() {
        let log = "stray line\nTEST BEGIN: click/button default\nclick/button // Submit\nTEST FINISH\nanother";
        let records = extract_records(log).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].preamble.len(), 1);
    }

    #[test]
    fn test_malformed_line_fails_fast() {
        let log = "TEST BEGIN: click/button default\nclick/button\nTEST FINISH";
        match extract_records(log) {
            Err(LogError::Parse { line_number, .. }) => assert_eq!(line_number, 2),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_group_records_keeps_first_seen_order() {
        let log = "
            TEST BEGIN: playground/order
            TEST FINISH
            TEST BEGIN: playground/order 1_search_for_item -checkpointonly
            TEST FINISH
            TEST BEGIN: playground/order
            TEST FINISH
        ";
        let groups = group_records(extract_records(log).unwrap());
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].runs.len(), 2);
        assert_eq!(groups[1].header.argument.as_deref(), Some("1_search_for_item"));
    }
}
