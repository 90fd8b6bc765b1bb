use std::fmt;

use serde::Serialize;

use crate::evaluate::CheckpointStatus;

/// Render `pass/total (pct%)`; an empty tally renders as 0%.
pub fn display_pass_stats(pass: usize, fail: usize) -> String {
    let total = pass + fail;
    let percent = if total == 0 {
        0.0
    } else {
        pass as f64 * 100.0 / total as f64
    };
    format!("{}/{} ({:.1}%)", pass, total, percent)
}

/// Pass/fail tally
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PassStats {
    pub pass_count: usize,
    pub fail_count: usize,
}

impl PassStats {
    pub fn record(&mut self, passed: bool) {
        if passed {
            self.pass_count += 1;
        } else {
            self.fail_count += 1;
        }
    }

    pub fn total(&self) -> usize {
        self.pass_count + self.fail_count
    }

    pub fn merge(&mut self, other: &PassStats) {
        self.pass_count += other.pass_count;
        self.fail_count += other.fail_count;
    }
}

impl fmt::Display for PassStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&display_pass_stats(self.pass_count, self.fail_count))
    }
}

/// Status tally for one checkpoint name across runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CheckpointMatchStats {
    pub full_match: usize,
    pub partial_match: usize,
    pub missing: usize,
}

impl CheckpointMatchStats {
    pub fn record(&mut self, status: CheckpointStatus) {
        match status {
            CheckpointStatus::FullMatch => self.full_match += 1,
            CheckpointStatus::PartialMatch => self.partial_match += 1,
            CheckpointStatus::Missing => self.missing += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.full_match + self.partial_match + self.missing
    }
}

impl fmt::Display for CheckpointMatchStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.total();
        write!(
            f,
            "full_match ({}/{}), partial_match ({}/{}), missing ({}/{})",
            self.full_match, total, self.partial_match, total, self.missing, total
        )
    }
}

/// Correct/missing tally for one category/task/test cell
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CorrectMissing {
    pub correct: usize,
    pub missing: usize,
}

impl CorrectMissing {
    pub fn total(&self) -> usize {
        self.correct + self.missing
    }

    pub fn merge(&mut self, other: &CorrectMissing) {
        self.correct += other.correct;
        self.missing += other.missing;
    }
}

impl fmt::Display for CorrectMissing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&display_pass_stats(self.correct, self.missing))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_pass_stats() {
        assert_eq!(display_pass_stats(1, 1), "1/2 (50.0%)");
        assert_eq!(display_pass_stats(3, 0), "3/3 (100.0%)");
        assert_eq!(display_pass_stats(0, 0), "0/0 (0.0%)");
        assert_eq!(display_pass_stats(1, 2), "1/3 (33.3%)");
    }

    #[test]
    fn test_checkpoint_stats_display() {
        let mut stats = CheckpointMatchStats::default();
        stats.record(CheckpointStatus::FullMatch);
        stats.record(CheckpointStatus::Missing);
        assert_eq!(
            stats.to_string(),
            "full_match (1/2), partial_match (0/2), missing (1/2)"
        );
    }

    #[test]
    fn test_pass_stats() {
        let mut stats = PassStats::default();
        stats.record(true);
        stats.record(false);
        stats.merge(&PassStats { pass_count: 2, fail_count: 0 });
        assert_eq!(stats.total(), 4);
        assert_eq!(stats.to_string(), "3/4 (75.0%)");
    }
}
