//! Sequence alignment shared by checkpoint-level and action-level comparison.
//!
//! Two cursors walk the golden and observed sequences. On a mismatch the
//! observed side is scanned forward (never backward) for the first element
//! the current golden element matches; everything skipped over is extra. A
//! golden element with no match ahead is missing and consumes nothing.

use serde::Serialize;

/// One classification produced by [`align`], indices into the inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AlignStep {
    Matched { golden: usize, observed: usize },
    Missing { golden: usize },
    Extra { observed: usize },
}

/// Steps in the order they were decided
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Alignment {
    pub steps: Vec<AlignStep>,
}

impl Alignment {
    pub fn matched(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.steps.iter().filter_map(|step| match *step {
            AlignStep::Matched { golden, observed } => Some((golden, observed)),
            _ => None,
        })
    }

    pub fn missing(&self) -> impl Iterator<Item = usize> + '_ {
        self.steps.iter().filter_map(|step| match *step {
            AlignStep::Missing { golden } => Some(golden),
            _ => None,
        })
    }

    pub fn extra(&self) -> impl Iterator<Item = usize> + '_ {
        self.steps.iter().filter_map(|step| match *step {
            AlignStep::Extra { observed } => Some(observed),
            _ => None,
        })
    }
}

/// Align `golden` against `observed` with first-found forward lookahead.
///
/// Every golden index ends up exactly once in matched or missing, every
/// observed index exactly once in matched or extra.
pub fn align<G, O, F>(golden: &[G], observed: &[O], mut matches: F) -> Alignment
where
    F: FnMut(&G, &O) -> bool,
{
    let mut steps = Vec::with_capacity(golden.len().max(observed.len()));
    let mut g = 0;
    let mut o = 0;

    loop {
        match (g < golden.len(), o < observed.len()) {
            (false, false) => break,
            (false, true) => {
                steps.extend((o..observed.len()).map(|observed| AlignStep::Extra { observed }));
                break;
            }
            (true, false) => {
                steps.extend((g..golden.len()).map(|golden| AlignStep::Missing { golden }));
                break;
            }
            (true, true) => {}
        }

        if matches(&golden[g], &observed[o]) {
            steps.push(AlignStep::Matched { golden: g, observed: o });
            g += 1;
            o += 1;
            continue;
        }

        let ahead = (o + 1..observed.len()).find(|&i| matches(&golden[g], &observed[i]));
        match ahead {
            Some(found) => {
                steps.extend((o..found).map(|observed| AlignStep::Extra { observed }));
                o = found;
            }
            None => {
                steps.push(AlignStep::Missing { golden: g });
                g += 1;
            }
        }
    }

    Alignment { steps }
}

/// Result of set matching, indices into the inputs in ascending order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Coverage {
    pub matched: Vec<usize>,
    pub missing: Vec<usize>,
    pub extra: Vec<usize>,
}

/// Position-free matching: a golden element is matched if any observed
/// element satisfies it, an observed element is extra if no golden element
/// does. Observed elements are not consumed.
pub fn cover<G, O, F>(golden: &[G], observed: &[O], matches: F) -> Coverage
where
    F: Fn(&G, &O) -> bool,
{
    let mut coverage = Coverage::default();
    for (i, g) in golden.iter().enumerate() {
        if observed.iter().any(|o| matches(g, o)) {
            coverage.matched.push(i);
        } else {
            coverage.missing.push(i);
        }
    }
    for (i, o) in observed.iter().enumerate() {
        if !golden.iter().any(|g| matches(g, o)) {
            coverage.extra.push(i);
        }
    }
    coverage
}
