use serde::{Deserialize, Serialize};

/// Whether the fix reproduced the bugged submission line for line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    #[serde(rename = "fixed")]
    Fixed,
    #[serde(rename = "not fixed")]
    NotFixed,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fixed => write!(f, "fixed"),
            Self::NotFixed => write!(f, "not fixed"),
        }
    }
}

/// Scoring payload delivered to both participants when a game closes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub verdict: Verdict,
    /// Zero-based indices of the lines that differ.
    pub diff: Vec<usize>,
}

/// Compare two submissions line by line.
///
/// Every index below the longer of the two lengths is checked; a line that
/// exists on only one side counts as a difference, so sequences of unequal
/// length never score as fixed.
pub fn score(bug: &[String], fix: &[String]) -> Outcome {
    let len = bug.len().max(fix.len());
    let diff: Vec<usize> = (0..len).filter(|&i| bug.get(i) != fix.get(i)).collect();
    let verdict = if diff.is_empty() {
        Verdict::Fixed
    } else {
        Verdict::NotFixed
    };
    Outcome { verdict, diff }
}
