//! Name similarity scoring.
//!
//! The fuzzy score is a partial-match ratio on a 0-100 scale: how well the
//! shorter of two strings fits as a contiguous window of the longer one.
//! Extra tokens on either side of the longer string are free, so
//! "jane doe" scores 100 against "acme jane doe holdings llc". Both inputs
//! are expected to already be in normalized form (see `normalize`).

use strsim::levenshtein;

/// Minimum partial-ratio score for a reference name to count as a candidate.
pub const DEFAULT_NAME_THRESHOLD: u32 = 85;

/// Partial-match ratio between two strings, 0-100.
///
/// Slides a window the length of the shorter string across the longer one
/// and keeps the best normalized Levenshtein similarity over all windows.
/// Pure and deterministic; symmetric in argument order.
pub fn partial_ratio(a: &str, b: &str) -> u32 {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let (short, long) = if a_chars.len() <= b_chars.len() {
        (a_chars, b_chars)
    } else {
        (b_chars, a_chars)
    };

    if short.is_empty() {
        return if long.is_empty() { 100 } else { 0 };
    }

    let needle: String = short.iter().collect();
    let window = short.len();
    let mut best = 0.0_f64;

    for start in 0..=(long.len() - window) {
        let slice: String = long[start..start + window].iter().collect();
        // Equal char counts, so distance is at most `window`.
        let dist = levenshtein(&needle, &slice);
        let sim = 1.0 - dist as f64 / window as f64;
        if sim > best {
            best = sim;
            if dist == 0 {
                break;
            }
        }
    }

    (best * 100.0).round() as u32
}

/// Pluggable name comparison: the fuzzy partial-ratio scorer, or plain
/// normalized equality for callers reconciling against an already-clean
/// register. Both feed the same `score >= threshold` predicate so the two
/// historical code paths collapse into one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NameStrategy {
    #[default]
    Fuzzy,
    Exact,
}

impl NameStrategy {
    /// Score a transaction name against a reference name, 0-100.
    /// Exact equality scores 100 or 0 and ignores nothing else.
    pub fn score(self, tx_name_norm: &str, ref_name_norm: &str) -> u32 {
        match self {
            Self::Fuzzy => partial_ratio(tx_name_norm, ref_name_norm),
            Self::Exact => {
                if tx_name_norm == ref_name_norm {
                    100
                } else {
                    0
                }
            }
        }
    }
}
