//! Error taxonomy for the matching engine.
//!
//! Zero-candidate and multi-candidate outcomes are *not* errors; they are
//! reported through the diagnostics stream. Errors here are either fatal
//! configuration problems (detected before any matching) or per-record
//! field problems (recovered by skipping and reporting the record).

use std::fmt;

/// Which of the two record sets a per-record error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordSide {
    Transaction,
    Reference,
}

impl fmt::Display for RecordSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transaction => write!(f, "transaction"),
            Self::Reference => write!(f, "reference"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchError {
    /// A required field is absent, or present with a non-string value where
    /// a name string is required. Recovered per record.
    MissingField {
        side: RecordSide,
        index: usize,
        field: String,
    },
    /// The secondary-key field holds incompatible value types across the two
    /// record sets, so exact equality can never succeed. Fatal, detected in
    /// preflight before any matching.
    Schema {
        field: String,
        transaction_types: Vec<&'static str>,
        reference_types: Vec<&'static str>,
    },
    /// Similarity threshold outside the 0-100 scale. Fatal.
    Threshold(u32),
}

impl fmt::Display for MatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingField { side, index, field } => {
                write!(f, "{side} record {index}: missing or non-string field '{field}'")
            }
            Self::Schema { field, transaction_types, reference_types } => {
                write!(
                    f,
                    "secondary-key field '{field}' can never match: transaction side has types {transaction_types:?}, reference side has types {reference_types:?}"
                )
            }
            Self::Threshold(t) => {
                write!(f, "name similarity threshold {t} is outside the 0-100 scale")
            }
        }
    }
}

impl std::error::Error for MatchError {}
