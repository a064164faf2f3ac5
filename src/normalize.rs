//! Name normalization for obligor matching.
//!
//! Deliberately minimal: trim surrounding whitespace, then lowercase.
//! No accent folding and no punctuation stripping - the similarity scorer
//! is expected to absorb the remaining noise, and callers that want more
//! aggressive canonicalization apply it before records reach the engine.

use serde_json::Value;

use crate::error::{MatchError, RecordSide};
use crate::models::Record;

/// Canonical comparison form of an obligor name.
pub fn normalize_name(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Extract the name field from a record, failing fast on a missing or
/// non-string value. The upstream system used to stringify anything it
/// found (so a missing name compared as the literal "none"); that is a
/// silent-match hazard and is rejected here instead.
pub fn name_field<'a>(
    record: &'a Record,
    field: &str,
    side: RecordSide,
    index: usize,
) -> Result<&'a str, MatchError> {
    match record.get(field) {
        Some(Value::String(s)) => Ok(s),
        _ => Err(MatchError::MissingField {
            side,
            index,
            field: field.to_string(),
        }),
    }
}

/// Extract the secondary-key field. Any JSON value type is allowed here
/// (equality later is type-sensitive); only absence is an error.
pub fn key_field<'a>(
    record: &'a Record,
    field: &str,
    side: RecordSide,
    index: usize,
) -> Result<&'a Value, MatchError> {
    record.get(field).ok_or_else(|| MatchError::MissingField {
        side,
        index,
        field: field.to_string(),
    })
}
