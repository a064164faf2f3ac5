//! Candidate matching against a pre-indexed reference set.
//!
//! The reference set is normalized and grouped by normalized name once per
//! run. Similarity is then computed once per *distinct* name and broadcast
//! to every row sharing it, which cannot change outcomes - rows with
//! identical normalized names always share the name predicate's verdict.

use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::error::RecordSide;
use crate::models::{FieldMap, Record};
use crate::normalize::{key_field, name_field, normalize_name};
use crate::scoring::NameStrategy;

/// JSON value type tag, used for the secondary-key schema preflight.
pub fn value_type(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Reference rows sharing one normalized name: (row index, secondary key).
type NameGroup = Vec<(usize, Value)>;

/// Read-only index over the reference set, built once per run and shared
/// across all transaction lookups.
pub struct ReferenceIndex {
    groups: FxHashMap<String, NameGroup>,
    rows_total: usize,
    rows_skipped: usize,
    key_types: Vec<&'static str>,
}

impl ReferenceIndex {
    /// Group reference rows by normalized name. Rows with a missing or
    /// non-string name, or a missing secondary key, can never be candidates
    /// and are excluded here (counted, not fatal).
    pub fn build(reference: &[Record], fields: &FieldMap) -> Self {
        let mut groups: FxHashMap<String, NameGroup> = FxHashMap::default();
        let mut rows_skipped = 0;
        let mut key_types: Vec<&'static str> = Vec::new();

        for (i, row) in reference.iter().enumerate() {
            let name = match name_field(row, &fields.name, RecordSide::Reference, i) {
                Ok(name) => name,
                Err(_) => {
                    rows_skipped += 1;
                    continue;
                }
            };
            let key = match key_field(row, &fields.key, RecordSide::Reference, i) {
                Ok(key) => key,
                Err(_) => {
                    rows_skipped += 1;
                    continue;
                }
            };

            let ty = value_type(key);
            if !key_types.contains(&ty) {
                key_types.push(ty);
            }
            groups
                .entry(normalize_name(name))
                .or_default()
                .push((i, key.clone()));
        }

        Self {
            groups,
            rows_total: reference.len(),
            rows_skipped,
            key_types,
        }
    }

    /// Reference rows passing both the name predicate and the exact
    /// secondary-key predicate, as ascending row indices.
    pub fn candidates(
        &self,
        strategy: NameStrategy,
        threshold: u32,
        tx_name_norm: &str,
        tx_key: &Value,
    ) -> Vec<usize> {
        let mut out = Vec::new();

        match strategy {
            // Exact equality on the normalized name is a direct lookup.
            NameStrategy::Exact => {
                if let Some(group) = self.groups.get(tx_name_norm) {
                    out.extend(
                        group
                            .iter()
                            .filter(|(_, key)| key == tx_key)
                            .map(|(i, _)| *i),
                    );
                }
            }
            NameStrategy::Fuzzy => {
                for (name, group) in &self.groups {
                    if strategy.score(tx_name_norm, name) >= threshold {
                        out.extend(
                            group
                                .iter()
                                .filter(|(_, key)| key == tx_key)
                                .map(|(i, _)| *i),
                        );
                    }
                }
            }
        }

        // Hash map iteration order is arbitrary; the candidate set is not.
        out.sort_unstable();
        out
    }

    pub fn rows_total(&self) -> usize {
        self.rows_total
    }

    pub fn rows_skipped(&self) -> usize {
        self.rows_skipped
    }

    pub fn distinct_names(&self) -> usize {
        self.groups.len()
    }

    /// Secondary-key value types observed on the reference side.
    pub fn key_types(&self) -> &[&'static str] {
        &self.key_types
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::DEFAULT_NAME_THRESHOLD;
    use serde_json::json;

    fn reference(rows: &[(&str, Value)]) -> Vec<Record> {
        rows.iter()
            .map(|(name, key)| {
                match json!({"obligor_name_matched": name, "obligation_type_code": key}) {
                    Value::Object(map) => map,
                    _ => unreachable!(),
                }
            })
            .collect()
    }

    fn lookup(index: &ReferenceIndex, name: &str, key: Value) -> Vec<usize> {
        index.candidates(
            NameStrategy::Fuzzy,
            DEFAULT_NAME_THRESHOLD,
            &normalize_name(name),
            &key,
        )
    }

    #[test]
    fn key_mismatch_excludes_perfect_name_score() {
        let rows = reference(&[("Jane Doe", json!("L1")), ("Jane Doe", json!("L2"))]);
        let index = ReferenceIndex::build(&rows, &FieldMap::default());
        // Score is 100 for both rows; only the matching key survives.
        assert_eq!(lookup(&index, "Jane Doe", json!("L1")), vec![0]);
        assert_eq!(lookup(&index, "Jane Doe", json!("L2")), vec![1]);
        assert!(lookup(&index, "Jane Doe", json!("L3")).is_empty());
    }

    #[test]
    fn key_equality_is_type_sensitive() {
        let rows = reference(&[("Jane Doe", json!(5))]);
        let index = ReferenceIndex::build(&rows, &FieldMap::default());
        assert_eq!(lookup(&index, "Jane Doe", json!(5)), vec![0]);
        // String "5" never equals number 5.
        assert!(lookup(&index, "Jane Doe", json!("5")).is_empty());
    }

    #[test]
    fn duplicate_names_share_one_verdict() {
        // Three rows with the same normalized name collapse to one group.
        let rows = reference(&[
            ("Jane Doe", json!("L1")),
            ("  JANE DOE ", json!("L1")),
            ("jane doe", json!("L2")),
        ]);
        let index = ReferenceIndex::build(&rows, &FieldMap::default());
        assert_eq!(index.distinct_names(), 1);
        assert_eq!(lookup(&index, "Jane Doe", json!("L1")), vec![0, 1]);
    }

    #[test]
    fn candidates_come_back_in_row_order() {
        let rows = reference(&[
            ("Jane D.", json!("L1")),
            ("Acme Corp", json!("L1")),
            ("Jane Doe", json!("L1")),
        ]);
        let index = ReferenceIndex::build(&rows, &FieldMap::default());
        assert_eq!(lookup(&index, "Jane Doe", json!("L1")), vec![0, 2]);
    }

    #[test]
    fn malformed_rows_are_skipped_and_counted() {
        let mut rows = reference(&[("Jane Doe", json!("L1"))]);
        // Non-string name.
        rows.push(
            match json!({"obligor_name_matched": 42, "obligation_type_code": "L1"}) {
                Value::Object(map) => map,
                _ => unreachable!(),
            },
        );
        // Missing key.
        rows.push(match json!({"obligor_name_matched": "Jane Doe"}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        });
        let index = ReferenceIndex::build(&rows, &FieldMap::default());
        assert_eq!(index.rows_total(), 3);
        assert_eq!(index.rows_skipped(), 2);
        assert_eq!(lookup(&index, "Jane Doe", json!("L1")), vec![0]);
    }

    #[test]
    fn exact_strategy_requires_normalized_equality() {
        let rows = reference(&[("Jane Doe", json!("L1")), ("Jane D.", json!("L1"))]);
        let index = ReferenceIndex::build(&rows, &FieldMap::default());
        let exact = index.candidates(
            NameStrategy::Exact,
            DEFAULT_NAME_THRESHOLD,
            "jane doe",
            &json!("L1"),
        );
        assert_eq!(exact, vec![0]);
    }

    #[test]
    fn key_types_observed() {
        let rows = reference(&[("A", json!("L1")), ("B", json!(2)), ("C", json!("L3"))]);
        let index = ReferenceIndex::build(&rows, &FieldMap::default());
        assert_eq!(index.key_types(), &["string", "number"]);
    }
}
