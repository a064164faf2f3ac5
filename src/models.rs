//! Core data models for the reconciliation engine.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::MatchError;
use crate::scoring::{NameStrategy, DEFAULT_NAME_THRESHOLD};

// ============================================================================
// Records
// ============================================================================

/// One row from either record set: a JSON object keyed by field name.
/// Identity is positional in the source sequence; all fields beyond the two
/// the matcher reads are passthrough and preserved unchanged in output.
pub type Record = serde_json::Map<String, Value>;

// ============================================================================
// Configuration
// ============================================================================

/// Field names the matcher reads. The two historical call sites disagreed
/// on these, so they are configuration, never hardcoded at use sites.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMap {
    /// Free-text obligor/customer name field.
    pub name: String,
    /// Categorical code that must match exactly (type-sensitive).
    pub key: String,
}

impl Default for FieldMap {
    fn default() -> Self {
        Self {
            name: "obligor_name_matched".to_string(),
            key: "obligation_type_code".to_string(),
        }
    }
}

impl FieldMap {
    /// Field names used by the register-spreadsheet call site.
    pub fn register_sheet() -> Self {
        Self {
            name: "Obligor_name_matched".to_string(),
            key: "Obligation Type Code".to_string(),
        }
    }
}

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct MatchConfig {
    pub fields: FieldMap,
    /// Minimum name similarity score, 0-100.
    pub name_threshold: u32,
    pub strategy: NameStrategy,
    /// Fan transaction chunks out over the rayon pool. Matching is
    /// independent per transaction, so this never changes the output.
    pub parallel: bool,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            fields: FieldMap::default(),
            name_threshold: DEFAULT_NAME_THRESHOLD,
            strategy: NameStrategy::default(),
            parallel: true,
        }
    }
}

impl MatchConfig {
    pub fn validate(&self) -> Result<(), MatchError> {
        if self.name_threshold > 100 {
            return Err(MatchError::Threshold(self.name_threshold));
        }
        Ok(())
    }
}

// ============================================================================
// Outcomes and diagnostics
// ============================================================================

/// Per-transaction outcome. Only `Matched` rows reach the output set;
/// everything else is visible through the diagnostics stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchOutcome {
    /// Exactly one candidate.
    Matched,
    /// Zero candidates.
    Unmatched,
    /// More than one candidate; deliberately never resolved by picking one.
    Ambiguous,
    /// Required field missing or malformed; record excluded and reported.
    Skipped,
}

/// One diagnostic entry per input transaction, in input order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchDiagnostic {
    /// Position of the transaction in the input sequence.
    pub index: usize,
    pub outcome: MatchOutcome,
    pub candidate_count: usize,
    /// Cause, for `Skipped` entries only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Engine output: the matched subsequence plus the audit trail.
#[derive(Debug, Clone)]
pub struct MatchOutput {
    /// Full original transaction rows with exactly one candidate, in input
    /// order.
    pub matched: Vec<Record>,
    pub diagnostics: Vec<MatchDiagnostic>,
    pub stats: MatchStats,
}

// ============================================================================
// Statistics (instrumentation)
// ============================================================================

/// Per-run matching statistics.
#[derive(Default, Debug, Clone, Serialize)]
pub struct MatchStats {
    pub total_transactions: usize,
    pub matched: usize,
    pub unmatched: usize,
    pub ambiguous: usize,
    pub skipped_missing_field: usize,

    pub reference_rows: usize,
    /// Reference rows excluded from the index (bad name or missing key).
    pub reference_rows_skipped: usize,
    /// Distinct normalized names in the index; similarity is computed once
    /// per distinct name, not once per row.
    pub distinct_reference_names: usize,

    pub elapsed_seconds: f64,
}

impl MatchStats {
    /// Matched transactions as a percentage of the input.
    pub fn match_rate(&self) -> f64 {
        if self.total_transactions == 0 {
            0.0
        } else {
            100.0 * self.matched as f64 / self.total_transactions as f64
        }
    }

    /// Log stats to stderr in JSON format.
    pub fn log_phase(&self, phase: &str) {
        if let Ok(json) = serde_json::to_string_pretty(self) {
            eprintln!("[STATS:{}]\n{}", phase, json);
        }
    }

    /// Write stats to a JSON file.
    pub fn write_to_file(&self, path: &std::path::Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn record_outcome(&mut self, outcome: MatchOutcome) {
        self.total_transactions += 1;
        match outcome {
            MatchOutcome::Matched => self.matched += 1,
            MatchOutcome::Unmatched => self.unmatched += 1,
            MatchOutcome::Ambiguous => self.ambiguous += 1,
            MatchOutcome::Skipped => self.skipped_missing_field += 1,
        }
    }
}
