//! Orchestration and uniqueness resolution.
//!
//! The engine is pure with respect to both record sets: it reads them,
//! builds a read-only reference index, and produces a derived subsequence
//! plus diagnostics. A transaction reaches the output iff its candidate
//! set has exactly one member; zero and many are normal non-matches, and
//! ambiguity is never resolved by silently picking one side.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use indicatif::ProgressBar;
use rayon::prelude::*;

use crate::error::{MatchError, RecordSide};
use crate::matcher::{value_type, ReferenceIndex};
use crate::models::{MatchConfig, MatchDiagnostic, MatchOutcome, MatchOutput, Record};
use crate::normalize::{key_field, name_field, normalize_name};

/// Transactions are matched in chunks of this size; the cancellation flag
/// is checked between chunks and a chunk is the parallel fan-out unit.
pub const MATCH_CHUNK_SIZE: usize = 1024;

/// Caller-supplied run controls. All optional; `Default` gives an
/// uncancellable, silent run.
#[derive(Default, Clone)]
pub struct RunControl {
    /// Cooperative cancellation, checked once per chunk. On cancellation
    /// the engine stops matching and returns everything processed so far.
    pub cancel: Option<Arc<AtomicBool>>,
    /// Incremented once per transaction processed.
    pub progress: Option<ProgressBar>,
}

impl RunControl {
    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

/// Reconcile transactions against the reference set per `config`.
///
/// Fatal errors (bad threshold, incompatible secondary-key schema) abort
/// before any matching. Per-record field problems skip the record and
/// surface in its diagnostic entry instead.
pub fn run(
    config: &MatchConfig,
    transactions: &[Record],
    reference: &[Record],
    ctl: &RunControl,
) -> Result<MatchOutput, MatchError> {
    let start = Instant::now();
    config.validate()?;

    let index = ReferenceIndex::build(reference, &config.fields);
    preflight_key_schema(config, transactions, &index)?;

    let mut diagnostics: Vec<MatchDiagnostic> = Vec::with_capacity(transactions.len());

    for chunk_start in (0..transactions.len()).step_by(MATCH_CHUNK_SIZE) {
        if ctl.is_cancelled() {
            break;
        }
        let chunk_end = (chunk_start + MATCH_CHUNK_SIZE).min(transactions.len());
        let chunk = &transactions[chunk_start..chunk_end];

        let chunk_diags: Vec<MatchDiagnostic> = if config.parallel {
            chunk
                .par_iter()
                .enumerate()
                .map(|(offset, tx)| evaluate(config, &index, tx, chunk_start + offset))
                .collect()
        } else {
            chunk
                .iter()
                .enumerate()
                .map(|(offset, tx)| evaluate(config, &index, tx, chunk_start + offset))
                .collect()
        };

        if let Some(pb) = &ctl.progress {
            pb.inc(chunk_diags.len() as u64);
        }
        diagnostics.extend(chunk_diags);
    }

    let mut stats = crate::models::MatchStats {
        reference_rows: index.rows_total(),
        reference_rows_skipped: index.rows_skipped(),
        distinct_reference_names: index.distinct_names(),
        ..Default::default()
    };

    let mut matched = Vec::new();
    for diag in &diagnostics {
        stats.record_outcome(diag.outcome);
        if diag.outcome == MatchOutcome::Matched {
            matched.push(transactions[diag.index].clone());
        }
    }
    stats.elapsed_seconds = start.elapsed().as_secs_f64();

    Ok(MatchOutput {
        matched,
        diagnostics,
        stats,
    })
}

/// Match one transaction against the index. Field problems produce a
/// `Skipped` diagnostic carrying the cause.
fn evaluate(
    config: &MatchConfig,
    index: &ReferenceIndex,
    tx: &Record,
    tx_index: usize,
) -> MatchDiagnostic {
    let fields = &config.fields;
    let extracted = name_field(tx, &fields.name, RecordSide::Transaction, tx_index)
        .and_then(|name| {
            key_field(tx, &fields.key, RecordSide::Transaction, tx_index).map(|key| (name, key))
        });

    let (name, key) = match extracted {
        Ok(pair) => pair,
        Err(err) => {
            return MatchDiagnostic {
                index: tx_index,
                outcome: MatchOutcome::Skipped,
                candidate_count: 0,
                error: Some(err.to_string()),
            }
        }
    };

    let candidates = index.candidates(
        config.strategy,
        config.name_threshold,
        &normalize_name(name),
        key,
    );
    let outcome = match candidates.len() {
        1 => MatchOutcome::Matched,
        0 => MatchOutcome::Unmatched,
        _ => MatchOutcome::Ambiguous,
    };

    MatchDiagnostic {
        index: tx_index,
        outcome,
        candidate_count: candidates.len(),
        error: None,
    }
}

/// Abort the run when exact key equality can never succeed: both sides
/// carry secondary keys, and no value type appears on both. Mixed-type
/// sides that still overlap proceed; individually mismatched rows simply
/// never match.
fn preflight_key_schema(
    config: &MatchConfig,
    transactions: &[Record],
    index: &ReferenceIndex,
) -> Result<(), MatchError> {
    let mut tx_types: Vec<&'static str> = Vec::new();
    for tx in transactions {
        if let Some(key) = tx.get(&config.fields.key) {
            let ty = value_type(key);
            if !tx_types.contains(&ty) {
                tx_types.push(ty);
            }
        }
    }

    let ref_types = index.key_types();
    let overlap = tx_types.iter().any(|ty| ref_types.contains(ty));
    if !tx_types.is_empty() && !ref_types.is_empty() && !overlap {
        return Err(MatchError::Schema {
            field: config.fields.key.clone(),
            transaction_types: tx_types,
            reference_types: ref_types.to_vec(),
        });
    }
    Ok(())
}
