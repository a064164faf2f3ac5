//! Summarize a diagnostics stream from a reconciliation run.
//!
//! Usage: audit-unmatched <diagnostics.jsonl>
//!
//! Breaks the per-transaction outcomes down by candidate count so ambiguity
//! (several reference rows clearing the threshold) can be told apart from
//! plain no-match, and surfaces the causes behind skipped records.

use anyhow::{Context, Result};
use clap::Parser;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

use obligor_recon::models::{MatchDiagnostic, MatchOutcome};

#[derive(Parser)]
#[command(name = "audit-unmatched")]
#[command(about = "Summarize outcomes and candidate counts from a diagnostics stream")]
struct Args {
    /// Diagnostics file written by obligor-recon --diagnostics
    diagnostics: PathBuf,

    /// Show this many example transaction indices per bucket
    #[arg(long, default_value = "5")]
    examples: usize,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let file = File::open(&args.diagnostics)
        .with_context(|| format!("failed to open {}", args.diagnostics.display()))?;

    let mut total = 0usize;
    let mut by_outcome: BTreeMap<&'static str, usize> = BTreeMap::new();
    let mut by_candidate_count: BTreeMap<usize, usize> = BTreeMap::new();
    let mut ambiguous_examples: Vec<usize> = Vec::new();
    let mut skip_causes: BTreeMap<String, usize> = BTreeMap::new();

    for (lineno, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let diag: MatchDiagnostic = serde_json::from_str(&line).with_context(|| {
            format!("{}:{}: invalid diagnostic", args.diagnostics.display(), lineno + 1)
        })?;

        total += 1;
        let outcome_name = match diag.outcome {
            MatchOutcome::Matched => "matched",
            MatchOutcome::Unmatched => "unmatched",
            MatchOutcome::Ambiguous => "ambiguous",
            MatchOutcome::Skipped => "skipped",
        };
        *by_outcome.entry(outcome_name).or_default() += 1;
        *by_candidate_count.entry(diag.candidate_count).or_default() += 1;

        if diag.outcome == MatchOutcome::Ambiguous && ambiguous_examples.len() < args.examples {
            ambiguous_examples.push(diag.index);
        }
        if let Some(cause) = diag.error {
            *skip_causes.entry(cause).or_default() += 1;
        }
    }

    println!("Diagnostics: {} transactions", total);
    println!("{:-<60}", "");

    println!("By outcome:");
    for (outcome, count) in &by_outcome {
        let pct = if total > 0 {
            100.0 * *count as f64 / total as f64
        } else {
            0.0
        };
        println!("  {:<12} {:>8} ({:.1}%)", outcome, count, pct);
    }

    println!("\nBy candidate count:");
    for (count, n) in &by_candidate_count {
        println!("  {:>3} candidate(s): {}", count, n);
    }

    if !ambiguous_examples.is_empty() {
        println!(
            "\nExample ambiguous transaction indices: {:?}",
            ambiguous_examples
        );
    }

    if !skip_causes.is_empty() {
        println!("\nSkip causes:");
        for (cause, n) in &skip_causes {
            println!("  {:>6}x {}", n, cause);
        }
    }

    Ok(())
}
