use anyhow::{bail, Context, Result};
use clap::Parser;
use serde_json::Value;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use obligor_recon::engine;
use obligor_recon::models::{FieldMap, MatchConfig, MatchDiagnostic, Record};
use obligor_recon::progress::{create_progress_bar, create_spinner, format_duration, set_log_only};
use obligor_recon::NameStrategy;

#[derive(Parser)]
#[command(name = "obligor-recon")]
#[command(about = "Reconcile transaction records against a reference set by fuzzy obligor name + exact type code")]
struct Args {
    /// Transaction records, one JSON object per line
    transactions: PathBuf,

    /// Reference records (loan/register data), one JSON object per line
    reference: PathBuf,

    /// Matched transactions are written here, one JSON object per line
    output: PathBuf,

    /// Write a per-transaction diagnostics stream (outcome + candidate count)
    #[arg(long)]
    diagnostics: Option<PathBuf>,

    /// Write run statistics as JSON
    #[arg(long)]
    stats: Option<PathBuf>,

    /// Minimum name similarity score (0-100)
    #[arg(long, default_value = "85")]
    threshold: u32,

    /// Name field on both record sets
    #[arg(long, default_value = "obligor_name_matched")]
    name_field: String,

    /// Secondary-key field on both record sets (exact, type-sensitive match)
    #[arg(long, default_value = "obligation_type_code")]
    key_field: String,

    /// Require exact normalized-name equality instead of fuzzy similarity
    #[arg(long)]
    exact: bool,

    /// Worker threads for the matching phase (0 = rayon default)
    #[arg(long, default_value = "0")]
    workers: usize,

    /// Match transactions one at a time instead of fanning out chunks
    #[arg(long)]
    sequential: bool,

    /// Hide progress bars for tail-friendly output
    #[arg(long)]
    log_only: bool,
}

fn read_records(path: &Path, label: &str) -> Result<Vec<Record>> {
    let spinner = create_spinner(&format!("Reading {label}"));
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;

    let mut records = Vec::new();
    for (lineno, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("{}: read error", path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}: invalid JSON", path.display(), lineno + 1))?;
        match value {
            Value::Object(map) => records.push(map),
            _ => bail!(
                "{}:{}: expected a JSON object, got {}",
                path.display(),
                lineno + 1,
                line.trim()
            ),
        }
    }

    spinner.finish_with_message(format!("Read {} {label}", records.len()));
    Ok(records)
}

fn write_records(path: &Path, records: &[Record]) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut w = BufWriter::new(file);
    for record in records {
        serde_json::to_writer(&mut w, record)?;
        w.write_all(b"\n")?;
    }
    w.flush()?;
    Ok(())
}

fn write_diagnostics(path: &Path, diagnostics: &[MatchDiagnostic]) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut w = BufWriter::new(file);
    for diag in diagnostics {
        serde_json::to_writer(&mut w, diag)?;
        w.write_all(b"\n")?;
    }
    w.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    set_log_only(args.log_only);

    if args.workers > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(args.workers)
            .build_global()
            .context("Failed to set thread pool size")?;
    }

    let transactions = read_records(&args.transactions, "transactions")?;
    let reference = read_records(&args.reference, "reference records")?;

    let config = MatchConfig {
        fields: FieldMap {
            name: args.name_field.clone(),
            key: args.key_field.clone(),
        },
        name_threshold: args.threshold,
        strategy: if args.exact {
            NameStrategy::Exact
        } else {
            NameStrategy::Fuzzy
        },
        parallel: !args.sequential,
    };

    let pb = create_progress_bar(transactions.len() as u64, "Matching transactions");
    let ctl = engine::RunControl {
        cancel: None,
        progress: Some(pb.clone()),
    };
    let output = engine::run(&config, &transactions, &reference, &ctl)
        .context("matching run aborted")?;
    pb.finish_with_message(format!(
        "Matched {} of {} transactions",
        output.stats.matched, output.stats.total_transactions
    ));

    write_records(&args.output, &output.matched)?;
    if let Some(path) = &args.diagnostics {
        write_diagnostics(path, &output.diagnostics)?;
    }
    if let Some(path) = &args.stats {
        output.stats.write_to_file(path)?;
    }
    output.stats.log_phase("match");

    let stats = &output.stats;
    println!("\n{:=<60}", "");
    println!("Reconciliation complete!");
    println!("  Transactions:  {}", stats.total_transactions);
    println!(
        "  Matched:       {} ({:.1}%)",
        stats.matched,
        stats.match_rate()
    );
    println!("  Unmatched:     {}", stats.unmatched);
    println!("  Ambiguous:     {}", stats.ambiguous);
    println!("  Skipped:       {}", stats.skipped_missing_field);
    println!(
        "  Reference:     {} rows, {} distinct names, {} skipped",
        stats.reference_rows, stats.distinct_reference_names, stats.reference_rows_skipped
    );
    println!(
        "  Elapsed:       {}",
        format_duration(Duration::from_secs_f64(stats.elapsed_seconds))
    );
    println!("{:=<60}", "");

    Ok(())
}
