//! Command-line interface: argument definitions and the one-shot report pipeline

use crate::config::LedgerConfig;
use crate::error::LedgerError;
use crate::record::CustomerInput;
use crate::store::RecordStore;
use crate::summary::{format_rupiah, Summary};
use crate::sync::{sync_store, SqliteSheet};
use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;

/// Customer lifetime value ledger: import, segment, summarise, export and sync
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// JSON config file (sheet target, credentials, server address)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build a ledger from CSV files and flags, print the dashboard, optionally export/sync
    Report(ReportArgs),
    /// Interactive terminal dashboard
    Ui(UiArgs),
}

#[derive(Args, Debug, Default, Clone)]
pub struct ReportArgs {
    /// CSV file with columns ID, Margin, Biaya_Akuisisi (repeatable)
    #[arg(short, long)]
    pub import: Vec<PathBuf>,

    /// Add a customer as ID,MARGIN,COST (repeatable, ID may be empty)
    #[arg(short, long, value_parser = CustomerInput::parse_triplet)]
    pub add: Vec<CustomerInput>,

    /// Delete every record with this ID (repeatable)
    #[arg(short, long)]
    pub delete: Vec<String>,

    /// Write the ledger to this CSV file
    #[arg(short, long)]
    pub export: Option<PathBuf>,

    /// Replace the configured spreadsheet with the ledger
    #[arg(long)]
    pub sync: bool,
}

#[derive(Args, Debug, Default, Clone)]
pub struct UiArgs {
    /// CSV file to preload (repeatable)
    #[arg(short, long)]
    pub import: Vec<PathBuf>,
}

// ============================================================================
// REPORT PIPELINE
// ============================================================================

/// Run import → add → delete → print → export → sync against a fresh store.
///
/// Import and export failures abort with an error. Sync failures are
/// reported to `out` and the pipeline still succeeds.
pub fn run_report<W: Write>(
    args: &ReportArgs,
    config: &LedgerConfig,
    out: &mut W,
) -> Result<RecordStore> {
    let mut store = RecordStore::new();

    for path in &args.import {
        let count = store.import_csv_path(path)?;
        writeln!(out, "✓ Imported {} records from {}", count, path.display())?;
    }

    for input in &args.add {
        let record = store.add(input.clone())?;
        writeln!(
            out,
            "✓ Added '{}' (CLV = {})",
            record.id(),
            format_rupiah(record.clv() as f64)
        )?;
    }

    if !args.delete.is_empty() {
        let removed = store.delete(args.delete.as_slice());
        writeln!(out, "✓ Deleted {} records", removed)?;
    }

    writeln!(out)?;
    print_records(&store, out)?;
    writeln!(out)?;
    match store.summary() {
        Some(summary) => print_summary(&summary, out)?,
        None => writeln!(out, "No data yet. Add records or import a CSV.")?,
    }

    if let Some(path) = &args.export {
        store.export_csv_path(path)?;
        writeln!(out, "\n✓ Exported {} records to {}", store.len(), path.display())?;
    }

    if args.sync {
        writeln!(out)?;
        run_sync(&store, config, out)?;
    }

    Ok(store)
}

fn run_sync<W: Write>(store: &RecordStore, config: &LedgerConfig, out: &mut W) -> Result<()> {
    let mut sheet = match SqliteSheet::from_config(config) {
        Ok(sheet) => sheet,
        Err(e @ LedgerError::Connection(_)) => {
            log::warn!("{}", e);
            writeln!(out, "⚠️  {} (local data unaffected)", e)?;
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    match sync_store(store, &mut sheet) {
        Ok(report) => writeln!(
            out,
            "✓ Synced {} rows to {} [{}]",
            report.rows_written, report.target, report.worksheet
        )?,
        Err(e) => writeln!(out, "❌ {} (local data unaffected)", e)?,
    }

    Ok(())
}

pub fn print_records<W: Write>(store: &RecordStore, out: &mut W) -> Result<()> {
    writeln!(
        out,
        "{:<4} {:<16} {:>14} {:>14} {:>14}  {}",
        "#", "ID", "Margin", "Biaya_Akuisisi", "CLV", "Segment"
    )?;
    writeln!(out, "{}", "─".repeat(80))?;

    for (i, r) in store.records().iter().enumerate() {
        writeln!(
            out,
            "{:<4} {:<16} {:>14} {:>14} {:>14}  {}",
            i,
            truncate(r.id(), 16),
            r.margin(),
            r.acquisition_cost(),
            r.clv(),
            r.segment()
        )?;
    }

    Ok(())
}

pub fn print_summary<W: Write>(summary: &Summary, out: &mut W) -> Result<()> {
    writeln!(out, "📊 Dashboard")?;
    writeln!(out, "  Total Customers: {}", summary.count)?;
    writeln!(out, "  Average CLV:     {}", format_rupiah(summary.mean_clv))?;
    writeln!(out, "  Median CLV:      {}", format_rupiah(summary.median_clv))?;

    writeln!(out, "\n  Segment distribution")?;
    for bucket in &summary.distribution {
        writeln!(
            out,
            "  {:<11} {:>5} {}",
            bucket.segment.label(),
            bucket.count,
            "█".repeat(bucket.count.min(50))
        )?;
    }

    writeln!(out, "\n  {:<11} {:>7} {:>18} {:>18}", "Segment", "Count", "Avg CLV", "Median CLV")?;
    for stats in &summary.per_segment {
        writeln!(
            out,
            "  {:<11} {:>7} {:>18} {:>18}",
            stats.segment.label(),
            stats.count,
            format_rupiah(stats.mean_clv),
            format_rupiah(stats.median_clv)
        )?;
    }

    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max - 1).collect();
        format!("{cut}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_report_args() {
        let cli = Cli::try_parse_from([
            "clv-ledger",
            "report",
            "--import",
            "a.csv",
            "--add",
            "C1,3000000,200000",
            "--add",
            ",10,5",
            "--delete",
            "C9",
            "--sync",
        ])
        .unwrap();

        match cli.command {
            Command::Report(args) => {
                assert_eq!(args.import, vec![PathBuf::from("a.csv")]);
                assert_eq!(args.add.len(), 2);
                assert_eq!(args.add[0], CustomerInput::new("C1", 3_000_000, 200_000));
                assert_eq!(args.delete, vec!["C9".to_string()]);
                assert!(args.sync);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_bad_add_rejected() {
        assert!(Cli::try_parse_from(["clv-ledger", "report", "--add", "C1,abc,1"]).is_err());
    }

    #[test]
    fn test_report_empty_store() {
        let mut out = Vec::new();
        let store = run_report(&ReportArgs::default(), &LedgerConfig::default(), &mut out).unwrap();

        assert!(store.is_empty());
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("No data yet"));
    }

    #[test]
    fn test_sync_without_target_is_warning() {
        let args = ReportArgs {
            add: vec![CustomerInput::new("C1", 10, 0)],
            sync: true,
            ..Default::default()
        };

        let mut out = Vec::new();
        let store = run_report(&args, &LedgerConfig::default(), &mut out).unwrap();

        assert_eq!(store.len(), 1);
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("spreadsheet connection failed"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 16), "short");
        assert_eq!(truncate("abcdefghij", 5), "abcd…");
    }
}
