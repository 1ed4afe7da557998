use colored::*;
use serde::Serialize;
use std::path::PathBuf;

use crate::common::config::SweepConfig;
use crate::common::format::{self, format_age, format_path, format_size};
use crate::sweeper::PassReport;

/// Verdict for one path printed by `agesweep check`
#[derive(Debug, Clone, Serialize)]
pub struct CheckVerdict {
    pub path: PathBuf,
    /// Selected by the include/exclude rules
    pub matched: bool,
    /// Age in seconds, when the path exists
    pub age_secs: Option<i64>,
    /// Matched and older than the threshold
    pub would_delete: bool,
}

/// Print a pass report in human-readable format
pub fn print_pass_report(report: &PassReport, detailed: bool) {
    let title = if report.dry_run {
        "agesweep Pass (dry run)"
    } else {
        "agesweep Pass"
    };
    println!();
    println!("{}  {}", "🧹", title);
    println!("{}", "─".repeat(60).dimmed());
    println!(
        "  Finished in {}  •  {} scanned  •  {} root(s)",
        format::format_duration(report.duration_secs).cyan(),
        format::format_count(report.files_scanned),
        report.roots_processed
    );
    println!("{}", "─".repeat(60).dimmed());
    println!();

    if report.dry_run {
        println!(
            "  {} Would delete {} ({})",
            "ℹ️",
            format::format_count(report.files_would_delete).yellow(),
            format_size(report.bytes_freed)
        );
    } else {
        println!(
            "  {} Deleted {} ({})",
            "✓".green(),
            format::format_count(report.files_deleted).green(),
            format_size(report.bytes_freed)
        );
    }
    println!(
        "  {} Kept {}",
        "●".dimmed(),
        format::format_count(report.files_kept)
    );

    if detailed && !report.deleted_paths.is_empty() {
        println!();
        for path in &report.deleted_paths {
            println!("      {} {}", "└".dimmed(), format_path(path).dimmed());
        }
    }

    if report.errors > 0 {
        println!();
        println!(
            "  {} {} error(s), rerun with --verbose for details",
            "⚠".yellow(),
            report.errors
        );
    }
    if report.cancelled {
        println!("  {} Pass was cancelled before finishing", "✗".red());
    }
    println!();
}

/// Print a pass report as pretty JSON
pub fn print_pass_json(report: &PassReport) -> serde_json::Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}

/// Print a pass report as one JSON line (for `run`, one line per pass)
pub fn print_pass_json_line(report: &PassReport) -> serde_json::Result<()> {
    println!("{}", serde_json::to_string(report)?);
    Ok(())
}

/// Tab-separated: selected count, bytes, errors
pub fn print_pass_quiet(report: &PassReport) {
    println!(
        "{}\t{}\t{}",
        report.files_selected(),
        report.bytes_freed,
        report.errors
    );
}

/// One-line summary used by `run` after every pass
pub fn print_pass_line(report: &PassReport) {
    let verb = if report.dry_run { "would delete" } else { "deleted" };
    let errors = if report.errors > 0 {
        format!("{} error(s)", report.errors).yellow()
    } else {
        "no errors".dimmed()
    };
    println!(
        "  {} {}  {} {} ({})  •  {}  •  {}",
        "●".cyan(),
        report.started_at.format("%Y-%m-%d %H:%M:%S"),
        verb,
        format::format_count(report.files_selected()),
        format_size(report.bytes_freed),
        errors,
        format::format_duration(report.duration_secs).dimmed()
    );
}

/// Print the effective configuration
pub fn print_config(config: &SweepConfig) {
    format::print_header("agesweep Configuration");

    if config.directories().is_empty() {
        format::print_kv("directories", &"(none, nothing will run)".yellow().to_string());
    } else {
        for dir in config.directories() {
            format::print_kv("directory", &format_path(dir));
        }
    }
    format::print_kv(
        "age",
        &format!("{} ({}s)", format_age(config.age_secs()), config.age_secs()),
    );
    let interval = if config.check_interval_secs() == 0 {
        "single pass".to_string()
    } else {
        format!(
            "{} ({}s)",
            format_age(config.check_interval_secs() as i64),
            config.check_interval_secs()
        )
    };
    format::print_kv("check interval", &interval);
    format::print_kv("recursive", &config.recursive().to_string());
    format::print_kv("include", &join_patterns(config.include(), "(all files)"));
    format::print_kv("exclude", &join_patterns(config.exclude(), "(nothing)"));
    format::print_kv("dry run", &config.dry_run().to_string());
    format::print_kv("overlap", &format!("{:?}", config.overlap()).to_lowercase());
    println!();
}

fn join_patterns(patterns: &[crate::sweeper::Pattern], empty: &str) -> String {
    if patterns.is_empty() {
        empty.to_string()
    } else {
        patterns
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Print `check` verdicts, one per line
pub fn print_check_results(verdicts: &[CheckVerdict]) {
    println!();
    for v in verdicts {
        let label = if v.would_delete {
            "delete".red().bold()
        } else if v.matched {
            "matched".yellow()
        } else {
            "not matched".green()
        };
        let age = v
            .age_secs
            .map(|a| format!(" (age {})", format_age(a)))
            .unwrap_or_default();
        println!("  {:<12} {}{}", label, format_path(&v.path), age.dimmed());
    }
    println!();
}
