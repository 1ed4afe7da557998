use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::common::config::{ConfigFile, DurationValue, OverlapPolicy};
use crate::sweeper::PatternSpec;

/// agesweep: delete old files from a set of directories on a schedule
#[derive(Parser, Debug)]
#[command(
    name = "agesweep",
    version,
    about = "Periodically delete old files from configured directories",
    long_about = "agesweep scans a set of directories and deletes files older than a\n\
                   threshold, filtered by include/exclude rules. Runs once or on a timer.",
    after_help = "PATTERNS:\n  \
        A plain pattern matches the file name exactly (keep.txt).\n  \
        A pattern wrapped in slashes is a regex tested against the full path (/\\.log$/).\n  \
        Excludes always win over includes.\n\n\
        EXAMPLES:\n  \
        agesweep once -d /tmp/sweep --age 1d --dry-run          Preview a single pass\n  \
        agesweep once -d ~/logs -r --include '/\\.log$/'          Delete old .log files recursively\n  \
        agesweep run -d /var/tmp/app --age 7d --interval 1h      Sweep every hour\n  \
        agesweep check /tmp/sweep/keep.txt --exclude keep.txt   Show the include/exclude verdict\n  \
        agesweep config show                                    Show effective configuration"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: ~/.agesweep/config.toml if present)
    #[arg(long, short, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, default_value = "human")]
    pub format: OutputFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Verbose output (per-file progress)
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Quiet mode, minimal output
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sweep now, then repeat every check interval
    Run {
        #[command(flatten)]
        sweep: SweepArgs,
    },

    /// Run exactly one pass and report what happened
    Once {
        #[command(flatten)]
        sweep: SweepArgs,

        /// List every deleted (or would-be deleted) file
        #[arg(long)]
        detailed: bool,
    },

    /// Show whether paths are selected by the include/exclude rules
    Check {
        /// Paths to evaluate
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        #[command(flatten)]
        sweep: SweepArgs,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: CompletionShell,
    },
}

/// Overrides layered on top of the config file
#[derive(Args, Debug, Clone, Default)]
pub struct SweepArgs {
    /// Directory to sweep; repeat for several (replaces the config file list)
    #[arg(long = "dir", short = 'd', value_name = "PATH")]
    pub directories: Vec<String>,

    /// Delete files older than this (seconds, or 30m / 12h / 7d / 2w)
    #[arg(long, value_name = "DURATION", allow_hyphen_values = true)]
    pub age: Option<String>,

    /// Time between passes; 0 runs a single pass
    #[arg(long, value_name = "DURATION")]
    pub interval: Option<String>,

    /// Descend into subdirectories
    #[arg(long, short = 'r')]
    pub recursive: bool,

    /// Only consider files matching this pattern (repeatable)
    #[arg(long, value_name = "PATTERN")]
    pub include: Vec<String>,

    /// Never delete files matching this pattern (repeatable)
    #[arg(long, value_name = "PATTERN")]
    pub exclude: Vec<String>,

    /// Simulate: report what would be deleted without deleting
    #[arg(long)]
    pub dry_run: bool,

    /// Let a new pass start while the previous one is still running
    #[arg(long)]
    pub allow_overlap: bool,
}

impl SweepArgs {
    /// Layer these flags over a loaded config file
    pub fn apply_to(&self, file: &mut ConfigFile) {
        if !self.directories.is_empty() {
            file.directories = self.directories.clone();
        }
        if let Some(age) = &self.age {
            file.age = Some(DurationValue::Text(age.clone()));
        }
        if let Some(interval) = &self.interval {
            file.check_interval = Some(DurationValue::Text(interval.clone()));
        }
        if self.recursive {
            file.recursive = Some(true);
        }
        file.include
            .extend(self.include.iter().cloned().map(PatternSpec::Text));
        file.exclude
            .extend(self.exclude.iter().cloned().map(PatternSpec::Text));
        if self.dry_run {
            file.dry_run = Some(true);
        }
        if self.allow_overlap {
            file.overlap = Some(OverlapPolicy::Allow);
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show {
        #[command(flatten)]
        sweep: SweepArgs,
    },

    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the config file location
    Path,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
    Quiet,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}
