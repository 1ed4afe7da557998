use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::time::SystemTime;
use tracing_subscriber::EnvFilter;

use agesweep::cli::args::{Cli, Commands, ConfigAction, OutputFormat, SweepArgs};
use agesweep::cli::output::{self, CheckVerdict};
use agesweep::common::config::{ConfigFile, SweepConfig};
use agesweep::scheduler::Scheduler;
use agesweep::sweeper::{self, Sweeper, TracingSink};

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    match &cli.command {
        Commands::Run { sweep } => cmd_run(&cli, sweep),
        Commands::Once { sweep, detailed } => cmd_once(&cli, sweep, *detailed),
        Commands::Check { paths, sweep } => cmd_check(&cli, paths, sweep),
        Commands::Config { action } => cmd_config(&cli, action),

        Commands::Completions { shell } => {
            use clap::CommandFactory;
            init_logging(&cli, cli.verbose);
            let mut cmd = Cli::command();
            let shell = match shell {
                agesweep::cli::args::CompletionShell::Bash => clap_complete::Shell::Bash,
                agesweep::cli::args::CompletionShell::Zsh => clap_complete::Shell::Zsh,
                agesweep::cli::args::CompletionShell::Fish => clap_complete::Shell::Fish,
            };
            clap_complete::generate(shell, &mut cmd, "agesweep", &mut std::io::stdout());
            Ok(())
        }
    }
}

/// Filter used when `RUST_LOG` is unset. Verbose wins over quiet.
fn default_filter(verbose: bool, quiet: bool) -> &'static str {
    if verbose {
        "agesweep=debug"
    } else if quiet {
        "agesweep=error"
    } else {
        "agesweep=info"
    }
}

/// Logs go to stderr so JSON on stdout stays machine-readable.
/// `verbose` is the resolved setting, config file included.
fn init_logging(cli: &Cli, verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose, cli.quiet)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(!cli.no_color)
        .init();
}

/// Config file, then command-line overrides, then validation.
/// Logging starts once the effective verbosity is known.
fn load_config(cli: &Cli, sweep: &SweepArgs) -> Result<SweepConfig> {
    let mut file = ConfigFile::load_or_default(cli.config.as_deref())?;
    sweep.apply_to(&mut file);
    if cli.verbose {
        file.verbose = Some(true);
    }
    let config = file.into_builder()?.build()?;
    init_logging(cli, config.verbose());
    Ok(config)
}

// ─── Run ──────────────────────────────────────────────────────────────────────

fn cmd_run(cli: &Cli, sweep: &SweepArgs) -> Result<()> {
    let config = load_config(cli, sweep)?;
    let human = matches!(cli.format, OutputFormat::Human);

    if human && !cli.quiet {
        output::print_config(&config);
    }

    let format = cli.format.clone();
    let quiet = cli.quiet;
    let scheduler = Scheduler::new(config, TracingSink).on_pass_complete(move |report| {
        if quiet {
            return;
        }
        match format {
            OutputFormat::Human => output::print_pass_line(report),
            OutputFormat::Json => {
                if let Err(e) = output::print_pass_json_line(report) {
                    tracing::warn!("Failed to serialize pass report: {}", e);
                }
            }
            OutputFormat::Quiet => output::print_pass_quiet(report),
        }
    });

    match scheduler.start() {
        Some(handle) => handle.wait(),
        None => {
            if human && !cli.quiet {
                println!("  {} No directories configured; nothing to do.", "ℹ️");
            }
        }
    }

    Ok(())
}

// ─── Once ─────────────────────────────────────────────────────────────────────

fn cmd_once(cli: &Cli, sweep: &SweepArgs, detailed: bool) -> Result<()> {
    let config = load_config(cli, sweep)?;

    if config.directories().is_empty() {
        if matches!(cli.format, OutputFormat::Human) && !cli.quiet {
            println!("  {} No directories configured; nothing to do.", "ℹ️");
        }
        return Ok(());
    }

    let report = Sweeper::new(config, TracingSink).run_pass();

    match cli.format {
        OutputFormat::Human => {
            if !cli.quiet {
                output::print_pass_report(&report, detailed);
            }
        }
        OutputFormat::Json => output::print_pass_json(&report)?,
        OutputFormat::Quiet => output::print_pass_quiet(&report),
    }

    Ok(())
}

// ─── Check ────────────────────────────────────────────────────────────────────

fn cmd_check(cli: &Cli, paths: &[std::path::PathBuf], sweep: &SweepArgs) -> Result<()> {
    let config = load_config(cli, sweep)?;
    let now = SystemTime::now();

    let verdicts: Vec<CheckVerdict> = paths
        .iter()
        .map(|path| {
            let matched = sweeper::matches(path, config.include(), config.exclude());
            let age_secs = std::fs::metadata(path)
                .and_then(|m| m.modified())
                .ok()
                .map(|modified| sweeper::age_secs(now, modified));
            CheckVerdict {
                path: path.clone(),
                matched,
                age_secs,
                would_delete: matched && age_secs.is_some_and(|age| age > config.age_secs()),
            }
        })
        .collect();

    match cli.format {
        OutputFormat::Human => output::print_check_results(&verdicts),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&verdicts)?),
        OutputFormat::Quiet => {
            for v in &verdicts {
                println!("{}\t{}", u8::from(v.matched), v.path.display());
            }
        }
    }

    Ok(())
}

// ─── Config ───────────────────────────────────────────────────────────────────

fn cmd_config(cli: &Cli, action: &ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show { sweep } => {
            let config = load_config(cli, sweep)?;
            match cli.format {
                OutputFormat::Human => output::print_config(&config),
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&config.to_file())?)
                }
                OutputFormat::Quiet => print!("{}", config.to_file().to_toml()?),
            }
            Ok(())
        }

        ConfigAction::Init { force } => {
            init_logging(cli, cli.verbose);
            let path = cli.config.clone().unwrap_or_else(ConfigFile::default_path);
            if path.exists() && !force {
                anyhow::bail!(
                    "Config already exists at {} (use --force to overwrite)",
                    path.display()
                );
            }
            if let Some(dir) = path.parent() {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create config dir: {}", dir.display()))?;
            }
            let contents = SweepConfig::builder()
                .build()?
                .to_file()
                .to_toml()
                .context("Failed to serialize config")?;
            std::fs::write(&path, contents)
                .with_context(|| format!("Failed to write config: {}", path.display()))?;

            if !cli.quiet {
                println!("  {} Wrote {}", "✓".green(), path.display());
            }
            Ok(())
        }

        ConfigAction::Path => {
            init_logging(cli, cli.verbose);
            let path = cli.config.clone().unwrap_or_else(ConfigFile::default_path);
            println!("{}", path.display());
            Ok(())
        }
    }
}
