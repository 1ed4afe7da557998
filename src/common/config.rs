use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::errors::ConfigError;
use super::format::parse_duration_secs;
use super::safety;
use crate::sweeper::matcher::{Pattern, PatternSpec};

/// Default age threshold: 7 days
pub const DEFAULT_AGE_SECS: i64 = 86400 * 7;

/// Default interval between passes: 1 day
pub const DEFAULT_CHECK_INTERVAL_SECS: u64 = 86400;

/// What to do when a timer tick fires while a previous pass is running
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
    /// Skip the tick and emit a `PassSkipped` event
    #[default]
    Skip,
    /// Start another pass concurrently with the running one
    Allow,
}

/// Fully-resolved, validated configuration for a sweep.
///
/// Only obtainable through [`SweepConfigBuilder::build`], so every value
/// handed to the sweeper or scheduler has already passed validation.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    directories: Vec<PathBuf>,
    age_secs: i64,
    check_interval_secs: u64,
    recursive: bool,
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
    verbose: bool,
    dry_run: bool,
    overlap: OverlapPolicy,
}

impl SweepConfig {
    pub fn builder() -> SweepConfigBuilder {
        SweepConfigBuilder::default()
    }

    /// Root directories, in scan order
    pub fn directories(&self) -> &[PathBuf] {
        &self.directories
    }

    /// Files strictly older than this many seconds are candidates
    pub fn age_secs(&self) -> i64 {
        self.age_secs
    }

    pub fn check_interval_secs(&self) -> u64 {
        self.check_interval_secs
    }

    /// Interval between passes, or `None` when only a single pass runs
    pub fn check_interval(&self) -> Option<Duration> {
        (self.check_interval_secs > 0).then(|| Duration::from_secs(self.check_interval_secs))
    }

    pub fn recursive(&self) -> bool {
        self.recursive
    }

    pub fn include(&self) -> &[Pattern] {
        &self.include
    }

    pub fn exclude(&self) -> &[Pattern] {
        &self.exclude
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn overlap(&self) -> OverlapPolicy {
        self.overlap
    }

    /// Serializable view of this configuration
    pub fn to_file(&self) -> ConfigFile {
        ConfigFile {
            directories: self
                .directories
                .iter()
                .map(|d| d.display().to_string())
                .collect(),
            age: Some(DurationValue::Seconds(self.age_secs)),
            check_interval: Some(DurationValue::Seconds(self.check_interval_secs as i64)),
            recursive: Some(self.recursive),
            include: self.include.iter().map(PatternSpec::from).collect(),
            exclude: self.exclude.iter().map(PatternSpec::from).collect(),
            verbose: Some(self.verbose),
            dry_run: Some(self.dry_run),
            overlap: Some(self.overlap),
        }
    }
}

/// Applies defaults once and validates on [`build`](Self::build)
#[derive(Debug, Clone)]
pub struct SweepConfigBuilder {
    directories: Vec<String>,
    age_secs: i64,
    check_interval_secs: u64,
    recursive: bool,
    include: Vec<PatternSpec>,
    exclude: Vec<PatternSpec>,
    verbose: bool,
    dry_run: bool,
    overlap: OverlapPolicy,
}

impl Default for SweepConfigBuilder {
    fn default() -> Self {
        Self {
            directories: Vec::new(),
            age_secs: DEFAULT_AGE_SECS,
            check_interval_secs: DEFAULT_CHECK_INTERVAL_SECS,
            recursive: false,
            include: Vec::new(),
            exclude: Vec::new(),
            verbose: false,
            dry_run: false,
            overlap: OverlapPolicy::default(),
        }
    }
}

impl SweepConfigBuilder {
    /// Add a root directory. `~` and glob patterns are expanded at build time.
    pub fn directory(mut self, path: impl AsRef<Path>) -> Self {
        self.directories
            .push(path.as_ref().to_string_lossy().into_owned());
        self
    }

    pub fn directories<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        for path in paths {
            self = self.directory(path);
        }
        self
    }

    pub fn age_secs(mut self, secs: i64) -> Self {
        self.age_secs = secs;
        self
    }

    pub fn check_interval_secs(mut self, secs: u64) -> Self {
        self.check_interval_secs = secs;
        self
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Add an include pattern (`name` literal or `/regex/`)
    pub fn include(mut self, pattern: impl Into<PatternSpec>) -> Self {
        self.include.push(pattern.into());
        self
    }

    /// Add an exclude pattern (`name` literal or `/regex/`)
    pub fn exclude(mut self, pattern: impl Into<PatternSpec>) -> Self {
        self.exclude.push(pattern.into());
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn overlap(mut self, overlap: OverlapPolicy) -> Self {
        self.overlap = overlap;
        self
    }

    /// Validate and resolve into a [`SweepConfig`]
    pub fn build(self) -> Result<SweepConfig, ConfigError> {
        if self.age_secs < 0 {
            return Err(ConfigError::NegativeAge {
                age_secs: self.age_secs,
            });
        }

        let include = self
            .include
            .iter()
            .map(PatternSpec::compile)
            .collect::<Result<Vec<_>, _>>()?;
        let exclude = self
            .exclude
            .iter()
            .map(PatternSpec::compile)
            .collect::<Result<Vec<_>, _>>()?;

        let directories = expand_paths(&self.directories)?;
        if let Some(path) = directories.iter().find(|d| safety::is_protected(d)) {
            return Err(ConfigError::ProtectedRoot { path: path.clone() });
        }

        Ok(SweepConfig {
            directories,
            age_secs: self.age_secs,
            check_interval_secs: self.check_interval_secs,
            recursive: self.recursive,
            include,
            exclude,
            verbose: self.verbose,
            dry_run: self.dry_run,
            overlap: self.overlap,
        })
    }
}

/// Expand `~` and glob patterns in root paths.
///
/// A path that exists as written is taken literally, even if it contains
/// glob metacharacters. A glob that matches nothing contributes no roots.
pub fn expand_paths(paths: &[String]) -> Result<Vec<PathBuf>, ConfigError> {
    let home = dirs::home_dir();
    let mut expanded = Vec::new();

    for path_str in paths {
        let resolved = match (path_str.strip_prefix('~'), &home) {
            (Some(rest), Some(home)) if rest.is_empty() || rest.starts_with('/') => {
                format!("{}{}", home.display(), rest)
            }
            _ => path_str.clone(),
        };

        if resolved.contains(['*', '?', '[']) && !Path::new(&resolved).exists() {
            let entries = glob::glob(&resolved).map_err(|e| ConfigError::InvalidGlob {
                pattern: resolved.clone(),
                message: e.msg.to_string(),
            })?;
            expanded.extend(entries.filter_map(|e| e.ok()));
        } else {
            expanded.push(PathBuf::from(resolved));
        }
    }

    Ok(expanded)
}

/// A duration written either as integer seconds or as `"7d"`-style text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DurationValue {
    Seconds(i64),
    Text(String),
}

impl DurationValue {
    pub fn to_secs(&self) -> Result<i64, ConfigError> {
        match self {
            DurationValue::Seconds(secs) => Ok(*secs),
            DurationValue::Text(text) => parse_duration_secs(text),
        }
    }
}

/// On-disk configuration (`~/.agesweep/config.toml`).
///
/// Every field is optional; missing values fall back to the builder defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub directories: Vec<String>,
    pub age: Option<DurationValue>,
    pub check_interval: Option<DurationValue>,
    pub recursive: Option<bool>,
    pub include: Vec<PatternSpec>,
    pub exclude: Vec<PatternSpec>,
    pub verbose: Option<bool>,
    pub dry_run: Option<bool>,
    pub overlap: Option<OverlapPolicy>,
}

impl ConfigFile {
    /// Get the agesweep data directory (~/.agesweep)
    pub fn data_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join(".agesweep")
    }

    /// Get the default config file path
    pub fn default_path() -> PathBuf {
        Self::data_dir().join("config.toml")
    }

    /// Load the file at `path`
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &contents)
    }

    /// Load from `path` if given, else the default location if it exists,
    /// else an empty file.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let path = Self::default_path();
                if path.exists() {
                    Self::load(&path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn parse(path: &Path, contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Seed a builder from this file's values
    pub fn into_builder(self) -> Result<SweepConfigBuilder, ConfigError> {
        let mut builder = SweepConfig::builder().directories(&self.directories);

        if let Some(age) = &self.age {
            builder = builder.age_secs(age.to_secs()?);
        }
        if let Some(interval) = &self.check_interval {
            let secs = interval.to_secs()?;
            let secs = u64::try_from(secs).map_err(|_| ConfigError::InvalidDuration {
                value: secs.to_string(),
            })?;
            builder = builder.check_interval_secs(secs);
        }
        if let Some(recursive) = self.recursive {
            builder = builder.recursive(recursive);
        }
        for pattern in self.include {
            builder = builder.include(pattern);
        }
        for pattern in self.exclude {
            builder = builder.exclude(pattern);
        }
        if let Some(verbose) = self.verbose {
            builder = builder.verbose(verbose);
        }
        if let Some(dry_run) = self.dry_run {
            builder = builder.dry_run(dry_run);
        }
        if let Some(overlap) = self.overlap {
            builder = builder.overlap(overlap);
        }

        Ok(builder)
    }

    /// Serialize to pretty TOML
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}
