use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while building a sweep configuration.
///
/// These are fatal to the call that produced them and never reach an
/// event sink. The CLI wraps them in `anyhow` at the top level.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The age threshold was negative
    #[error("The age option must be a positive number (got {age_secs}s)")]
    NegativeAge { age_secs: i64 },

    /// A `/regex/` pattern failed to compile
    #[error("Invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A duration string could not be parsed
    #[error("Invalid duration '{value}': expected seconds or a number with s/m/h/d/w suffix")]
    InvalidDuration { value: String },

    /// A root directory is a system-critical path
    #[error("Refusing to sweep protected path: '{}'", path.display())]
    ProtectedRoot { path: PathBuf },

    /// A glob in a root directory was malformed
    #[error("Invalid glob '{pattern}': {message}")]
    InvalidGlob { pattern: String, message: String },

    /// The config file could not be read
    #[error("Failed to read config '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML for this schema
    #[error("Config error in '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Recoverable failures observed during a pass.
///
/// Every variant carries the path it concerns. They are delivered through
/// [`crate::sweeper::SweepEvent`], never returned from a pass.
#[derive(Debug, Error)]
pub enum SweepError {
    /// A directory's entries could not be enumerated
    #[error("Cannot list directory '{}': {source}", path.display())]
    Listing {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Metadata for an entry could not be read
    #[error("Cannot stat '{}': {source}", path.display())]
    Stat {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Unlinking a selected file failed
    #[error("Failed to delete '{}': {source}", path.display())]
    Delete {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A scheduled pass panicked before finishing
    #[error("Scheduled pass aborted: {message}")]
    PassPanicked { message: String },
}

impl SweepError {
    /// The path this error concerns, if any
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            SweepError::Listing { path, .. }
            | SweepError::Stat { path, .. }
            | SweepError::Delete { path, .. } => Some(path),
            SweepError::PassPanicked { .. } => None,
        }
    }

    /// The underlying I/O error kind, if any
    pub fn io_kind(&self) -> Option<std::io::ErrorKind> {
        match self {
            SweepError::Listing { source, .. }
            | SweepError::Stat { source, .. }
            | SweepError::Delete { source, .. } => Some(source.kind()),
            SweepError::PassPanicked { .. } => None,
        }
    }
}
