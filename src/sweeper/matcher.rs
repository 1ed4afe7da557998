//! Include/exclude selection.
//!
//! A [`Pattern`] is either a literal file name or a regular expression.
//! Literals compare against the final path segment only, so `keep.txt`
//! matches at any depth. Regexes are searched against the whole path, so
//! they can scope a rule to a directory.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::common::errors::ConfigError;

/// A single include or exclude rule
#[derive(Debug, Clone)]
pub enum Pattern {
    /// Exact match against the file name
    Literal(String),
    /// Unanchored search against the full path
    Regex(Regex),
}

impl Pattern {
    /// Parse the textual form: `/expr/` is a regex, anything else a literal.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        match text
            .strip_prefix('/')
            .and_then(|rest| rest.strip_suffix('/'))
        {
            Some(expr) => Self::regex(expr),
            _ => Ok(Pattern::Literal(text.to_string())),
        }
    }

    /// Compile a regex pattern
    pub fn regex(expr: &str) -> Result<Self, ConfigError> {
        Regex::new(expr)
            .map(Pattern::Regex)
            .map_err(|source| ConfigError::InvalidPattern {
                pattern: expr.to_string(),
                source,
            })
    }

    /// Test this pattern against a path
    pub fn is_match(&self, path: &Path) -> bool {
        match self {
            Pattern::Regex(re) => re.is_match(&path.to_string_lossy()),
            Pattern::Literal(name) => path
                .file_name()
                .map(|base| base.to_string_lossy() == name.as_str())
                .unwrap_or(false),
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Literal(name) => write!(f, "{}", name),
            Pattern::Regex(re) => write!(f, "/{}/", re.as_str()),
        }
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Pattern::Literal(a), Pattern::Literal(b)) => a == b,
            (Pattern::Regex(a), Pattern::Regex(b)) => a.as_str() == b.as_str(),
            _ => false,
        }
    }
}

/// Serialized form of a pattern in config files.
///
/// Plain strings follow [`Pattern::parse`]; `{ regex = "..." }` always
/// compiles as a regex.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PatternSpec {
    Text(String),
    Regex { regex: String },
}

impl PatternSpec {
    pub fn compile(&self) -> Result<Pattern, ConfigError> {
        match self {
            PatternSpec::Text(text) => Pattern::parse(text),
            PatternSpec::Regex { regex } => Pattern::regex(regex),
        }
    }
}

impl From<&Pattern> for PatternSpec {
    fn from(pattern: &Pattern) -> Self {
        PatternSpec::Text(pattern.to_string())
    }
}

impl From<&str> for PatternSpec {
    fn from(text: &str) -> Self {
        PatternSpec::Text(text.to_string())
    }
}

impl From<String> for PatternSpec {
    fn from(text: String) -> Self {
        PatternSpec::Text(text)
    }
}

impl From<Pattern> for PatternSpec {
    fn from(pattern: Pattern) -> Self {
        PatternSpec::from(&pattern)
    }
}

/// Decide whether `path` is selected for deletion consideration.
///
/// Inclusion is evaluated first; exclusion always wins over inclusion.
pub fn matches(path: &Path, include: &[Pattern], exclude: &[Pattern]) -> bool {
    if include.is_empty() && exclude.is_empty() {
        return true;
    }

    let included = include.is_empty() || include.iter().any(|p| p.is_match(path));
    if !included {
        return false;
    }

    !exclude.iter().any(|p| p.is_match(path))
}
