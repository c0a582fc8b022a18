use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for version parsing
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    #[error("Invalid version string \"{0}\"")]
    InvalidVersion(String),
    #[error("Invalid qualifier \"{qualifier}\" in version \"{version}\"")]
    InvalidQualifier { version: String, qualifier: String },
    #[error("Invalid version range \"{0}\"")]
    InvalidRange(String),
}

lazy_static! {
    static ref SEGMENT_RE: Regex = Regex::new(r"^\d+$").unwrap();
    static ref QUALIFIER_RE: Regex = Regex::new(r"^[A-Za-z0-9_-]+$").unwrap();
}

/// An ordered, totally comparable version value.
///
/// A version is a non-empty sequence of numeric segments plus an optional
/// qualifier. Comparison is segment-wise with missing segments treated as
/// zero; qualifiers compare lexicographically and an absent qualifier
/// orders below any present one.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
pub struct Version {
    segments: Vec<u64>,
    qualifier: Option<String>,
}

impl Version {
    /// Create a version from numeric segments, without a qualifier.
    pub fn new(segments: Vec<u64>) -> Self {
        Self {
            segments,
            qualifier: None,
        }
    }

    /// Create a version from numeric segments and a qualifier.
    pub fn with_qualifier(segments: Vec<u64>, qualifier: impl Into<String>) -> Self {
        Self {
            segments,
            qualifier: Some(qualifier.into()),
        }
    }

    /// Parse a version string like `1.2.3` or `1.2.3.rc1`.
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(VersionError::InvalidVersion(input.to_string()));
        }

        let mut segments = Vec::new();
        let mut qualifier = None;

        let parts: Vec<&str> = trimmed.split('.').collect();
        for (i, part) in parts.iter().enumerate() {
            if SEGMENT_RE.is_match(part) {
                if qualifier.is_some() {
                    // Numeric segment after the qualifier
                    return Err(VersionError::InvalidVersion(input.to_string()));
                }
                let value = part
                    .parse::<u64>()
                    .map_err(|_| VersionError::InvalidVersion(input.to_string()))?;
                segments.push(value);
            } else {
                // Only the final part may be a qualifier, and only after at
                // least one numeric segment
                if i + 1 != parts.len() || segments.is_empty() {
                    return Err(VersionError::InvalidVersion(input.to_string()));
                }
                if !QUALIFIER_RE.is_match(part) {
                    return Err(VersionError::InvalidQualifier {
                        version: input.to_string(),
                        qualifier: part.to_string(),
                    });
                }
                qualifier = Some(part.to_string());
            }
        }

        if segments.is_empty() {
            return Err(VersionError::InvalidVersion(input.to_string()));
        }

        Ok(Self {
            segments,
            qualifier,
        })
    }

    /// The numeric segments of this version.
    pub fn segments(&self) -> &[u64] {
        &self.segments
    }

    /// The qualifier, if any.
    pub fn qualifier(&self) -> Option<&str> {
        self.qualifier.as_deref()
    }

    /// Segment at the given index, zero when absent.
    fn segment(&self, index: usize) -> u64 {
        self.segments.get(index).copied().unwrap_or(0)
    }
}

// Equality and hashing must agree with `cmp`: trailing zero segments do
// not distinguish versions (`1` == `1.0.0`).
impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl std::hash::Hash for Version {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        let significant = self
            .segments
            .iter()
            .rposition(|&s| s != 0)
            .map_or(0, |i| i + 1);
        self.segments[..significant].hash(state);
        self.qualifier.hash(state);
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.segments.len().max(other.segments.len());
        for i in 0..len {
            match self.segment(i).cmp(&other.segment(i)) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }
        match (&self.qualifier, &other.qualifier) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(a), Some(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<String> = self.segments.iter().map(|s| s.to_string()).collect();
        write!(f, "{}", joined.join("."))?;
        if let Some(q) = &self.qualifier {
            write!(f, ".{}", q)?;
        }
        Ok(())
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
