use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::version::{Version, VersionError};

/// An interval of versions with independently inclusive or exclusive
/// bounds. An unbounded side matches everything on that side; an empty
/// range matches nothing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionRange {
    lower: Option<Version>,
    lower_inclusive: bool,
    upper: Option<Version>,
    upper_inclusive: bool,
}

impl VersionRange {
    pub fn new(
        lower: Option<Version>,
        lower_inclusive: bool,
        upper: Option<Version>,
        upper_inclusive: bool,
    ) -> Self {
        Self {
            lower,
            lower_inclusive,
            upper,
            upper_inclusive,
        }
    }

    /// The range matching every version.
    pub fn any() -> Self {
        Self::new(None, true, None, true)
    }

    /// The range `[v, v]` matching exactly one version.
    pub fn exact(version: Version) -> Self {
        Self::new(Some(version.clone()), true, Some(version), true)
    }

    /// The range `[v, infinity)`.
    pub fn at_least(version: Version) -> Self {
        Self::new(Some(version), true, None, true)
    }

    /// The range matching nothing.
    pub fn none() -> Self {
        let zero = Version::new(vec![0]);
        Self::new(Some(zero.clone()), false, Some(zero), false)
    }

    /// Parse a range from interval syntax (`[1.0,2.0)`), a bare version
    /// (meaning `[v, infinity)`), or `*` / empty (meaning any version).
    /// An empty bound inside the interval syntax means unbounded on that
    /// side.
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let trimmed = input.trim();
        if trimmed.is_empty() || trimmed == "*" {
            return Ok(Self::any());
        }

        let first = trimmed.chars().next().unwrap();
        if first != '[' && first != '(' {
            // Bare version: minimum bound
            return Ok(Self::at_least(Version::parse(trimmed)?));
        }

        let last = trimmed.chars().last().unwrap();
        if last != ']' && last != ')' {
            return Err(VersionError::InvalidRange(input.to_string()));
        }

        let inner = &trimmed[1..trimmed.len() - 1];
        let (lower_text, upper_text) = inner
            .split_once(',')
            .ok_or_else(|| VersionError::InvalidRange(input.to_string()))?;

        let lower = match lower_text.trim() {
            "" => None,
            text => Some(Version::parse(text)?),
        };
        let upper = match upper_text.trim() {
            "" => None,
            text => Some(Version::parse(text)?),
        };

        Ok(Self::new(lower, first == '[', upper, last == ']'))
    }

    pub fn lower(&self) -> Option<&Version> {
        self.lower.as_ref()
    }

    pub fn lower_inclusive(&self) -> bool {
        self.lower_inclusive
    }

    pub fn upper(&self) -> Option<&Version> {
        self.upper.as_ref()
    }

    pub fn upper_inclusive(&self) -> bool {
        self.upper_inclusive
    }

    /// Whether no version can satisfy this range.
    pub fn is_empty(&self) -> bool {
        match (&self.lower, &self.upper) {
            (Some(lo), Some(hi)) => {
                if lo > hi {
                    return true;
                }
                lo == hi && !(self.lower_inclusive && self.upper_inclusive)
            }
            _ => false,
        }
    }

    /// Whether the version lies inside this range.
    pub fn contains(&self, version: &Version) -> bool {
        if self.is_empty() {
            return false;
        }
        if let Some(lo) = &self.lower {
            if version < lo || (version == lo && !self.lower_inclusive) {
                return false;
            }
        }
        if let Some(hi) = &self.upper {
            if version > hi || (version == hi && !self.upper_inclusive) {
                return false;
            }
        }
        true
    }
}

impl Default for VersionRange {
    fn default() -> Self {
        Self::any()
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", if self.lower_inclusive { '[' } else { '(' })?;
        if let Some(lo) = &self.lower {
            write!(f, "{}", lo)?;
        }
        write!(f, ",")?;
        if let Some(hi) = &self.upper {
            write!(f, "{}", hi)?;
        }
        write!(f, "{}", if self.upper_inclusive { ']' } else { ')' })
    }
}

impl FromStr for VersionRange {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(text: &str) -> Version {
        Version::parse(text).unwrap()
    }

    #[test]
    fn test_parse_closed_interval() {
        let range = VersionRange::parse("[1.0.0,2.0.0]").unwrap();
        assert!(range.contains(&v("1.0.0")));
        assert!(range.contains(&v("1.5")));
        assert!(range.contains(&v("2.0.0")));
        assert!(!range.contains(&v("2.0.1")));
    }

    #[test]
    fn test_parse_half_open_interval() {
        let range = VersionRange::parse("[1.0.0,2.0.0)").unwrap();
        assert!(range.contains(&v("1.0.0")));
        assert!(!range.contains(&v("2.0.0")));
    }

    #[test]
    fn test_parse_exclusive_lower() {
        let range = VersionRange::parse("(1.0.0,2.0.0]").unwrap();
        assert!(!range.contains(&v("1.0.0")));
        assert!(range.contains(&v("1.0.1")));
        assert!(range.contains(&v("2.0.0")));
    }

    #[test]
    fn test_bare_version_is_minimum() {
        let range = VersionRange::parse("1.5.0").unwrap();
        assert!(!range.contains(&v("1.4.9")));
        assert!(range.contains(&v("1.5.0")));
        assert!(range.contains(&v("99.0")));
    }

    #[test]
    fn test_any() {
        let range = VersionRange::parse("*").unwrap();
        assert!(range.contains(&v("0.0.1")));
        assert!(range.contains(&v("100.200.300")));
        assert_eq!(VersionRange::parse("").unwrap(), VersionRange::any());
    }

    #[test]
    fn test_unbounded_side() {
        let range = VersionRange::parse("[2.0,)").unwrap();
        assert!(!range.contains(&v("1.9")));
        assert!(range.contains(&v("2.0")));
        assert!(range.contains(&v("50.0")));

        let range = VersionRange::parse("(,2.0)").unwrap();
        assert!(range.contains(&v("0.1")));
        assert!(!range.contains(&v("2.0")));
    }

    #[test]
    fn test_exact() {
        let range = VersionRange::exact(v("1.0.0"));
        assert!(range.contains(&v("1.0.0")));
        assert!(!range.contains(&v("1.0.1")));
        assert_eq!(range, VersionRange::parse("[1.0.0,1.0.0]").unwrap());
    }

    #[test]
    fn test_empty_range_matches_nothing() {
        let inverted = VersionRange::new(Some(v("2.0")), true, Some(v("1.0")), true);
        assert!(inverted.is_empty());
        assert!(!inverted.contains(&v("1.5")));

        let degenerate = VersionRange::new(Some(v("1.0")), true, Some(v("1.0")), false);
        assert!(degenerate.is_empty());
        assert!(!degenerate.contains(&v("1.0")));

        assert!(VersionRange::none().is_empty());
    }

    #[test]
    fn test_parse_invalid() {
        assert!(VersionRange::parse("[1.0,2.0").is_err());
        assert!(VersionRange::parse("[1.0 2.0]").is_err());
        assert!(VersionRange::parse("[x,y]").is_err());
    }

    #[test]
    fn test_display_round_trip() {
        for text in ["[1.0.0,2.0.0)", "(1.0,2.0]", "[1.0,]"] {
            let range = VersionRange::parse(text).unwrap();
            assert_eq!(VersionRange::parse(&range.to_string()).unwrap(), range);
        }
    }
}
