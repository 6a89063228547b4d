//! Version Scheme
//!
//! Generic version ordering plus range and constraint parsing.
//!
//! ## Ordering
//!
//! A version is split into segments at `.`, `-`, `_` and at every
//! transition between digits and letters. Numeric segments compare
//! numerically and outrank qualifiers. Qualifiers order as
//!
//! | qualifier | aliases |
//! |-----------|---------|
//! | alpha | `a` |
//! | beta | `b` |
//! | milestone | `m` |
//! | rc | `cr` |
//! | snapshot | |
//! | *(release)* | `ga`, `final`, `release`, empty |
//! | sp | |
//! | anything else | compared lexically |
//!
//! Trailing zero and release segments are insignificant, so `1`, `1.0` and
//! `1.0.0-ga` are the same version.
//!
//! ## Ranges
//!
//! `[1.0,2.0)`, `(,1.5]`, `[2.0,)`, `[1.3]` (exact) and comma separated
//! unions such as `[1.0,1.2),[1.5,)`. A constraint that is not a range is a
//! single preferred version.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use thiserror::Error;

use crate::artifact::{base_version, is_snapshot_version};

/// Malformed version, range or constraint text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionParseError {
    #[error("empty version string")]
    Empty,

    #[error("invalid version range '{input}': {reason}")]
    InvalidRange { input: String, reason: String },
}

impl VersionParseError {
    fn range(input: &str, reason: impl Into<String>) -> Self {
        Self::InvalidRange {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

// ============================================================================
// Version
// ============================================================================

const RELEASE_RANK: u8 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct Qualifier {
    rank: u8,
    /// Only set for unknown qualifiers (rank 7)
    text: String,
}

// Variant order matters: any number outranks any qualifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
enum Item {
    Qualifier(Qualifier),
    Number(u64),
}

impl Item {
    fn is_null(&self) -> bool {
        match self {
            Item::Number(n) => *n == 0,
            Item::Qualifier(q) => q.rank == RELEASE_RANK,
        }
    }

    /// Compare against a missing segment.
    fn cmp_null(&self) -> Ordering {
        match self {
            Item::Number(n) => n.cmp(&0),
            Item::Qualifier(q) => q.rank.cmp(&RELEASE_RANK),
        }
    }
}

fn qualifier(token: &str) -> Qualifier {
    let rank = match token {
        "a" | "alpha" => 0,
        "b" | "beta" => 1,
        "m" | "milestone" => 2,
        "rc" | "cr" => 3,
        "snapshot" => 4,
        "" | "ga" | "final" | "release" => RELEASE_RANK,
        "sp" => 6,
        _ => 7,
    };
    Qualifier {
        rank,
        text: if rank == 7 {
            token.to_string()
        } else {
            String::new()
        },
    }
}

fn tokenize(text: &str) -> Vec<Item> {
    let lower = text.to_lowercase();
    let mut items = Vec::new();
    let mut token = String::new();
    let mut digits = false;

    fn flush(token: &mut String, digits: bool, items: &mut Vec<Item>) {
        if token.is_empty() {
            return;
        }
        let item = if digits {
            Item::Number(token.parse().unwrap_or(u64::MAX))
        } else {
            Item::Qualifier(qualifier(token))
        };
        items.push(item);
        token.clear();
    }

    for ch in lower.chars() {
        if matches!(ch, '.' | '-' | '_') {
            flush(&mut token, digits, &mut items);
            continue;
        }
        let is_digit = ch.is_ascii_digit();
        if !token.is_empty() && is_digit != digits {
            flush(&mut token, digits, &mut items);
        }
        digits = is_digit;
        token.push(ch);
    }
    flush(&mut token, digits, &mut items);

    while items.last().is_some_and(Item::is_null) {
        items.pop();
    }
    items
}

/// A concrete, comparable version.
#[derive(Debug, Clone)]
pub struct Version {
    text: String,
    items: Vec<Item>,
}

impl Version {
    /// Parse a version. Any non-empty text is a valid version.
    pub fn parse(text: &str) -> Result<Self, VersionParseError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(VersionParseError::Empty);
        }
        Ok(Self {
            text: text.to_string(),
            items: tokenize(text),
        })
    }

    /// The version as written.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_snapshot(&self) -> bool {
        is_snapshot_version(&self.text)
    }

    /// Snapshot timestamp folded back to `SNAPSHOT`.
    pub fn base_version(&self) -> String {
        base_version(&self.text)
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.items.hash(state);
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.items.len().max(other.items.len());
        for i in 0..len {
            let ord = match (self.items.get(i), other.items.get(i)) {
                (Some(a), Some(b)) => a.cmp(b),
                (Some(a), None) => a.cmp_null(),
                (None, Some(b)) => b.cmp_null().reverse(),
                (None, None) => Ordering::Equal,
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl FromStr for Version {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// ============================================================================
// Ranges
// ============================================================================

/// One end of a range.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Bound {
    pub version: Version,
    pub inclusive: bool,
}

impl Bound {
    /// A snapshot bound admits snapshots of the same base version even
    /// when the bound is exclusive.
    fn admits_snapshot(&self, version: &Version) -> bool {
        self.version.is_snapshot()
            && version.is_snapshot()
            && self.version.base_version() == version.base_version()
    }
}

/// A contiguous interval of versions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionRange {
    lower: Option<Bound>,
    upper: Option<Bound>,
}

impl VersionRange {
    /// Parse a single bracketed range such as `[1.0,2.0)`.
    pub fn parse(input: &str) -> Result<Self, VersionParseError> {
        let input = input.trim();
        let lower_inclusive = match input.chars().next() {
            Some('[') => true,
            Some('(') => false,
            _ => return Err(VersionParseError::range(input, "must start with '[' or '('")),
        };
        let upper_inclusive = match input.chars().last() {
            Some(']') => true,
            Some(')') => false,
            _ => return Err(VersionParseError::range(input, "must end with ']' or ')'")),
        };
        if input.len() < 2 {
            return Err(VersionParseError::range(input, "missing bounds"));
        }
        let inner = input[1..input.len() - 1].trim();

        let Some((low, high)) = inner.split_once(',') else {
            if !lower_inclusive || !upper_inclusive {
                return Err(VersionParseError::range(
                    input,
                    "single version must be enclosed in []",
                ));
            }
            let version = Version::parse(inner)
                .map_err(|_| VersionParseError::range(input, "empty range"))?;
            return Ok(Self::exactly(version));
        };

        if high.contains(',') {
            return Err(VersionParseError::range(input, "too many bounds"));
        }

        let parse_bound = |text: &str, inclusive: bool| -> Option<Bound> {
            Version::parse(text)
                .ok()
                .map(|version| Bound { version, inclusive })
        };
        let lower = parse_bound(low, lower_inclusive);
        let upper = parse_bound(high, upper_inclusive);

        if let (Some(l), Some(u)) = (&lower, &upper) {
            match l.version.cmp(&u.version) {
                Ordering::Greater => {
                    return Err(VersionParseError::range(
                        input,
                        "lower bound is greater than upper bound",
                    ))
                }
                Ordering::Equal if !(l.inclusive && u.inclusive) => {
                    return Err(VersionParseError::range(input, "range is empty"))
                }
                _ => {}
            }
        }

        Ok(Self { lower, upper })
    }

    /// The range `[version]`.
    pub fn exactly(version: Version) -> Self {
        Self {
            lower: Some(Bound {
                version: version.clone(),
                inclusive: true,
            }),
            upper: Some(Bound {
                version,
                inclusive: true,
            }),
        }
    }

    pub fn lower(&self) -> Option<&Bound> {
        self.lower.as_ref()
    }

    pub fn upper(&self) -> Option<&Bound> {
        self.upper.as_ref()
    }

    /// Whether `version` lies within this range.
    pub fn contains(&self, version: &Version) -> bool {
        if let Some(lower) = &self.lower {
            let ok = match lower.version.cmp(version) {
                Ordering::Less => true,
                Ordering::Equal => lower.inclusive,
                Ordering::Greater => false,
            };
            if !ok && !lower.admits_snapshot(version) {
                return false;
            }
        }
        if let Some(upper) = &self.upper {
            let ok = match version.cmp(&upper.version) {
                Ordering::Less => true,
                Ordering::Equal => upper.inclusive,
                Ordering::Greater => false,
            };
            if !ok && !upper.admits_snapshot(version) {
                return false;
            }
        }
        true
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let (Some(l), Some(u)) = (&self.lower, &self.upper) {
            if l.inclusive && u.inclusive && l.version == u.version {
                return write!(f, "[{}]", l.version);
            }
        }
        match &self.lower {
            Some(b) => write!(f, "{}{}", if b.inclusive { '[' } else { '(' }, b.version)?,
            None => write!(f, "(")?,
        }
        write!(f, ",")?;
        match &self.upper {
            Some(b) => write!(f, "{}{}", b.version, if b.inclusive { ']' } else { ')' }),
            None => write!(f, ")"),
        }
    }
}

// ============================================================================
// Constraint
// ============================================================================

/// A parsed version requirement: one preferred version or a union of ranges.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionConstraint {
    preferred: Option<Version>,
    ranges: Vec<VersionRange>,
}

impl VersionConstraint {
    /// Parse a constraint string.
    pub fn parse(input: &str) -> Result<Self, VersionParseError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(VersionParseError::Empty);
        }
        if !input.starts_with('[') && !input.starts_with('(') {
            if input.contains(['[', ']', '(', ')', ',']) {
                return Err(VersionParseError::range(
                    input,
                    "unbalanced range delimiters",
                ));
            }
            return Ok(Self::preferred(Version::parse(input)?));
        }

        let mut ranges = Vec::new();
        let mut rest = input;
        while !rest.is_empty() {
            let Some(close) = rest.find([']', ')']) else {
                return Err(VersionParseError::range(input, "unterminated range"));
            };
            ranges.push(VersionRange::parse(&rest[..=close])?);
            rest = rest[close + 1..].trim_start();
            if let Some(next) = rest.strip_prefix(',') {
                rest = next.trim_start();
                if rest.is_empty() {
                    return Err(VersionParseError::range(input, "trailing ','"));
                }
            } else if !rest.is_empty() {
                return Err(VersionParseError::range(
                    input,
                    "ranges must be separated by ','",
                ));
            }
        }
        Ok(Self {
            preferred: None,
            ranges,
        })
    }

    /// A constraint accepting exactly `version`.
    pub fn preferred(version: Version) -> Self {
        Self {
            preferred: Some(version),
            ranges: Vec::new(),
        }
    }

    pub fn preferred_version(&self) -> Option<&Version> {
        self.preferred.as_ref()
    }

    pub fn ranges(&self) -> &[VersionRange] {
        &self.ranges
    }

    /// Whether this constraint is a range (as opposed to a pinned version).
    pub fn is_range(&self) -> bool {
        !self.ranges.is_empty()
    }

    /// Whether `version` is in this constraint's accepted set.
    pub fn contains(&self, version: &Version) -> bool {
        if self.ranges.is_empty() {
            return self.preferred.as_ref() == Some(version);
        }
        self.ranges.iter().any(|r| r.contains(version))
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(v) = &self.preferred {
            return write!(f, "{v}");
        }
        for (i, range) in self.ranges.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{range}")?;
        }
        Ok(())
    }
}

impl FromStr for VersionConstraint {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
