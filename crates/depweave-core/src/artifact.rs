//! Artifact coordinates, dependencies, exclusions and repositories.
//!
//! All types here are immutable values. "Setters" return a fresh value and
//! leave the receiver untouched; sharing of equal values is the job of the
//! [`InternPool`](crate::pool::InternPool).

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Extension used when a coordinate does not name one.
pub const DEFAULT_EXTENSION: &str = "jar";

/// Scope used when a dependency does not name one.
pub const DEFAULT_SCOPE: &str = "compile";

const SNAPSHOT: &str = "SNAPSHOT";

/// Matches timestamped snapshot versions such as `1.0-20240101.120000-3`.
static TIMESTAMPED_SNAPSHOT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.*-)?(\d{8}\.\d{6})-(\d+)$").expect("valid snapshot pattern"));

/// Errors raised when parsing the textual form of a coordinate or exclusion.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoordinateParseError {
    /// Wrong number of `:` separated segments
    #[error("bad coordinate '{input}', expected group:name[:extension[:classifier]]:version")]
    BadFormat { input: String },

    /// A required segment is empty
    #[error("bad coordinate '{input}': {field} must not be empty")]
    EmptyField { input: String, field: &'static str },
}

// ============================================================================
// Coordinate
// ============================================================================

/// Fully qualified identity of an artifact.
///
/// `version` holds either a concrete version or a version constraint string
/// (e.g. `[1.0,2.0)`), depending on where in the collection the coordinate
/// is observed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coordinate {
    group: String,
    name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    classifier: String,
    #[serde(default = "default_extension")]
    extension: String,
    version: String,
    /// Pre-built local file; such artifacts have no descriptor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    local_path: Option<PathBuf>,
}

fn default_extension() -> String {
    DEFAULT_EXTENSION.to_string()
}

impl Coordinate {
    /// Create a coordinate with the default extension and no classifier.
    pub fn new(
        group: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
            classifier: String::new(),
            extension: DEFAULT_EXTENSION.to_string(),
            version: version.into(),
            local_path: None,
        }
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn classifier(&self) -> &str {
        &self.classifier
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn local_path(&self) -> Option<&Path> {
        self.local_path.as_deref()
    }

    /// Whether this artifact is a local file without a descriptor.
    pub fn is_local(&self) -> bool {
        self.local_path.is_some()
    }

    /// Copy with a different version.
    pub fn with_version(&self, version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            ..self.clone()
        }
    }

    /// Copy with a different classifier.
    pub fn with_classifier(&self, classifier: impl Into<String>) -> Self {
        Self {
            classifier: classifier.into(),
            ..self.clone()
        }
    }

    /// Copy with a different extension.
    pub fn with_extension(&self, extension: impl Into<String>) -> Self {
        Self {
            extension: extension.into(),
            ..self.clone()
        }
    }

    /// Copy marked as a pre-built local file.
    pub fn with_local_path(&self, path: impl Into<PathBuf>) -> Self {
        Self {
            local_path: Some(path.into()),
            ..self.clone()
        }
    }

    /// Whether the version denotes a snapshot (plain or timestamped).
    pub fn is_snapshot(&self) -> bool {
        is_snapshot_version(&self.version)
    }

    /// The version with any snapshot timestamp folded back to `SNAPSHOT`.
    pub fn base_version(&self) -> String {
        base_version(&self.version)
    }

    /// `group:name:extension:classifier`, the identity used by dependency
    /// management and declaration merging.
    pub fn management_key(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            self.group, self.name, self.extension, self.classifier
        )
    }

    /// Whether `other` names the same artifact, ignoring snapshot timestamps.
    ///
    /// This is the identity used for cycle detection.
    pub fn same_identity(&self, other: &Coordinate) -> bool {
        self.name == other.name
            && self.group == other.group
            && self.extension == other.extension
            && self.classifier == other.classifier
            && self.base_version() == other.base_version()
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.name, self.extension)?;
        if !self.classifier.is_empty() {
            write!(f, ":{}", self.classifier)?;
        }
        write!(f, ":{}", self.version)
    }
}

impl FromStr for Coordinate {
    type Err = CoordinateParseError;

    /// Parse `group:name[:extension[:classifier]]:version`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        let (group, name, extension, classifier, version) = match parts.as_slice() {
            [g, n, v] => (*g, *n, DEFAULT_EXTENSION, "", *v),
            [g, n, e, v] => (*g, *n, *e, "", *v),
            [g, n, e, c, v] => (*g, *n, *e, *c, *v),
            _ => {
                return Err(CoordinateParseError::BadFormat {
                    input: s.to_string(),
                })
            }
        };

        for (field, value) in [("group", group), ("name", name), ("version", version)] {
            if value.is_empty() {
                return Err(CoordinateParseError::EmptyField {
                    input: s.to_string(),
                    field,
                });
            }
        }

        Ok(Self {
            group: group.to_string(),
            name: name.to_string(),
            classifier: classifier.to_string(),
            extension: if extension.is_empty() {
                DEFAULT_EXTENSION.to_string()
            } else {
                extension.to_string()
            },
            version: version.to_string(),
            local_path: None,
        })
    }
}

/// Whether a version string denotes a snapshot.
pub fn is_snapshot_version(version: &str) -> bool {
    version.ends_with(SNAPSHOT) || TIMESTAMPED_SNAPSHOT.is_match(version)
}

/// Fold a timestamped snapshot version back to its `-SNAPSHOT` base.
pub fn base_version(version: &str) -> String {
    match TIMESTAMPED_SNAPSHOT.captures(version) {
        Some(caps) => {
            let prefix = caps.get(1).map_or("", |m| m.as_str());
            format!("{prefix}{SNAPSHOT}")
        }
        None => version.to_string(),
    }
}

// ============================================================================
// Exclusion
// ============================================================================

/// Pattern removing matching artifacts from a dependency's subtree.
///
/// Each field may be `*` to match anything.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Exclusion {
    pub group: String,
    pub name: String,
    pub classifier: String,
    pub extension: String,
}

impl Exclusion {
    /// Exclude every classifier and extension of `group:name`.
    pub fn new(group: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
            classifier: "*".to_string(),
            extension: "*".to_string(),
        }
    }

    /// Whether `artifact` is excluded by this pattern.
    pub fn matches(&self, artifact: &Coordinate) -> bool {
        field_matches(&self.name, artifact.name())
            && field_matches(&self.group, artifact.group())
            && field_matches(&self.extension, artifact.extension())
            && field_matches(&self.classifier, artifact.classifier())
    }
}

fn field_matches(pattern: &str, value: &str) -> bool {
    pattern == "*" || pattern == value
}

impl fmt::Display for Exclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.group, self.name, self.extension, self.classifier
        )
    }
}

impl FromStr for Exclusion {
    type Err = CoordinateParseError;

    /// Parse `group:name[:extension[:classifier]]`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        let (group, name, extension, classifier) = match parts.as_slice() {
            [g, n] => (*g, *n, "*", "*"),
            [g, n, e] => (*g, *n, *e, "*"),
            [g, n, e, c] => (*g, *n, *e, *c),
            _ => {
                return Err(CoordinateParseError::BadFormat {
                    input: s.to_string(),
                })
            }
        };
        if group.is_empty() || name.is_empty() {
            return Err(CoordinateParseError::EmptyField {
                input: s.to_string(),
                field: if group.is_empty() { "group" } else { "name" },
            });
        }
        Ok(Self {
            group: group.to_string(),
            name: name.to_string(),
            classifier: classifier.to_string(),
            extension: extension.to_string(),
        })
    }
}

// ============================================================================
// Dependency
// ============================================================================

/// A coordinate plus scope, optionality and exclusions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dependency {
    artifact: Arc<Coordinate>,
    scope: String,
    optional: bool,
    exclusions: Vec<Exclusion>,
}

impl Dependency {
    /// Create a non-optional dependency without exclusions.
    pub fn new(artifact: Coordinate, scope: impl Into<String>) -> Self {
        Self::from_shared(Arc::new(artifact), scope)
    }

    /// Create from an already shared (typically pooled) coordinate.
    pub fn from_shared(artifact: Arc<Coordinate>, scope: impl Into<String>) -> Self {
        Self {
            artifact,
            scope: scope.into(),
            optional: false,
            exclusions: Vec::new(),
        }
    }

    pub fn artifact(&self) -> &Coordinate {
        &self.artifact
    }

    /// The shared coordinate handle.
    pub fn artifact_arc(&self) -> &Arc<Coordinate> {
        &self.artifact
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn exclusions(&self) -> &[Exclusion] {
        &self.exclusions
    }

    pub fn with_artifact(&self, artifact: Coordinate) -> Self {
        self.with_shared_artifact(Arc::new(artifact))
    }

    pub fn with_shared_artifact(&self, artifact: Arc<Coordinate>) -> Self {
        Self {
            artifact,
            ..self.clone()
        }
    }

    pub fn with_scope(&self, scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            ..self.clone()
        }
    }

    pub fn with_optional(&self, optional: bool) -> Self {
        Self {
            optional,
            ..self.clone()
        }
    }

    pub fn with_exclusions(&self, exclusions: Vec<Exclusion>) -> Self {
        Self {
            exclusions,
            ..self.clone()
        }
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}", self.artifact, self.scope)?;
        if self.optional {
            write!(f, ", optional")?;
        }
        write!(f, ")")
    }
}

/// Merge two declaration lists by management key; `dominant` entries win.
pub fn merge_dependencies(dominant: Vec<Dependency>, recessive: &[Dependency]) -> Vec<Dependency> {
    if recessive.is_empty() {
        return dominant;
    }
    let mut merged = dominant;
    let mut keys: std::collections::HashSet<String> = merged
        .iter()
        .map(|d| d.artifact().management_key())
        .collect();
    for dependency in recessive {
        if keys.insert(dependency.artifact().management_key()) {
            merged.push(dependency.clone());
        }
    }
    merged
}

// ============================================================================
// Remote Repository
// ============================================================================

/// A repository artifacts and descriptors are fetched from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RemoteRepository {
    pub id: String,
    pub url: String,
}

impl RemoteRepository {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
        }
    }
}

impl fmt::Display for RemoteRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.url)
    }
}
