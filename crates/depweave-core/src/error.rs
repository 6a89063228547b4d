//! Collection error types.
//!
//! Per-branch failures ([`CollectionError`]) are accumulated while the
//! graph is built and only turned into a raised [`DependencyCollectionError`]
//! once the whole tree has been attempted.

use thiserror::Error;

use crate::artifact::{Coordinate, Dependency};
use crate::collector::CollectResult;
use crate::version::VersionParseError;

/// Failure to turn a dependency's version constraint into a concrete version.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeResolutionError {
    /// The constraint text is not a valid version or range
    #[error("malformed version constraint '{input}': {reason}")]
    Malformed { input: String, reason: String },

    /// No available version satisfies the constraint
    #[error("no versions available for {artifact} within {constraint}")]
    NoVersions {
        artifact: String,
        constraint: String,
    },

    /// The version listing could not be obtained
    #[error("version listing for {artifact} unavailable: {message}")]
    Unavailable { artifact: String, message: String },
}

impl RangeResolutionError {
    pub fn no_versions(artifact: &Coordinate, constraint: impl Into<String>) -> Self {
        Self::NoVersions {
            artifact: artifact.to_string(),
            constraint: constraint.into(),
        }
    }

    pub fn unavailable(artifact: &Coordinate, message: impl Into<String>) -> Self {
        Self::Unavailable {
            artifact: artifact.to_string(),
            message: message.into(),
        }
    }
}

impl From<VersionParseError> for RangeResolutionError {
    fn from(err: VersionParseError) -> Self {
        match err {
            VersionParseError::Empty => Self::Malformed {
                input: String::new(),
                reason: err.to_string(),
            },
            VersionParseError::InvalidRange { input, reason } => Self::Malformed { input, reason },
        }
    }
}

/// Failure to read an artifact descriptor (manifest).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    /// No descriptor exists for the artifact
    #[error("descriptor for {artifact} not found")]
    NotFound { artifact: String },

    /// The descriptor exists but could not be understood
    #[error("invalid descriptor for {artifact}: {message}")]
    Invalid { artifact: String, message: String },

    /// Following relocations revisited an artifact
    #[error("relocation cycle at {artifact}: {}", chain.join(" -> "))]
    RelocationCycle { artifact: String, chain: Vec<String> },
}

impl DescriptorError {
    pub fn not_found(artifact: &Coordinate) -> Self {
        Self::NotFound {
            artifact: artifact.to_string(),
        }
    }

    pub fn invalid(artifact: &Coordinate, message: impl Into<String>) -> Self {
        Self::Invalid {
            artifact: artifact.to_string(),
            message: message.into(),
        }
    }

    /// Whether the failure means "there is no descriptor" rather than "the
    /// descriptor is broken".
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// A failure confined to one branch of the dependency graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollectionError {
    #[error("failed to resolve version for {dependency}{}: {source}", render_path(path))]
    RangeResolution {
        dependency: Dependency,
        /// Ancestor trail from the root to the failing dependency
        path: Vec<String>,
        #[source]
        source: RangeResolutionError,
    },

    #[error("failed to read descriptor for {dependency}{}: {source}", render_path(path))]
    Descriptor {
        dependency: Dependency,
        /// Ancestor trail from the root to the failing dependency
        path: Vec<String>,
        #[source]
        source: DescriptorError,
    },

    #[error("graph transformation failed: {message}")]
    Transform { message: String },
}

fn render_path(path: &[String]) -> String {
    if path.is_empty() {
        String::new()
    } else {
        format!(" (via {})", path.join(" -> "))
    }
}

impl CollectionError {
    pub fn transform(message: impl Into<String>) -> Self {
        Self::Transform {
            message: message.into(),
        }
    }

    /// The dependency whose branch failed, if any.
    pub fn dependency(&self) -> Option<&Dependency> {
        match self {
            Self::RangeResolution { dependency, .. } | Self::Descriptor { dependency, .. } => {
                Some(dependency)
            }
            Self::Transform { .. } => None,
        }
    }
}

/// Raised when collection finished with at least one recorded failure.
///
/// Carries the partial result so callers can still inspect what was
/// resolved alongside what failed.
#[derive(Debug, Error)]
#[error("failed to collect dependencies: {} problem(s), first: {}", .result.failure_count(), first_problem(.result))]
pub struct DependencyCollectionError {
    result: Box<CollectResult>,
}

fn first_problem(result: &CollectResult) -> String {
    result
        .exceptions
        .first()
        .map_or_else(|| "not recorded".to_string(), ToString::to_string)
}

impl DependencyCollectionError {
    pub fn new(result: CollectResult) -> Self {
        Self {
            result: Box::new(result),
        }
    }

    /// The partial result.
    pub fn result(&self) -> &CollectResult {
        &self.result
    }

    pub fn into_result(self) -> CollectResult {
        *self.result
    }
}
