//! In-memory artifact repository.
//!
//! Serves version listings and descriptors from a table built in code or
//! loaded from a TOML fixture:
//!
//! ```toml
//! [[artifact]]
//! coordinate = "org.example:app:1.0"
//! repository = "central"
//! dependencies = [
//!     { coordinate = "org.example:lib:[1.0,2.0)", exclusions = ["org.log:*"] },
//!     { coordinate = "org.example:test-kit:1.0", scope = "test" },
//! ]
//!
//! [[artifact]]
//! coordinate = "org.example:old:1.0"
//! relocation = "org.example:new:1.0"
//!
//! [[artifact]]
//! coordinate = "org.example:broken:1.0"
//! descriptor = "invalid"
//! message = "unexpected end of file"
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::artifact::{
    Coordinate, CoordinateParseError, Dependency, Exclusion, RemoteRepository, DEFAULT_SCOPE,
};
use crate::descriptor::Descriptor;
use crate::error::{DescriptorError, RangeResolutionError};
use crate::resolver::{DescriptorReader, VersionRangeResolver, VersionRangeResult};
use crate::version::{Version, VersionConstraint, VersionParseError};

/// Errors loading a repository fixture.
#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("failed to read fixture {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse fixture: {0}")]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    Coordinate(#[from] CoordinateParseError),

    #[error("bad version in fixture: {0}")]
    Version(#[from] VersionParseError),

    #[error("unknown repository '{repository}' for {artifact}")]
    UnknownRepository { artifact: String, repository: String },
}

#[derive(Debug, Clone)]
enum Published {
    Present(Descriptor),
    Missing,
    Invalid(String),
}

#[derive(Debug, Clone)]
struct Entry {
    version: Version,
    repository: Option<RemoteRepository>,
    published: Published,
}

/// A fixed set of artifacts, keyed by management key.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    repositories: HashMap<String, RemoteRepository>,
    artifacts: HashMap<String, Vec<Entry>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a repository artifacts can be published into.
    pub fn with_repository(mut self, repository: RemoteRepository) -> Self {
        self.repositories.insert(repository.id.clone(), repository);
        self
    }

    /// Publish a descriptor, visible from every repository.
    pub fn with_descriptor(self, descriptor: Descriptor) -> Self {
        let artifact = descriptor.artifact.clone();
        self.insert(&artifact, None, Published::Present(descriptor))
    }

    /// Publish a descriptor visible only through `repository`.
    pub fn with_descriptor_in(self, repository: RemoteRepository, descriptor: Descriptor) -> Self {
        let artifact = descriptor.artifact.clone();
        self.with_repository(repository.clone())
            .insert(&artifact, Some(repository), Published::Present(descriptor))
    }

    /// Shorthand for a descriptor declaring only `dependencies`.
    pub fn with_artifact(self, artifact: Coordinate, dependencies: Vec<Dependency>) -> Self {
        self.with_descriptor(Descriptor::empty(artifact).with_dependencies(dependencies))
    }

    /// List a version that has no descriptor.
    pub fn with_missing_descriptor(self, artifact: Coordinate) -> Self {
        self.insert(&artifact, None, Published::Missing)
    }

    /// List a version whose descriptor cannot be read.
    pub fn with_invalid_descriptor(self, artifact: Coordinate, message: impl Into<String>) -> Self {
        self.insert(&artifact, None, Published::Invalid(message.into()))
    }

    fn insert(
        mut self,
        artifact: &Coordinate,
        repository: Option<RemoteRepository>,
        published: Published,
    ) -> Self {
        // Unparseable versions can never be requested, so they are dropped.
        let Ok(version) = Version::parse(artifact.version()) else {
            return self;
        };
        let entries = self
            .artifacts
            .entry(artifact.management_key())
            .or_default();
        entries.retain(|e| e.version != version);
        let pos = entries.partition_point(|e| e.version < version);
        entries.insert(
            pos,
            Entry {
                version,
                repository,
                published,
            },
        );
        self
    }

    /// Number of published versions across all artifacts.
    pub fn len(&self) -> usize {
        self.artifacts.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn visible<'a>(
        &'a self,
        artifact: &Coordinate,
        repositories: &'a [RemoteRepository],
    ) -> impl Iterator<Item = &'a Entry> + 'a {
        self.artifacts
            .get(&artifact.management_key())
            .into_iter()
            .flatten()
            .filter(move |e| match &e.repository {
                Some(repo) => repositories.iter().any(|r| r.id == repo.id),
                None => true,
            })
    }

    // ------------------------------------------------------------------------
    // Fixture loading
    // ------------------------------------------------------------------------

    pub fn from_toml_str(content: &str) -> Result<Self, FixtureError> {
        let fixture: Fixture = toml::from_str(content)?;
        let mut repo = Self::new();
        for repository in fixture.repository {
            repo = repo.with_repository(RemoteRepository::new(repository.id, repository.url));
        }
        for artifact in fixture.artifact {
            repo = artifact.publish(repo)?;
        }
        Ok(repo)
    }

    pub fn from_path(path: &Path) -> Result<Self, FixtureError> {
        let content = std::fs::read_to_string(path).map_err(|source| FixtureError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }
}

impl VersionRangeResolver for InMemoryRepository {
    fn resolve_version_range(
        &self,
        artifact: &Coordinate,
        repositories: &[RemoteRepository],
        _context: &str,
    ) -> Result<VersionRangeResult, RangeResolutionError> {
        let constraint = VersionConstraint::parse(artifact.version())?;
        let mut result = VersionRangeResult::new(constraint.clone());

        if let Some(preferred) = constraint.preferred_version() {
            // A pinned version is taken as is; the listing only tells where
            // it lives.
            let repository = self
                .visible(artifact, repositories)
                .find(|e| &e.version == preferred)
                .and_then(|e| e.repository.clone());
            result.add_version(preferred.clone(), repository);
            return Ok(result);
        }

        for entry in self.visible(artifact, repositories) {
            if constraint.contains(&entry.version) {
                result.add_version(entry.version.clone(), entry.repository.clone());
            }
        }
        if result.versions.is_empty() {
            return Err(RangeResolutionError::no_versions(
                artifact,
                constraint.to_string(),
            ));
        }
        Ok(result)
    }
}

impl DescriptorReader for InMemoryRepository {
    fn read_descriptor(
        &self,
        artifact: &Coordinate,
        repositories: &[RemoteRepository],
        _context: &str,
    ) -> Result<Descriptor, DescriptorError> {
        let version = Version::parse(artifact.version())
            .map_err(|e| DescriptorError::invalid(artifact, e.to_string()))?;
        let entry = self
            .visible(artifact, repositories)
            .find(|e| e.version == version)
            .ok_or_else(|| DescriptorError::not_found(artifact))?;
        match &entry.published {
            Published::Present(descriptor) => Ok(descriptor.clone()),
            Published::Missing => Err(DescriptorError::not_found(artifact)),
            Published::Invalid(message) => Err(DescriptorError::invalid(artifact, message.clone())),
        }
    }
}

// ============================================================================
// Fixture format
// ============================================================================

#[derive(Debug, Deserialize)]
struct Fixture {
    #[serde(default)]
    repository: Vec<FixtureRepository>,
    #[serde(default)]
    artifact: Vec<FixtureArtifact>,
}

#[derive(Debug, Deserialize)]
struct FixtureRepository {
    id: String,
    url: String,
}

#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum FixtureDescriptor {
    #[default]
    Present,
    Missing,
    Invalid,
}

#[derive(Debug, Deserialize)]
struct FixtureArtifact {
    coordinate: String,
    repository: Option<String>,
    #[serde(default)]
    descriptor: FixtureDescriptor,
    message: Option<String>,
    relocation: Option<String>,
    #[serde(default)]
    aliases: Vec<String>,
    #[serde(default)]
    dependencies: Vec<FixtureDependency>,
    #[serde(default)]
    managed: Vec<FixtureDependency>,
    #[serde(default)]
    repositories: Vec<FixtureRepository>,
}

#[derive(Debug, Deserialize)]
struct FixtureDependency {
    coordinate: String,
    scope: Option<String>,
    #[serde(default)]
    optional: bool,
    #[serde(default)]
    exclusions: Vec<String>,
}

impl FixtureDependency {
    fn into_dependency(self, default_scope: &str) -> Result<Dependency, FixtureError> {
        let exclusions = self
            .exclusions
            .iter()
            .map(|e| e.parse::<Exclusion>())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Dependency::new(
            self.coordinate.parse()?,
            self.scope.unwrap_or_else(|| default_scope.to_string()),
        )
        .with_optional(self.optional)
        .with_exclusions(exclusions))
    }
}

impl FixtureArtifact {
    fn publish(self, repo: InMemoryRepository) -> Result<InMemoryRepository, FixtureError> {
        let artifact: Coordinate = self.coordinate.parse()?;
        Version::parse(artifact.version())?;

        let repository = match &self.repository {
            Some(id) => Some(repo.repositories.get(id).cloned().ok_or_else(|| {
                FixtureError::UnknownRepository {
                    artifact: artifact.to_string(),
                    repository: id.clone(),
                }
            })?),
            None => None,
        };

        let published = match self.descriptor {
            FixtureDescriptor::Missing => Published::Missing,
            FixtureDescriptor::Invalid => {
                Published::Invalid(self.message.unwrap_or_else(|| "invalid descriptor".into()))
            }
            FixtureDescriptor::Present => {
                let mut descriptor = Descriptor::empty(artifact.clone())
                    .with_dependencies(
                        self.dependencies
                            .into_iter()
                            .map(|d| d.into_dependency(DEFAULT_SCOPE))
                            .collect::<Result<_, _>>()?,
                    )
                    .with_managed_dependencies(
                        self.managed
                            .into_iter()
                            .map(|d| d.into_dependency(""))
                            .collect::<Result<_, _>>()?,
                    )
                    .with_repositories(
                        self.repositories
                            .into_iter()
                            .map(|r| RemoteRepository::new(r.id, r.url))
                            .collect(),
                    )
                    .with_aliases(
                        self.aliases
                            .iter()
                            .map(|a| a.parse::<Coordinate>())
                            .collect::<Result<_, _>>()?,
                    );
                if let Some(target) = &self.relocation {
                    descriptor = descriptor.with_relocation(target.parse()?);
                }
                Published::Present(descriptor)
            }
        };
        Ok(repo.insert(&artifact, repository, published))
    }
}
