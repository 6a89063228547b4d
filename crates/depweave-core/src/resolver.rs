//! External collaborators consumed by the collector.
//!
//! Version listing, descriptor reading and repository merging are supplied
//! by the embedding tool; this module defines their interfaces plus the
//! standard aggregator and transformers.

use std::collections::{HashMap, HashSet};

use depweave_config::{MirrorEntry, RepositoryConfig};
use tracing::trace;

use crate::artifact::{Coordinate, RemoteRepository};
use crate::descriptor::Descriptor;
use crate::error::{CollectionError, DescriptorError, RangeResolutionError};
use crate::graph::DependencyGraph;
use crate::version::{Version, VersionConstraint};

/// Result of resolving a version constraint against the repositories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRangeResult {
    pub constraint: VersionConstraint,
    /// Satisfying versions, ascending
    pub versions: Vec<Version>,
    /// Repository each version was found in, when known
    pub repositories: HashMap<Version, RemoteRepository>,
}

impl VersionRangeResult {
    pub fn new(constraint: VersionConstraint) -> Self {
        Self {
            constraint,
            versions: Vec::new(),
            repositories: HashMap::new(),
        }
    }

    /// Add a candidate, keeping `versions` sorted.
    pub fn add_version(&mut self, version: Version, repository: Option<RemoteRepository>) {
        if let Some(repository) = repository {
            self.repositories.insert(version.clone(), repository);
        }
        if let Err(pos) = self.versions.binary_search(&version) {
            self.versions.insert(pos, version);
        }
    }

    /// The highest candidate.
    pub fn highest(&self) -> Option<&Version> {
        self.versions.last()
    }

    pub fn repository_of(&self, version: &Version) -> Option<&RemoteRepository> {
        self.repositories.get(version)
    }
}

/// Turns an artifact's version constraint into candidate versions.
pub trait VersionRangeResolver: Send + Sync {
    fn resolve_version_range(
        &self,
        artifact: &Coordinate,
        repositories: &[RemoteRepository],
        context: &str,
    ) -> Result<VersionRangeResult, RangeResolutionError>;
}

/// Reads the descriptor of a concrete artifact.
pub trait DescriptorReader: Send + Sync {
    fn read_descriptor(
        &self,
        artifact: &Coordinate,
        repositories: &[RemoteRepository],
        context: &str,
    ) -> Result<Descriptor, DescriptorError>;
}

/// Merges repositories declared further down into the current list.
pub trait RepositoryAggregator: Send + Sync {
    /// `dominant` entries come first and win on id clashes. Only entries new
    /// to the list get mirror treatment.
    fn aggregate_repositories(
        &self,
        dominant: &[RemoteRepository],
        recessive: &[RemoteRepository],
    ) -> Vec<RemoteRepository>;
}

/// Post-processing pass run once on the finished raw graph.
pub trait GraphTransformer: Send + Sync {
    fn transform(&self, graph: &mut DependencyGraph) -> Result<(), CollectionError>;
}

// ============================================================================
// Repository aggregation
// ============================================================================

/// Deduplicates by id and redirects new entries through configured mirrors.
#[derive(Debug, Clone, Default)]
pub struct DefaultRepositoryAggregator {
    mirrors: Vec<MirrorEntry>,
}

impl DefaultRepositoryAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mirrors(mirrors: Vec<MirrorEntry>) -> Self {
        Self { mirrors }
    }

    pub fn from_config(config: &RepositoryConfig) -> Self {
        Self::with_mirrors(config.mirrors.clone())
    }

    fn mirror_for(&self, repository: &RemoteRepository) -> Option<RemoteRepository> {
        self.mirrors
            .iter()
            .find(|m| m.mirrors(&repository.id))
            .map(|m| RemoteRepository::new(m.id.clone(), m.url.clone()))
    }
}

impl RepositoryAggregator for DefaultRepositoryAggregator {
    fn aggregate_repositories(
        &self,
        dominant: &[RemoteRepository],
        recessive: &[RemoteRepository],
    ) -> Vec<RemoteRepository> {
        if recessive.is_empty() {
            return dominant.to_vec();
        }
        let mut result = dominant.to_vec();
        let mut seen: HashSet<String> = dominant.iter().map(|r| r.id.clone()).collect();
        for repository in recessive {
            if !seen.insert(repository.id.clone()) {
                continue;
            }
            let effective = match self.mirror_for(repository) {
                Some(mirror) => {
                    trace!(repository = %repository.id, mirror = %mirror.id, "Repository mirrored");
                    mirror
                }
                None => repository.clone(),
            };
            if effective.id != repository.id && !seen.insert(effective.id.clone()) {
                continue;
            }
            result.push(effective);
        }
        result
    }
}

// ============================================================================
// Transformers
// ============================================================================

/// Leaves the graph as collected.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTransformer;

impl GraphTransformer for NoopTransformer {
    fn transform(&self, _graph: &mut DependencyGraph) -> Result<(), CollectionError> {
        Ok(())
    }
}

/// Runs several transformers in order, stopping at the first failure.
#[derive(Default)]
pub struct ChainedTransformer {
    transformers: Vec<Box<dyn GraphTransformer>>,
}

impl ChainedTransformer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(mut self, transformer: impl GraphTransformer + 'static) -> Self {
        self.transformers.push(Box::new(transformer));
        self
    }

    pub fn len(&self) -> usize {
        self.transformers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transformers.is_empty()
    }
}

impl GraphTransformer for ChainedTransformer {
    fn transform(&self, graph: &mut DependencyGraph) -> Result<(), CollectionError> {
        for transformer in &self.transformers {
            transformer.transform(graph)?;
        }
        Ok(())
    }
}
