//! Artifact descriptors (manifests).

use serde::{Deserialize, Serialize};

use crate::artifact::{Coordinate, Dependency, RemoteRepository};

/// What an artifact's manifest declares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Descriptor {
    /// The artifact the descriptor was read for
    pub artifact: Coordinate,
    /// Redirect targets; the first one is followed
    #[serde(default)]
    pub relocations: Vec<Coordinate>,
    /// Coordinates considered equivalent to `artifact`
    #[serde(default)]
    pub aliases: Vec<Coordinate>,
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
    #[serde(default)]
    pub managed_dependencies: Vec<Dependency>,
    #[serde(default)]
    pub repositories: Vec<RemoteRepository>,
}

impl Descriptor {
    /// A descriptor declaring nothing.
    pub fn empty(artifact: Coordinate) -> Self {
        Self {
            artifact,
            relocations: Vec::new(),
            aliases: Vec::new(),
            dependencies: Vec::new(),
            managed_dependencies: Vec::new(),
            repositories: Vec::new(),
        }
    }

    pub fn with_dependencies(mut self, dependencies: Vec<Dependency>) -> Self {
        self.dependencies = dependencies;
        self
    }

    pub fn with_managed_dependencies(mut self, managed: Vec<Dependency>) -> Self {
        self.managed_dependencies = managed;
        self
    }

    pub fn with_repositories(mut self, repositories: Vec<RemoteRepository>) -> Self {
        self.repositories = repositories;
        self
    }

    pub fn with_relocation(mut self, target: Coordinate) -> Self {
        self.relocations.push(target);
        self
    }

    pub fn with_aliases(mut self, aliases: Vec<Coordinate>) -> Self {
        self.aliases = aliases;
        self
    }

    /// The coordinate this descriptor redirects to, if any.
    pub fn relocation(&self) -> Option<&Coordinate> {
        self.relocations.first()
    }
}
