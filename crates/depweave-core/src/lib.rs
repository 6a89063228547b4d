//! depweave Core - Transitive dependency graph collection
//!
//! This crate provides the collection half of dependency resolution:
//! - Artifact coordinates, dependencies and a generic version scheme
//! - An index-addressed dependency graph with shared subtrees
//! - Interning of coordinates and dependencies
//! - A session cache for range resolutions, descriptors and built subtrees
//! - Pluggable selection, management and traversal policies
//! - The depth-first collector with per-branch failure accumulation
//!
//! Conflict mediation and artifact download are left to the caller; the
//! collector hands back the raw graph.

pub mod artifact;
pub mod cache;
pub mod collector;
pub mod descriptor;
pub mod error;
pub mod graph;
pub mod memory;
pub mod policy;
pub mod pool;
pub mod resolver;
pub mod session;
pub mod stack;
pub mod version;

// Model re-exports
pub use artifact::{Coordinate, Dependency, Exclusion, RemoteRepository};
pub use descriptor::Descriptor;
pub use version::{Version, VersionConstraint, VersionRange};

// Graph re-exports
pub use graph::{
    DependencyEdge, DependencyGraph, DependencyNode, EdgeOutcome, EdgeView, GraphId,
    GraphSnapshot, Premanaged,
};

// Collection re-exports
pub use cache::{CacheMetrics, CollectionCache, CollectionCacheMetrics};
pub use collector::{CollectRequest, CollectResult, Collector, CollectorBuilder, DependencyCycle};
pub use error::{CollectionError, DependencyCollectionError, DescriptorError, RangeResolutionError};
pub use pool::InternPool;
pub use session::CollectionSession;

// Collaborator re-exports
pub use memory::{FixtureError, InMemoryRepository};
pub use policy::{
    DependencyManager, DependencySelector, DependencyTraverser, Policies,
};
pub use resolver::{
    DefaultRepositoryAggregator, DescriptorReader, GraphTransformer, RepositoryAggregator,
    VersionRangeResolver, VersionRangeResult,
};

pub use depweave_config::{DepweaveConfig, DescriptorPolicy};
