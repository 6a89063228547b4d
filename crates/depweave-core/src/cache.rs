//! Collection Cache
//!
//! Session-scoped memoisation of the three expensive steps of collection:
//! version-range resolution, descriptor reads and fully built subtrees.
//!
//! Thread-safe via interior mutability using parking_lot::Mutex. No lock is
//! held while a collaborator runs; callers look up, release, compute, then
//! store.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;
use petgraph::stable_graph::NodeIndex;

use crate::artifact::{Coordinate, RemoteRepository};
use crate::descriptor::Descriptor;
use crate::error::DescriptorError;
use crate::graph::GraphId;
use crate::policy::Policies;
use crate::resolver::VersionRangeResult;

/// Default capacity of the subtree cache.
pub const DEFAULT_NODE_CAPACITY: usize = 10_000;

/// Cache metrics for monitoring
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheMetrics {
    /// Lookups answered from the cache
    pub hits: u64,
    /// Lookups that found nothing
    pub misses: u64,
    /// Entries pushed out by capacity
    pub evictions: u64,
}

impl CacheMetrics {
    /// Get hit rate as a fraction (0.0 - 1.0)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    fn record(&mut self, hit: bool) {
        if hit {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
    }
}

/// Metrics of all three caches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectionCacheMetrics {
    pub constraints: CacheMetrics,
    pub descriptors: CacheMetrics,
    pub nodes: CacheMetrics,
}

/// Key of a version-range resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConstraintKey {
    artifact: Arc<Coordinate>,
    repositories: Arc<[RemoteRepository]>,
    context: String,
}

impl ConstraintKey {
    pub fn new(
        artifact: Arc<Coordinate>,
        repositories: Arc<[RemoteRepository]>,
        context: impl Into<String>,
    ) -> Self {
        Self {
            artifact,
            repositories,
            context: context.into(),
        }
    }
}

/// Key of a descriptor read.
///
/// The search list is part of the key: a failure under a narrow list says
/// nothing about a wider one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DescriptorKey {
    artifact: Arc<Coordinate>,
    repositories: Arc<[RemoteRepository]>,
    context: String,
}

impl DescriptorKey {
    pub fn new(
        artifact: Arc<Coordinate>,
        repositories: Arc<[RemoteRepository]>,
        context: impl Into<String>,
    ) -> Self {
        Self {
            artifact,
            repositories,
            context: context.into(),
        }
    }
}

/// Key of a built subtree.
///
/// Two recursion points with equal keys produce identical subtrees.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeKey {
    graph: GraphId,
    artifact: Arc<Coordinate>,
    repositories: Arc<[RemoteRepository]>,
    policies: Policies,
}

impl NodeKey {
    pub fn new(
        graph: GraphId,
        artifact: Arc<Coordinate>,
        repositories: Arc<[RemoteRepository]>,
        policies: Policies,
    ) -> Self {
        Self {
            graph,
            artifact,
            repositories,
            policies,
        }
    }

    pub fn graph(&self) -> GraphId {
        self.graph
    }
}

/// A cached descriptor read: the descriptor or the failure it produced.
pub type DescriptorEntry = Result<Arc<Descriptor>, DescriptorError>;

struct CacheState {
    constraints: HashMap<ConstraintKey, Arc<VersionRangeResult>>,
    descriptors: HashMap<DescriptorKey, DescriptorEntry>,
    nodes: LruCache<NodeKey, NodeIndex>,
    metrics: CollectionCacheMetrics,
}

/// Per-session collection cache.
pub struct CollectionCache {
    state: Mutex<CacheState>,
}

impl Default for CollectionCache {
    fn default() -> Self {
        Self::new(NonZeroUsize::new(DEFAULT_NODE_CAPACITY).unwrap_or(NonZeroUsize::MIN))
    }
}

impl std::fmt::Debug for CollectionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("CollectionCache")
            .field("constraints", &state.constraints.len())
            .field("descriptors", &state.descriptors.len())
            .field("nodes", &state.nodes.len())
            .finish()
    }
}

impl CollectionCache {
    /// Create a cache holding at most `node_capacity` subtrees.
    pub fn new(node_capacity: NonZeroUsize) -> Self {
        Self {
            state: Mutex::new(CacheState {
                constraints: HashMap::new(),
                descriptors: HashMap::new(),
                nodes: LruCache::new(node_capacity),
                metrics: CollectionCacheMetrics::default(),
            }),
        }
    }

    pub fn get_constraint(&self, key: &ConstraintKey) -> Option<Arc<VersionRangeResult>> {
        let mut state = self.state.lock();
        let found = state.constraints.get(key).cloned();
        state.metrics.constraints.record(found.is_some());
        found
    }

    pub fn put_constraint(&self, key: ConstraintKey, result: Arc<VersionRangeResult>) {
        self.state.lock().constraints.insert(key, result);
    }

    /// `None` means "not cached yet"; `Some(Err(_))` is a cached failure.
    pub fn get_descriptor(&self, key: &DescriptorKey) -> Option<DescriptorEntry> {
        let mut state = self.state.lock();
        let found = state.descriptors.get(key).cloned();
        state.metrics.descriptors.record(found.is_some());
        found
    }

    pub fn put_descriptor(&self, key: DescriptorKey, entry: DescriptorEntry) {
        self.state.lock().descriptors.insert(key, entry);
    }

    pub fn get_node(&self, key: &NodeKey) -> Option<NodeIndex> {
        let mut state = self.state.lock();
        let found = state.nodes.get(key).copied();
        state.metrics.nodes.record(found.is_some());
        found
    }

    pub fn put_node(&self, key: NodeKey, node: NodeIndex) {
        let mut state = self.state.lock();
        if let Some((evicted, _)) = state.nodes.push(key.clone(), node) {
            if evicted != key {
                state.metrics.nodes.evictions += 1;
            }
        }
    }

    /// Forget every subtree built for `graph`. Returns how many were dropped.
    pub fn release_graph(&self, graph: GraphId) -> usize {
        let mut state = self.state.lock();
        let stale: Vec<NodeKey> = state
            .nodes
            .iter()
            .filter(|(key, _)| key.graph == graph)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &stale {
            state.nodes.pop(key);
        }
        stale.len()
    }

    pub fn node_count(&self) -> usize {
        self.state.lock().nodes.len()
    }

    pub fn descriptor_count(&self) -> usize {
        self.state.lock().descriptors.len()
    }

    pub fn constraint_count(&self) -> usize {
        self.state.lock().constraints.len()
    }

    /// Get a snapshot of cache metrics
    pub fn metrics(&self) -> CollectionCacheMetrics {
        self.state.lock().metrics
    }

    pub fn reset_metrics(&self) {
        self.state.lock().metrics = CollectionCacheMetrics::default();
    }

    /// Drop every entry.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.constraints.clear();
        state.descriptors.clear();
        state.nodes.clear();
    }
}
