//! Common test utilities for integration tests.
//!
//! Fixture builders and a call-counting wrapper around
//! [`InMemoryRepository`].

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use depweave_core::artifact::{Coordinate, Dependency, RemoteRepository};
use depweave_core::descriptor::Descriptor;
use depweave_core::error::{DescriptorError, RangeResolutionError};
use depweave_core::memory::InMemoryRepository;
use depweave_core::resolver::{DescriptorReader, VersionRangeResolver, VersionRangeResult};
use depweave_core::{CollectRequest, Collector, CollectorBuilder, InternPool, CollectionSession};

// ============================================================================
// Builders
// ============================================================================

pub fn coord(text: &str) -> Coordinate {
    text.parse().expect("test coordinate")
}

/// A compile-scoped dependency.
pub fn dep(text: &str) -> Dependency {
    Dependency::new(coord(text), "compile")
}

pub fn dep_scoped(text: &str, scope: &str) -> Dependency {
    Dependency::new(coord(text), scope)
}

pub fn central() -> RemoteRepository {
    RemoteRepository::new("central", "https://repo.example/central")
}

/// A session with a private pool so tests do not share interned values.
pub fn session() -> CollectionSession {
    CollectionSession::new().with_pool(InternPool::new())
}

pub fn request(dependencies: Vec<Dependency>) -> CollectRequest {
    CollectRequest::new()
        .with_root_artifact(coord("test:app:1.0"))
        .with_dependencies(dependencies)
        .with_repository(central())
}

pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

// ============================================================================
// Counting collaborator
// ============================================================================

/// Counts calls per artifact key before delegating to the wrapped
/// repository.
#[derive(Debug)]
pub struct CountingRepository {
    inner: InMemoryRepository,
    range_calls: AtomicUsize,
    descriptor_calls: AtomicUsize,
    calls: parking_lot::Mutex<Vec<String>>,
}

impl CountingRepository {
    pub fn new(inner: InMemoryRepository) -> Arc<Self> {
        Arc::new(Self {
            inner,
            range_calls: AtomicUsize::new(0),
            descriptor_calls: AtomicUsize::new(0),
            calls: parking_lot::Mutex::new(Vec::new()),
        })
    }

    pub fn range_calls(&self) -> usize {
        self.range_calls.load(Ordering::SeqCst)
    }

    pub fn descriptor_calls(&self) -> usize {
        self.descriptor_calls.load(Ordering::SeqCst)
    }

    /// Number of calls of either kind naming `group:name`.
    pub fn calls_for(&self, group_and_name: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.as_str() == group_and_name)
            .count()
    }

    fn log(&self, artifact: &Coordinate) {
        self.calls
            .lock()
            .push(format!("{}:{}", artifact.group(), artifact.name()));
    }
}

impl VersionRangeResolver for CountingRepository {
    fn resolve_version_range(
        &self,
        artifact: &Coordinate,
        repositories: &[RemoteRepository],
        context: &str,
    ) -> Result<VersionRangeResult, RangeResolutionError> {
        self.range_calls.fetch_add(1, Ordering::SeqCst);
        self.log(artifact);
        self.inner
            .resolve_version_range(artifact, repositories, context)
    }
}

impl DescriptorReader for CountingRepository {
    fn read_descriptor(
        &self,
        artifact: &Coordinate,
        repositories: &[RemoteRepository],
        context: &str,
    ) -> Result<Descriptor, DescriptorError> {
        self.descriptor_calls.fetch_add(1, Ordering::SeqCst);
        self.log(artifact);
        self.inner.read_descriptor(artifact, repositories, context)
    }
}

/// A collector builder on a counting repository.
pub fn counting_builder(repo: &Arc<CountingRepository>) -> CollectorBuilder {
    Collector::builder(repo.clone(), repo.clone())
}
