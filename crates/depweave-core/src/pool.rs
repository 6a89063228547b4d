//! Interning of immutable value objects.
//!
//! The pool hands out one canonical `Arc` per structurally equal value while
//! that value is alive somewhere. Entries are held weakly, so dropping every
//! graph that references a coordinate makes its pool slot reclaimable; dead
//! slots are swept periodically and by [`ObjectPool::purge`].

use std::collections::HashMap;
use std::hash::{BuildHasher, Hash, RandomState};
use std::sync::{Arc, Weak};

use once_cell::sync::Lazy;
use parking_lot::Mutex;

use crate::artifact::{Coordinate, Dependency};

/// Inserts between automatic sweeps of dead entries.
const SWEEP_INTERVAL: usize = 4096;

static GLOBAL: Lazy<InternPool> = Lazy::new(InternPool::new);

struct PoolState<T> {
    /// Hash of the value to the weak handles sharing that hash
    buckets: HashMap<u64, Vec<Weak<T>>>,
    inserts_since_sweep: usize,
}

/// Weak interning table for one value type.
pub struct ObjectPool<T> {
    hasher: RandomState,
    state: Mutex<PoolState<T>>,
}

impl<T: Eq + Hash> Default for ObjectPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Eq + Hash> ObjectPool<T> {
    pub fn new() -> Self {
        Self {
            hasher: RandomState::new(),
            state: Mutex::new(PoolState {
                buckets: HashMap::new(),
                inserts_since_sweep: 0,
            }),
        }
    }

    /// Intern a value, returning the canonical instance.
    pub fn intern(&self, value: T) -> Arc<T> {
        self.intern_arc(Arc::new(value))
    }

    /// Intern an already shared value.
    ///
    /// Returns the live instance equal to `value` if there is one, otherwise
    /// `value` itself becomes canonical. Lookup and insert happen under one
    /// lock.
    pub fn intern_arc(&self, value: Arc<T>) -> Arc<T> {
        let hash = self.hasher.hash_one(&*value);
        let mut state = self.state.lock();
        {
            let bucket = state.buckets.entry(hash).or_default();
            let mut live = 0;
            for weak in bucket.iter() {
                if let Some(existing) = weak.upgrade() {
                    if *existing == *value {
                        return existing;
                    }
                    live += 1;
                }
            }
            if live < bucket.len() {
                bucket.retain(|w| w.strong_count() > 0);
            }
            bucket.push(Arc::downgrade(&value));
        }

        state.inserts_since_sweep += 1;
        if state.inserts_since_sweep >= SWEEP_INTERVAL {
            sweep(&mut state);
        }
        value
    }

    /// Drop every dead entry now.
    pub fn purge(&self) {
        sweep(&mut self.state.lock());
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.state
            .lock()
            .buckets
            .values()
            .flatten()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn sweep<T>(state: &mut PoolState<T>) {
    state.buckets.retain(|_, bucket| {
        bucket.retain(|w| w.strong_count() > 0);
        !bucket.is_empty()
    });
    state.inserts_since_sweep = 0;
}

/// Inner state of [`InternPool`].
#[derive(Default)]
pub struct InternPoolInner {
    artifacts: ObjectPool<Coordinate>,
    dependencies: ObjectPool<Dependency>,
}

/// Shared pool for coordinates and dependencies.
///
/// Cloning is cheap; clones share the same tables.
#[derive(Clone, Default)]
pub struct InternPool {
    inner: Arc<InternPoolInner>,
}

impl std::fmt::Debug for InternPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InternPool")
            .field("artifacts", &self.inner.artifacts.len())
            .field("dependencies", &self.inner.dependencies.len())
            .finish()
    }
}

impl InternPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide pool shared by sessions that do not bring their own.
    pub fn global() -> Self {
        GLOBAL.clone()
    }

    pub fn intern_artifact(&self, artifact: Coordinate) -> Arc<Coordinate> {
        self.inner.artifacts.intern(artifact)
    }

    pub fn intern_artifact_arc(&self, artifact: Arc<Coordinate>) -> Arc<Coordinate> {
        self.inner.artifacts.intern_arc(artifact)
    }

    /// Intern a dependency, sharing its coordinate through the artifact
    /// table first.
    pub fn intern_dependency(&self, dependency: Dependency) -> Arc<Dependency> {
        let artifact = self.intern_artifact_arc(Arc::clone(dependency.artifact_arc()));
        let dependency = if Arc::ptr_eq(&artifact, dependency.artifact_arc()) {
            dependency
        } else {
            dependency.with_shared_artifact(artifact)
        };
        self.inner.dependencies.intern(dependency)
    }

    /// Sweep dead entries from both tables.
    pub fn purge(&self) {
        self.inner.artifacts.purge();
        self.inner.dependencies.purge();
    }

    pub fn artifact_count(&self) -> usize {
        self.inner.artifacts.len()
    }

    pub fn dependency_count(&self) -> usize {
        self.inner.dependencies.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_returns_first_instance() {
        let pool = ObjectPool::new();
        let first = pool.intern(Coordinate::new("g", "a", "1.0"));
        let second = pool.intern(Coordinate::new("g", "a", "1.0"));
        let third = pool.intern_arc(Arc::new(Coordinate::new("g", "a", "1.0")));
        assert!(Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&first, &third));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_distinct_values_stay_distinct() {
        let pool = ObjectPool::new();
        let a = pool.intern(Coordinate::new("g", "a", "1.0"));
        let b = pool.intern(Coordinate::new("g", "a", "2.0"));
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_dropped_entries_are_reclaimed() {
        let pool = ObjectPool::new();
        let a = pool.intern(Coordinate::new("g", "a", "1.0"));
        let weak = Arc::downgrade(&a);
        drop(a);
        assert!(weak.upgrade().is_none());
        assert_eq!(pool.len(), 0);
        pool.purge();
        assert!(pool.is_empty());

        // A fresh value becomes canonical again.
        let b = Arc::new(Coordinate::new("g", "a", "1.0"));
        let interned = pool.intern_arc(Arc::clone(&b));
        assert!(Arc::ptr_eq(&b, &interned));
    }

    #[test]
    fn test_intern_dependency_shares_artifact() {
        let pool = InternPool::new();
        let artifact = pool.intern_artifact(Coordinate::new("g", "a", "1.0"));
        let dep = pool.intern_dependency(Dependency::new(Coordinate::new("g", "a", "1.0"), "compile"));
        assert!(Arc::ptr_eq(&artifact, dep.artifact_arc()));

        let again = pool.intern_dependency(Dependency::new(Coordinate::new("g", "a", "1.0"), "compile"));
        assert!(Arc::ptr_eq(&dep, &again));
        assert_eq!(pool.artifact_count(), 1);
        assert_eq!(pool.dependency_count(), 1);
    }

    #[test]
    fn test_concurrent_interning_yields_one_instance() {
        let pool = InternPool::new();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let pool = pool.clone();
                std::thread::spawn(move || pool.intern_artifact(Coordinate::new("g", "a", "1.0")))
            })
            .collect();
        let results: Vec<Arc<Coordinate>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        // Every thread holds its result, so all must be the same instance.
        assert!(results.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }
}
