//! Resolution session: the pool and cache shared by several collections.

use std::num::NonZeroUsize;
use std::sync::Arc;

use depweave_config::{CacheConfig, ConfigError};

use crate::cache::CollectionCache;
use crate::pool::InternPool;

/// State reused across collection calls of one build.
///
/// Cloning shares the pool and the cache.
#[derive(Debug, Clone)]
pub struct CollectionSession {
    pool: InternPool,
    cache: Arc<CollectionCache>,
}

impl Default for CollectionSession {
    fn default() -> Self {
        Self::new()
    }
}

impl CollectionSession {
    /// A session on the process-wide pool with a default-sized cache.
    pub fn new() -> Self {
        Self {
            pool: InternPool::global(),
            cache: Arc::new(CollectionCache::default()),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Result<Self, ConfigError> {
        let capacity = NonZeroUsize::new(config.node_capacity).ok_or_else(|| {
            ConfigError::invalid_value("cache.node_capacity", "must be greater than zero")
        })?;
        Ok(Self {
            pool: InternPool::global(),
            cache: Arc::new(CollectionCache::new(capacity)),
        })
    }

    /// Use a private pool instead of the process-wide one.
    pub fn with_pool(mut self, pool: InternPool) -> Self {
        self.pool = pool;
        self
    }

    pub fn with_cache(mut self, cache: Arc<CollectionCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn pool(&self) -> &InternPool {
        &self.pool
    }

    pub fn cache(&self) -> &CollectionCache {
        &self.cache
    }
}
