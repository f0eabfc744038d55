/// Rendered page caching
///
/// This module provides:
/// - `PageCache`: byte cache port with TTL and prefix invalidation
/// - `MemoryPageCache`: process-local implementation
/// - `RedisPageCache`: Redis-backed implementation shared across workers
/// - `IndexCache`: the cache of the rendered "all posts" listing
pub mod memory;
pub mod redis_cache;

pub use memory::MemoryPageCache;
pub use redis_cache::RedisPageCache;

use crate::metrics::{INDEX_CACHE_EVENTS, INDEX_CACHE_INVALIDATIONS};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

pub type CacheResult<T> = Result<T, CacheError>;

#[async_trait::async_trait]
pub trait PageCache: Send + Sync {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>>;

    async fn set(&self, key: &str, body: Vec<u8>, ttl: Duration) -> CacheResult<()>;

    /// Drops every entry whose key starts with `prefix`; returns how many were dropped.
    async fn invalidate_prefix(&self, prefix: &str) -> CacheResult<usize>;
}

const INDEX_PREFIX: &str = "index:";

/// Cache of the rendered index listing, keyed by the resolved page number.
///
/// Cache failures never fail a request: reads degrade to a miss and writes
/// are dropped.
///
/// Every invalidation bumps a write generation. A page rendered before the
/// bump is not kept, so a render racing a mutation cannot pin stale output
/// for a whole TTL. The generation is per process; with a shared Redis
/// backend a render racing a mutation on another worker can still land.
#[derive(Clone)]
pub struct IndexCache {
    backend: Arc<dyn PageCache>,
    ttl: Duration,
    invalidate_on_write: bool,
    generation: Arc<AtomicU64>,
}

impl IndexCache {
    pub fn new(backend: Arc<dyn PageCache>, ttl: Duration, invalidate_on_write: bool) -> Self {
        Self {
            backend,
            ttl,
            invalidate_on_write,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn in_memory(ttl: Duration) -> Self {
        Self::new(Arc::new(MemoryPageCache::new()), ttl, true)
    }

    /// Key for a resolved page number, so junk `page` values share one entry.
    pub fn key_for(page_number: i64) -> String {
        format!("{}page={}", INDEX_PREFIX, page_number)
    }

    /// Current write generation; pass it back to `put` with the rendered page.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub async fn get(&self, key: &str) -> Option<Vec<u8>> {
        match self.backend.get(key).await {
            Ok(Some(body)) => {
                debug!(key, "index cache HIT");
                INDEX_CACHE_EVENTS.with_label_values(&["hit"]).inc();
                Some(body)
            }
            Ok(None) => {
                debug!(key, "index cache MISS");
                INDEX_CACHE_EVENTS.with_label_values(&["miss"]).inc();
                None
            }
            Err(err) => {
                warn!(key, "index cache read failed: {}", err);
                INDEX_CACHE_EVENTS.with_label_values(&["error"]).inc();
                None
            }
        }
    }

    /// Store a page rendered while `generation` was current.
    ///
    /// Dropped when an invalidation happened since; if one lands while the
    /// write is in flight, the entry is removed again.
    pub async fn put(&self, key: &str, body: Vec<u8>, generation: u64) {
        if self.generation() != generation {
            debug!(key, "index page outdated by a write, not cached");
            return;
        }
        if let Err(err) = self.backend.set(key, body, self.ttl).await {
            warn!(key, "index cache write failed: {}", err);
            INDEX_CACHE_EVENTS.with_label_values(&["error"]).inc();
            return;
        }
        if self.generation() != generation {
            if let Err(err) = self.backend.invalidate_prefix(key).await {
                warn!(key, "index cache invalidation failed: {}", err);
            }
        }
    }

    /// Forget every cached index page, regardless of configuration.
    pub async fn clear(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        match self.backend.invalidate_prefix(INDEX_PREFIX).await {
            Ok(dropped) => {
                debug!(dropped, "index cache cleared");
                INDEX_CACHE_INVALIDATIONS.inc();
            }
            Err(err) => warn!("index cache invalidation failed: {}", err),
        }
    }

    /// Called after every successful mutation.
    pub async fn on_write(&self) {
        if self.invalidate_on_write {
            self.clear().await;
        }
    }
}
