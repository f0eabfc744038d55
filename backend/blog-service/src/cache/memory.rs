use super::{CacheResult, PageCache};
use dashmap::DashMap;
use std::time::{Duration, Instant};

struct Entry {
    body: Vec<u8>,
    expires_at: Instant,
}

/// Process-local page cache; entries expire lazily on read.
#[derive(Default)]
pub struct MemoryPageCache {
    entries: DashMap<String, Entry>,
}

impl MemoryPageCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait::async_trait]
impl PageCache for MemoryPageCache {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            if entry.expires_at > now {
                return Ok(Some(entry.body.clone()));
            }
        }
        self.entries.remove_if(key, |_, entry| entry.expires_at <= now);
        Ok(None)
    }

    async fn set(&self, key: &str, body: Vec<u8>, ttl: Duration) -> CacheResult<()> {
        self.entries.insert(
            key.to_string(),
            Entry {
                body,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn invalidate_prefix(&self, prefix: &str) -> CacheResult<usize> {
        let before = self.entries.len();
        self.entries.retain(|key, _| !key.starts_with(prefix));
        Ok(before - self.entries.len())
    }
}
