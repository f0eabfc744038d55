use super::{CacheResult, PageCache};
use redis::{aio::ConnectionManager, AsyncCommands};
use std::time::Duration;
use tracing::debug;

/// Namespace every key is stored under.
const KEY_NAMESPACE: &str = "yatube:page:";

/// Redis-backed page cache shared by all workers and instances
#[derive(Clone)]
pub struct RedisPageCache {
    redis: ConnectionManager,
}

impl RedisPageCache {
    pub fn new(redis: ConnectionManager) -> Self {
        Self { redis }
    }

    pub async fn connect(url: &str) -> CacheResult<Self> {
        let client = redis::Client::open(url)?;
        let manager = ConnectionManager::new(client).await?;
        Ok(Self::new(manager))
    }

    fn namespaced(key: &str) -> String {
        format!("{}{}", KEY_NAMESPACE, key)
    }
}

#[async_trait::async_trait]
impl PageCache for RedisPageCache {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let mut conn = self.redis.clone();
        let body: Option<Vec<u8>> = conn.get(Self::namespaced(key)).await?;
        Ok(body)
    }

    async fn set(&self, key: &str, body: Vec<u8>, ttl: Duration) -> CacheResult<()> {
        let mut conn = self.redis.clone();
        conn.set_ex::<_, _, ()>(Self::namespaced(key), body, ttl.as_secs().max(1))
            .await?;
        Ok(())
    }

    async fn invalidate_prefix(&self, prefix: &str) -> CacheResult<usize> {
        let mut conn = self.redis.clone();
        let pattern = format!("{}*", Self::namespaced(prefix));
        let mut cursor: u64 = 0;
        let mut total_deleted = 0;

        loop {
            // SCAN rather than KEYS so large keyspaces do not block the server
            let (next_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await?;

            if !keys.is_empty() {
                let deleted: usize = conn.del(&keys).await?;
                total_deleted += deleted;
            }

            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }

        debug!(%pattern, total_deleted, "redis page cache invalidated");
        Ok(total_deleted)
    }
}
