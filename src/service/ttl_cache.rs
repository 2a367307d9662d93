use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;

#[derive(Debug)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

/// In-memory cache whose entries expire a fixed time after they were populated.
///
/// Population is not single-flight: concurrent misses on the same key each run
/// their own populate future, and the last one to finish wins.
#[derive(Debug)]
pub struct TtlCache<V> {
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
}

impl<V> Default for TtlCache<V> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<V: Clone> TtlCache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the live entry for `key`, or run `populate` and cache its value for `ttl`.
    /// A failed population caches nothing.
    pub async fn get_or_populate<F, Fut, E>(
        &self,
        key: &str,
        ttl: Duration,
        populate: F,
    ) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(entry) = self.entries.read().await.get(key) {
            if Instant::now() < entry.expires_at {
                return Ok(entry.value.clone());
            }
        }

        let value = populate().await?;

        let now = Instant::now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| now < entry.expires_at);
        entries.insert(
            key.to_string(),
            CacheEntry {
                value: value.clone(),
                expires_at: now + ttl,
            },
        );

        Ok(value)
    }
}
