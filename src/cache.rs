use anyhow::{Result, anyhow};
use fjall::Keyspace;
use rand::RngExt;
use serde::Deserialize;
use serde::{Serialize, de::DeserializeOwned};
use std::fmt::Debug;
use std::future::Future;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::task;

#[derive(Serialize, Deserialize)]
struct StoredEntry<T> {
    value: T,
    expires_at: u64, // Unix timestamp (seconds)
}

/// Persistent TTL cache for upstream responses.
#[derive(Clone)]
pub struct PersistentCache {
    store: Keyspace,
}

fn get_from_store(store: Keyspace, key: Vec<u8>) -> anyhow::Result<Option<Vec<u8>>> {
    Ok(store.get(key)?.map(|v| v.to_vec()))
}

impl PersistentCache {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = fjall::Database::builder(&path).open()?;
        let items = db.keyspace("responses", fjall::KeyspaceCreateOptions::default)?;
        Ok(PersistentCache { store: items })
    }

    /// Stores a serializable value with a time-to-live (TTL).
    #[tracing::instrument(name = "put_cache", level = "debug", skip(self, value))]
    pub async fn put<T: Serialize + Send + 'static>(
        &self,
        key: &str,
        value: T,
        ttl: Duration,
    ) -> Result<()> {
        let store = self.store.clone();
        let key = key.as_bytes().to_vec();
        let expires_at = SystemTime::now()
            .checked_add(ttl)
            .ok_or(anyhow!("TTL overflow"))?
            .duration_since(UNIX_EPOCH)?
            .as_secs();
        let entry = StoredEntry { value, expires_at };
        let bytes = postcard::to_stdvec(&entry)?;

        task::spawn_blocking(move || store.insert(key, bytes)).await??;
        Ok(())
    }

    /// Retrieves a value if it exists and has not expired.
    /// Returns `None` for cache misses or expired entries.
    #[tracing::instrument(name = "query_cache", level = "debug", skip(self))]
    pub async fn get<T: DeserializeOwned + Send + 'static>(&self, key: &str) -> Result<Option<T>> {
        let store = self.store.clone();
        let key_bytes = key.as_bytes().to_vec();

        let maybe_bytes: Option<Vec<u8>> =
            task::spawn_blocking(move || get_from_store(store, key_bytes)).await??;

        let Some(bytes) = maybe_bytes else {
            tracing::debug!("Key not found");
            return Ok(None);
        };

        let entry: StoredEntry<T> = postcard::from_bytes(&bytes)?;
        let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();

        if now < entry.expires_at {
            tracing::debug!("Key found and still fresh");
            Ok(Some(entry.value))
        } else {
            tracing::debug!("Key found but expired");
            self.remove(key).await?;
            Ok(None)
        }
    }

    /// Manually removes a key from the cache.
    pub async fn remove(&self, key: &str) -> Result<()> {
        let key = key.as_bytes().to_vec();
        let store = self.store.clone();
        task::spawn_blocking(move || store.remove(key)).await??;
        Ok(())
    }
}

/// Spread expiries of entries written together by +/-10 %.
pub fn jittered(ttl: Duration) -> Duration {
    let jitter: f32 = rand::rng().random_range(0.9..1.1);
    ttl.mul_f32(jitter)
}

/// Look `key` up in the optional cache, falling back to `fetch` and storing its result.
///
/// Cache failures are logged and treated as misses.
pub async fn cached<T, F, Fut>(
    cache: Option<&PersistentCache>,
    key: &str,
    ttl: Duration,
    fetch: F,
) -> Result<T>
where
    T: Serialize + DeserializeOwned + Clone + Debug + Send + 'static,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let Some(cache) = cache else {
        return fetch().await;
    };

    match cache.get::<T>(key).await {
        Ok(Some(hit)) => return Ok(hit),
        Ok(None) => {}
        Err(e) => tracing::warn!("Cache read failed for {key}: {e}"),
    }

    let value = fetch().await?;
    if let Err(e) = cache.put(key, value.clone(), jittered(ttl)).await {
        tracing::warn!("Cache write failed for {key}: {e}");
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_remove() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PersistentCache::open(dir.path()).unwrap();

        cache
            .put("forecast:paris", vec![1.5_f64, 2.5], Duration::from_secs(60))
            .await
            .unwrap();
        let hit: Option<Vec<f64>> = cache.get("forecast:paris").await.unwrap();
        assert_eq!(hit, Some(vec![1.5, 2.5]));

        cache.remove("forecast:paris").await.unwrap();
        let miss: Option<Vec<f64>> = cache.get("forecast:paris").await.unwrap();
        assert!(miss.is_none());
    }

    #[tokio::test]
    async fn test_expired_entry_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PersistentCache::open(dir.path()).unwrap();

        cache
            .put("stale", "old".to_string(), Duration::ZERO)
            .await
            .unwrap();
        let value: Option<String> = cache.get("stale").await.unwrap();
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn test_cached_only_fetches_once() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PersistentCache::open(dir.path()).unwrap();
        let calls = std::sync::atomic::AtomicUsize::new(0);
        let counter = &calls;

        for _ in 0..3 {
            let value = cached(Some(&cache), "answer", Duration::from_secs(60), move || async move {
                counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                Ok(42_u32)
            })
            .await
            .unwrap();
            assert_eq!(value, 42);
        }
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cached_without_cache_always_fetches() {
        let value = cached(None, "k", Duration::from_secs(1), || async { Ok("fresh".to_string()) })
            .await
            .unwrap();
        assert_eq!(value, "fresh");
    }

    #[test]
    fn test_jitter_bounds() {
        let base = Duration::from_secs(1000);
        for _ in 0..50 {
            let ttl = jittered(base);
            assert!(ttl >= Duration::from_secs(899) && ttl <= Duration::from_secs(1101));
        }
    }
}
