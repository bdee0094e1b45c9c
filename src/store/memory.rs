use crate::core::cache::Cache;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use tokio::sync::Mutex;
use tracing::debug;

/// Unbounded in-memory cache. Entries live as long as the process; a put on
/// an existing key replaces the value.
pub struct MemoryCache<K, V> {
    entries: Mutex<HashMap<K, V>>,
}

impl<K, V> MemoryCache<K, V>
where
    K: Eq + Hash + Send + Sync,
    V: Clone + Send + Sync,
{
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

impl<K, V> Default for MemoryCache<K, V>
where
    K: Eq + Hash + Send + Sync,
    V: Clone + Send + Sync,
{
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<K, V> Cache<K, V> for MemoryCache<K, V>
where
    K: Eq + Hash + Send + Sync + Debug + 'static,
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &K) -> Option<V> {
        let value = self.entries.lock().await.get(key).cloned();
        let outcome = if value.is_some() { "HIT" } else { "MISS" };
        debug!("Cache {} for key: {:?}", outcome, key);
        value
    }

    async fn put(&self, key: K, value: V) {
        debug!("Cache PUT for key: {:?}", key);
        self.entries.lock().await.insert(key, value);
    }
}
