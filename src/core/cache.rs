use async_trait::async_trait;

/// A key-value memo. Implementations decide on eviction; the default
/// [`crate::store::memory::MemoryCache`] keeps entries for the lifetime of
/// the process.
#[async_trait]
pub trait Cache<K, V>: Send + Sync
where
    K: Send + Sync,
    V: Send + Sync,
{
    async fn get(&self, key: &K) -> Option<V>;
    async fn put(&self, key: K, value: V);
}
