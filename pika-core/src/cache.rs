//! In-memory TTL cache.
//!
//! Holds the latest reported state per agent so reads never touch the
//! time-series store. Entries expire after a period of silence; the deadline
//! is refreshed on every update, so an agent that keeps reporting never
//! falls out.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::debug;

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

impl<V> Entry<V> {
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Concurrent map with per-entry expiry. Cloning shares the same underlying
/// map.
pub struct TtlCache<K, V> {
    entries: Arc<RwLock<HashMap<K, Entry<V>>>>,
}

impl<K, V> Clone for TtlCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
        }
    }
}

impl<K, V> Default for TtlCache<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn insert(&self, key: K, value: V, ttl: Duration) {
        let mut entries = self.entries.write().await;
        entries.insert(
            key,
            Entry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    /// Returns a clone of the live value. An expired entry reads as absent
    /// even before the reaper has swept it.
    pub async fn get(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some(entry) if !entry.is_expired() => Some(entry.value.clone()),
            _ => None,
        }
    }

    /// Mutates the entry in place, creating it from `Default` when absent,
    /// and pushes the expiry deadline out by `ttl`.
    pub async fn update_with<F>(&self, key: K, ttl: Duration, f: F)
    where
        V: Default,
        F: FnOnce(&mut V),
    {
        let mut entries = self.entries.write().await;
        let entry = entries.entry(key).or_insert_with(|| Entry {
            value: V::default(),
            expires_at: Instant::now() + ttl,
        });
        f(&mut entry.value);
        entry.expires_at = Instant::now() + ttl;
    }

    pub async fn remove(&self, key: &K) -> Option<V> {
        let mut entries = self.entries.write().await;
        entries.remove(key).map(|entry| entry.value)
    }

    /// Drops every expired entry and returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired());
        before - entries.len()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    /// Spawns a periodic sweep so entries for silent agents do not pile up
    /// between reads. The task runs until the handle is dropped or aborted.
    pub fn spawn_reaper(&self, every: Duration) -> JoinHandle<()> {
        let cache = self.clone();
        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(every);

            // Don't immediately tick - wait for first interval
            interval_timer.tick().await;

            loop {
                interval_timer.tick().await;
                let purged = cache.purge_expired().await;
                if purged > 0 {
                    debug!(purged, "Purged expired cache entries");
                }
            }
        })
    }
}
