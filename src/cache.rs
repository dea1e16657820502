use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::classify::CatalogItem;

/// Identity of one cached catalog: the catalog id prefix plus the account token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    key: String,
    prefix_len: usize,
}

impl CacheKey {
    pub fn new(id_prefix: &str, token: &str) -> Self {
        Self {
            key: format!("{id_prefix}{token}"),
            prefix_len: id_prefix.len(),
        }
    }
}

impl fmt::Display for CacheKey {
    // Tokens stay out of the logs.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}…", &self.key[..self.prefix_len])
    }
}

#[derive(Debug)]
struct CacheEntry {
    items: Arc<Vec<CatalogItem>>,
    written_at: Instant,
}

/// Time-bounded snapshots of catalog listings.
///
/// Entries are replaced wholesale and never mutated. Concurrent misses for the same key each
/// fetch and write; the last write wins.
#[derive(Debug, Clone)]
pub struct CatalogCache {
    name: &'static str,
    lifetime: Duration,
    entries: Arc<RwLock<HashMap<CacheKey, CacheEntry>>>,
}

impl CatalogCache {
    pub fn new(name: &'static str, lifetime: Duration) -> Self {
        Self {
            name,
            lifetime,
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn get(&self, key: &CacheKey) -> Option<Arc<Vec<CatalogItem>>> {
        let guard = self.entries.read().await;
        let entry = guard.get(key)?;
        if entry.written_at.elapsed() >= self.lifetime {
            trace!(cache = self.name, key = %key, "cache entry expired");
            return None;
        }
        Some(entry.items.clone())
    }

    pub async fn put(&self, key: CacheKey, items: Arc<Vec<CatalogItem>>) {
        let now = Instant::now();
        let mut guard = self.entries.write().await;

        let before = guard.len();
        guard.retain(|_, entry| now.duration_since(entry.written_at) < self.lifetime);
        let swept = before - guard.len();

        debug!(
            cache = self.name,
            key = %key,
            items = items.len(),
            swept,
            "storing catalog snapshot"
        );
        guard.insert(
            key,
            CacheEntry {
                items,
                written_at: now,
            },
        );
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}
