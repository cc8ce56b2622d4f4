use std::collections::HashMap;

use tokio::sync::RwLock;
use tracing::{debug, info};

/// Rendered HTML keyed by request path.
///
/// Every revalidation bumps a generation counter. A render started before a
/// revalidation carries the older generation and is not stored.
#[derive(Default)]
pub struct PageCache {
    state: RwLock<CacheState>,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<String, String>,
    generation: u64,
}

impl PageCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, path: &str) -> Option<String> {
        let hit = self.state.read().await.entries.get(path).cloned();
        debug!(path, hit = hit.is_some(), "page cache lookup");
        hit
    }

    /// Current generation; pass it back to [`PageCache::insert_if_current`].
    pub async fn generation(&self) -> u64 {
        self.state.read().await.generation
    }

    #[cfg(test)]
    pub async fn insert(&self, path: &str, html: String) {
        self.state.write().await.entries.insert(path.to_string(), html);
    }

    /// Store `html` only if no revalidation happened since `generation` was
    /// read. Returns whether it was stored.
    pub async fn insert_if_current(&self, path: &str, html: String, generation: u64) -> bool {
        let mut state = self.state.write().await;
        if state.generation != generation {
            debug!(path, generation, current = state.generation, "discarding stale render");
            return false;
        }
        state.entries.insert(path.to_string(), html);
        true
    }

    /// Drop the cached page so the next request re-fetches it. Returns
    /// whether anything was cached.
    pub async fn revalidate(&self, path: &str) -> bool {
        let mut state = self.state.write().await;
        state.generation += 1;
        let removed = state.entries.remove(path).is_some();
        info!(path, removed, "revalidated");
        removed
    }
}
