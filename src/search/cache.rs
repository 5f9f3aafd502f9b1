//! Embedding cache
//!
//! Holds every `(item_id, vector)` pair the store has, so vector retrieval
//! never touches the database on the hot path. Readers get an `Arc` to an
//! immutable snapshot; loads build a complete replacement and swap it in,
//! so a partially loaded list is never visible.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::core::ItemId;
use crate::error::Result;

/// One cached vector. Vectors are unit length by provider contract.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedEmbedding {
    pub item_id: ItemId,
    pub vector: Vec<f32>,
}

/// Immutable snapshot handed to readers.
pub type EmbeddingSnapshot = Arc<Vec<CachedEmbedding>>;

/// Enumerates stored embeddings.
pub trait EmbeddingSource: Send + Sync {
    /// Every item that currently has a stored vector.
    fn fetch_all_embeddings(&self) -> Result<Vec<(ItemId, Vec<f32>)>>;
}

/// Cache lifecycle counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub loads: u64,
    pub invalidations: u64,
    pub entries: usize,
    pub skipped: usize,
}

/// Explicitly owned embedding cache with `load` / `invalidate` / `get_or_load`.
pub struct EmbeddingCache {
    source: Arc<dyn EmbeddingSource>,
    /// Entries with a different length are skipped at load time.
    expected_dims: Option<usize>,
    snapshot: RwLock<Option<EmbeddingSnapshot>>,
    /// Serializes loaders so concurrent misses trigger one fetch.
    load_lock: Mutex<()>,
    /// Bumped by `invalidate`; a load that raced an invalidation does not install.
    generation: AtomicU64,
    stats: Mutex<CacheStats>,
}

impl std::fmt::Debug for EmbeddingCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingCache")
            .field("expected_dims", &self.expected_dims)
            .field("loaded", &self.is_loaded())
            .finish_non_exhaustive()
    }
}

impl EmbeddingCache {
    pub fn new(source: Arc<dyn EmbeddingSource>, expected_dims: Option<usize>) -> Self {
        Self {
            source,
            expected_dims,
            snapshot: RwLock::new(None),
            load_lock: Mutex::new(()),
            generation: AtomicU64::new(0),
            stats: Mutex::new(CacheStats::default()),
        }
    }

    /// The current snapshot, without loading.
    pub fn get(&self) -> Option<EmbeddingSnapshot> {
        self.snapshot.read().clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.snapshot.read().is_some()
    }

    /// Return the cached list, loading it first if unset.
    pub fn get_or_load(&self) -> Result<EmbeddingSnapshot> {
        if let Some(snapshot) = self.get() {
            return Ok(snapshot);
        }

        let _guard = self.load_lock.lock();
        // Another caller may have finished loading while we waited.
        if let Some(snapshot) = self.get() {
            return Ok(snapshot);
        }
        self.load_locked()
    }

    /// Reload unconditionally from the source.
    pub fn load(&self) -> Result<EmbeddingSnapshot> {
        let _guard = self.load_lock.lock();
        self.load_locked()
    }

    /// Drop the cached list; the next `get_or_load` reloads.
    pub fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let previous = self.snapshot.write().take();
        self.stats.lock().invalidations += 1;
        info!(
            dropped = previous.map_or(0, |s| s.len()),
            "embedding cache invalidated"
        );
    }

    pub fn stats(&self) -> CacheStats {
        *self.stats.lock()
    }

    fn load_locked(&self) -> Result<EmbeddingSnapshot> {
        let started = Instant::now();
        let generation = self.generation.load(Ordering::SeqCst);
        let rows = self.source.fetch_all_embeddings()?;
        let total = rows.len();

        let entries: Vec<CachedEmbedding> = rows
            .into_iter()
            .filter(|(id, vector)| match self.expected_dims {
                Some(dims) if vector.len() != dims => {
                    warn!(
                        item_id = id,
                        expected = dims,
                        actual = vector.len(),
                        "skipping embedding with wrong dimensionality"
                    );
                    false
                }
                _ => true,
            })
            .map(|(item_id, vector)| CachedEmbedding { item_id, vector })
            .collect();

        let skipped = total - entries.len();
        let snapshot: EmbeddingSnapshot = Arc::new(entries);

        if self.generation.load(Ordering::SeqCst) == generation {
            *self.snapshot.write() = Some(Arc::clone(&snapshot));
        } else {
            debug!("cache invalidated during load; serving result without installing it");
        }

        {
            let mut stats = self.stats.lock();
            stats.loads += 1;
            stats.entries = snapshot.len();
            stats.skipped = skipped;
        }

        info!(
            entries = snapshot.len(),
            skipped,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "embedding cache loaded"
        );
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    use crate::error::InvError;

    struct CountingSource {
        rows: Mutex<Vec<(ItemId, Vec<f32>)>>,
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingSource {
        fn new(rows: Vec<(ItemId, Vec<f32>)>) -> Arc<Self> {
            Arc::new(Self {
                rows: Mutex::new(rows),
                calls: AtomicUsize::new(0),
                fail: false,
            })
        }
    }

    impl EmbeddingSource for CountingSource {
        fn fetch_all_embeddings(&self) -> Result<Vec<(ItemId, Vec<f32>)>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(InvError::Serialization("boom".into()));
            }
            Ok(self.rows.lock().clone())
        }
    }

    #[test]
    fn get_or_load_loads_once() {
        let source = CountingSource::new(vec![(1, vec![1.0, 0.0]), (2, vec![0.0, 1.0])]);
        let cache = EmbeddingCache::new(source.clone(), Some(2));

        assert!(cache.get().is_none());
        let first = cache.get_or_load().unwrap();
        let second = cache.get_or_load().unwrap();

        assert_eq!(first.len(), 2);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn invalidate_forces_reload_with_new_data() {
        let source = CountingSource::new(vec![(1, vec![1.0])]);
        let cache = EmbeddingCache::new(source.clone(), None);
        assert_eq!(cache.get_or_load().unwrap().len(), 1);

        source.rows.lock().push((2, vec![0.5]));
        assert_eq!(cache.get_or_load().unwrap().len(), 1, "still cached");

        cache.invalidate();
        assert!(!cache.is_loaded());
        assert_eq!(cache.get_or_load().unwrap().len(), 2);
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);

        let stats = cache.stats();
        assert_eq!(stats.loads, 2);
        assert_eq!(stats.invalidations, 1);
        assert_eq!(stats.entries, 2);
    }

    #[test]
    fn wrong_dimension_entries_are_skipped() {
        let source = CountingSource::new(vec![
            (1, vec![1.0, 0.0]),
            (2, vec![1.0]),
            (3, vec![0.0, 1.0]),
        ]);
        let cache = EmbeddingCache::new(source, Some(2));
        let snapshot = cache.get_or_load().unwrap();
        let ids: Vec<ItemId> = snapshot.iter().map(|e| e.item_id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(cache.stats().skipped, 1);
    }

    #[test]
    fn empty_source_yields_empty_snapshot() {
        let cache = EmbeddingCache::new(CountingSource::new(Vec::new()), Some(4));
        assert!(cache.get_or_load().unwrap().is_empty());
        assert!(cache.is_loaded());
    }

    #[test]
    fn load_failure_propagates_and_leaves_cache_unset() {
        let source = Arc::new(CountingSource {
            rows: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            fail: true,
        });
        let cache = EmbeddingCache::new(source, None);
        assert!(cache.get_or_load().is_err());
        assert!(!cache.is_loaded());
    }

    #[test]
    fn concurrent_readers_see_complete_snapshots() {
        let rows: Vec<(ItemId, Vec<f32>)> = (0..500).map(|i| (i, vec![1.0, 0.0])).collect();
        let source = CountingSource::new(rows);
        let cache = Arc::new(EmbeddingCache::new(source.clone(), Some(2)));

        let handles: Vec<_> = (0..8)
            .map(|n| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for i in 0..20 {
                        if n == 0 && i % 5 == 0 {
                            cache.invalidate();
                        }
                        let snapshot = cache.get_or_load().unwrap();
                        assert_eq!(snapshot.len(), 500);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert!(source.calls.load(Ordering::SeqCst) >= 1);
    }
}
