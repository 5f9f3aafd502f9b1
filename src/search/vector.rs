//! Vector retrieval over cached embeddings.
//!
//! [`LinearScan`] scores every cached vector against the query. Vectors are
//! unit length, so the dot product is the cosine similarity. Callers only
//! see [`VectorIndex`], so an approximate index can replace the scan later
//! without touching the orchestrator.

use std::sync::Arc;

use rayon::prelude::*;

use crate::core::ItemId;
use crate::error::Result;
use crate::search::cache::{CachedEmbedding, EmbeddingCache};
use crate::search::embeddings::dot_product;

/// Below this many entries the scan stays on the calling thread.
const PARALLEL_THRESHOLD: usize = 2_048;

pub trait VectorIndex: Send + Sync {
    /// Top `limit` `(id, similarity)` pairs, highest first.
    fn search(&self, query: &[f32], limit: usize) -> Result<Vec<(ItemId, f32)>>;
}

/// Exhaustive scan over the embedding cache.
#[derive(Debug, Clone)]
pub struct LinearScan {
    cache: Arc<EmbeddingCache>,
}

impl LinearScan {
    pub const fn new(cache: Arc<EmbeddingCache>) -> Self {
        Self { cache }
    }
}

impl VectorIndex for LinearScan {
    fn search(&self, query: &[f32], limit: usize) -> Result<Vec<(ItemId, f32)>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let snapshot = self.cache.get_or_load()?;
        Ok(top_k(&snapshot, query, limit))
    }
}

/// Score `entries` against `query`, keeping the best `limit`.
///
/// Entries whose length differs from the query are skipped. Equal scores
/// keep cache order.
pub fn top_k(entries: &[CachedEmbedding], query: &[f32], limit: usize) -> Vec<(ItemId, f32)> {
    let score = |entry: &CachedEmbedding| {
        (entry.vector.len() == query.len())
            .then(|| (entry.item_id, dot_product(query, &entry.vector).clamp(-1.0, 1.0)))
    };

    let mut scored: Vec<(ItemId, f32)> = if entries.len() >= PARALLEL_THRESHOLD {
        entries.par_iter().filter_map(score).collect()
    } else {
        entries.iter().filter_map(score).collect()
    };

    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(limit);
    scored
}
