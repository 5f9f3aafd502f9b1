//! Hybrid search orchestrator
//!
//! ```text
//! query ──► QueryExpander ──► LexicalRetriever ──┐  (× lexical_overfetch)
//!   │                                             ├─► fuse ──► ItemStore hydrate
//!   └──► EmbeddingProvider ──► VectorIndex ──────┘  (× visual_overfetch)
//! ```
//!
//! Both retrievals run concurrently. Failures on either side degrade that
//! signal to [`Signal::Unavailable`] instead of failing the search.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, warn};

use crate::config::SearchConfig;
use crate::core::{Item, ItemId};
use crate::error::Result;
use crate::search::cache::EmbeddingCache;
use crate::search::embeddings::EmbeddingProvider;
use crate::search::expand::{ExpandedQuery, QueryExpander};
use crate::search::fusion::{FusedResult, FusionWeights, Signal, fuse_scored};
use crate::search::lexical::{LexicalRetriever, retrieve_with_fallback};
use crate::search::synonyms::{self, SynonymTable};
use crate::search::vector::{LinearScan, VectorIndex};
use crate::storage::ItemStore;

/// Tunables taken from `[search]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchOptions {
    pub max_limit: usize,
    pub results_per_page: usize,
    pub lexical_overfetch: usize,
    pub visual_overfetch: usize,
    pub weights: FusionWeights,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self::from(&SearchConfig::default())
    }
}

impl From<&SearchConfig> for SearchOptions {
    fn from(config: &SearchConfig) -> Self {
        Self {
            max_limit: config.max_limit,
            results_per_page: config.results_per_page,
            lexical_overfetch: config.lexical_overfetch,
            visual_overfetch: config.visual_overfetch,
            weights: FusionWeights::new(config.text_weight, config.visual_weight),
        }
    }
}

/// A caller request. Unset fields fall back to [`SearchOptions`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchRequest {
    pub query: String,
    pub limit: Option<usize>,
    /// Only applies to browsing (blank query).
    pub offset: usize,
    pub weights: Option<FusionWeights>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub const fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    #[must_use]
    pub const fn weights(mut self, weights: FusionWeights) -> Self {
        self.weights = Some(weights);
        self
    }
}

/// Diagnostics for one ranked search.
#[derive(Debug, Clone, Serialize)]
pub struct RankedSearch {
    pub expression: String,
    pub lexical_state: &'static str,
    pub lexical_hits: usize,
    pub visual_state: &'static str,
    pub visual_hits: usize,
    /// Weights after the visual fallback rule.
    pub weights: FusionWeights,
    pub results: Vec<FusedResult>,
}

impl RankedSearch {
    pub fn ids(&self) -> Vec<ItemId> {
        self.results.iter().map(|r| r.item_id).collect()
    }
}

pub struct HybridSearcher {
    store: Arc<dyn ItemStore>,
    lexical: Arc<dyn LexicalRetriever>,
    provider: Option<Arc<dyn EmbeddingProvider>>,
    cache: Arc<EmbeddingCache>,
    vectors: Arc<dyn VectorIndex>,
    synonyms: &'static SynonymTable,
    options: SearchOptions,
}

impl std::fmt::Debug for HybridSearcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HybridSearcher")
            .field("lexical", &self.lexical.name())
            .field("provider", &self.provider.as_ref().map(|p| p.name()))
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl HybridSearcher {
    pub fn new(
        store: Arc<dyn ItemStore>,
        lexical: Arc<dyn LexicalRetriever>,
        provider: Option<Arc<dyn EmbeddingProvider>>,
        cache: Arc<EmbeddingCache>,
        options: SearchOptions,
    ) -> Self {
        let vectors: Arc<dyn VectorIndex> = Arc::new(LinearScan::new(Arc::clone(&cache)));
        Self {
            store,
            lexical,
            provider,
            cache,
            vectors,
            synonyms: synonyms::catalog(),
            options,
        }
    }

    /// Swap the vector retriever (the cache stays owned by this searcher).
    #[must_use]
    pub fn with_vector_index(mut self, vectors: Arc<dyn VectorIndex>) -> Self {
        self.vectors = vectors;
        self
    }

    #[must_use]
    pub fn with_synonyms(mut self, synonyms: &'static SynonymTable) -> Self {
        self.synonyms = synonyms;
        self
    }

    pub const fn options(&self) -> &SearchOptions {
        &self.options
    }

    pub fn cache(&self) -> &Arc<EmbeddingCache> {
        &self.cache
    }

    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    /// Cap a caller limit at `max_limit`.
    pub fn clamp_limit(&self, limit: usize) -> usize {
        limit.min(self.options.max_limit)
    }

    pub fn expand(&self, query: &str) -> ExpandedQuery {
        QueryExpander::new(self.synonyms).expand(query)
    }

    /// Ranked items for `query`; a blank query browses from the start.
    pub fn hybrid_search(
        &self,
        query: &str,
        weights: FusionWeights,
        limit: usize,
    ) -> Result<Vec<Item>> {
        if query.trim().is_empty() {
            return self.browse(limit, 0);
        }
        let ranked = self.hybrid_search_scored(query, weights, limit)?;
        self.store.fetch_items_by_ids(&ranked.ids())
    }

    /// Entry point honoring request defaults and browse offsets.
    pub fn search(&self, request: &SearchRequest) -> Result<Vec<Item>> {
        let limit = request.limit.unwrap_or(self.options.results_per_page);
        if request.query.trim().is_empty() {
            return self.browse(limit, request.offset);
        }
        let weights = request.weights.unwrap_or(self.options.weights);
        self.hybrid_search(&request.query, weights, limit)
    }

    /// Rank without hydrating; exposes per-signal components.
    pub fn hybrid_search_scored(
        &self,
        query: &str,
        weights: FusionWeights,
        limit: usize,
    ) -> Result<RankedSearch> {
        let started = Instant::now();
        let limit = self.clamp_limit(limit);
        let expanded = self.expand(query);
        let expression = expanded.to_query_string();

        if limit == 0 {
            return Ok(RankedSearch {
                expression,
                lexical_state: Signal::<()>::Empty.label(),
                lexical_hits: 0,
                visual_state: Signal::<()>::Empty.label(),
                visual_hits: 0,
                weights: FusionWeights::LEXICAL_ONLY,
                results: Vec::new(),
            });
        }

        let lexical_window = limit.saturating_mul(self.options.lexical_overfetch);
        let visual_window = limit.saturating_mul(self.options.visual_overfetch);

        // Punctuation-only queries tokenize to nothing; only the visual side can match.
        let (lexical, visual) = rayon::join(
            || {
                if expanded.is_empty() {
                    Signal::Empty
                } else {
                    self.lexical_signal(&expanded, lexical_window)
                }
            },
            || self.visual_signal(query, visual_window),
        );

        let results = fuse_scored(&lexical, &visual, weights, limit);
        debug!(
            query,
            lexical = lexical.label(),
            lexical_hits = lexical.results().len(),
            visual = visual.label(),
            visual_hits = visual.results().len(),
            results = results.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "hybrid search"
        );

        Ok(RankedSearch {
            expression,
            lexical_state: lexical.label(),
            lexical_hits: lexical.results().len(),
            visual_state: visual.label(),
            visual_hits: visual.results().len(),
            weights: weights.effective(&visual),
            results,
        })
    }

    /// A page of items ordered by name; no ranking.
    pub fn browse(&self, limit: usize, offset: usize) -> Result<Vec<Item>> {
        let limit = self.clamp_limit(limit);
        if limit == 0 {
            return Ok(Vec::new());
        }
        self.store.fetch_all_items(limit, offset)
    }

    pub fn filter_by_category(&self, category: &str, limit: usize) -> Result<Vec<Item>> {
        let limit = self.clamp_limit(limit);
        if limit == 0 {
            return Ok(Vec::new());
        }
        self.store.items_in_category(category, limit)
    }

    pub fn categories(&self) -> Result<Vec<String>> {
        self.store.categories()
    }

    pub fn item_count(&self) -> Result<usize> {
        self.store.item_count()
    }

    /// Load the embedding cache now; returns the number of cached vectors.
    pub fn warm(&self) -> Result<usize> {
        Ok(self.cache.load()?.len())
    }

    /// Forget cached embeddings after the underlying items changed.
    pub fn invalidate_embeddings(&self) {
        self.cache.invalidate();
    }

    fn lexical_signal(&self, expanded: &ExpandedQuery, window: usize) -> Signal<(ItemId, f32)> {
        match retrieve_with_fallback(self.lexical.as_ref(), expanded, window) {
            Ok(hits) => Signal::from_results(hits),
            Err(err) => {
                warn!(backend = self.lexical.name(), error = %err, "lexical signal unavailable");
                Signal::Unavailable
            }
        }
    }

    fn visual_signal(&self, query: &str, window: usize) -> Signal<(ItemId, f32)> {
        let Some(provider) = &self.provider else {
            return Signal::Unavailable;
        };

        let vector = match provider.embed_text(query) {
            Ok(vector) => vector,
            Err(err) => {
                warn!(provider = provider.name(), error = %err, "query embedding failed");
                return Signal::Unavailable;
            }
        };

        match self.vectors.search(&vector, window) {
            Ok(hits) => Signal::from_results(hits),
            Err(err) => {
                warn!(error = %err, "vector retrieval failed");
                Signal::Unavailable
            }
        }
    }
}
