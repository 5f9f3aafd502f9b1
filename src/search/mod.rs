//! Search engine for the item catalog
//!
//! Implements hybrid search: synonym-expanded lexical retrieval plus
//! embedding similarity, fused by weighted normalized scores.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                        Search Query                            │
//! └────────────────────────────────────────────────────────────────┘
//!                     │                          │
//!                     ▼                          ▼
//! ┌──────────────────────────────┐  ┌──────────────────────────────┐
//! │  QueryExpander (synonyms)    │  │  EmbeddingProvider           │
//! │  LexicalRetriever            │  │  VectorIndex over            │
//! │  (FTS5 or Tantivy BM25)      │  │  EmbeddingCache              │
//! └──────────────────────────────┘  └──────────────────────────────┘
//!                     │                          │
//!                     └──────────┬───────────────┘
//!                                ▼
//!                ┌───────────────────────────────┐
//!                │   Weighted fusion (fusion.rs) │
//!                └───────────────────────────────┘
//!                                │
//!                                ▼
//!                 Ranked ids, hydrated by ItemStore
//! ```

pub mod cache;
pub mod embeddings;
pub mod expand;
pub mod fusion;
pub mod hybrid;
pub mod lexical;
pub mod synonyms;
pub mod tantivy;
pub mod vector;

// Re-export main types
pub use cache::{CacheStats, CachedEmbedding, EmbeddingCache, EmbeddingSource};
pub use embeddings::{EmbeddingProvider, HashEmbedder, HttpEmbedder, build_provider};
pub use expand::{ExpandedQuery, LexicalTerm, QueryExpander};
pub use fusion::{FusedResult, FusionWeights, Signal, fuse, fuse_scored};
pub use hybrid::{HybridSearcher, RankedSearch, SearchOptions, SearchRequest};
pub use lexical::{LexicalRetriever, retrieve_with_fallback};
pub use synonyms::SynonymTable;
pub use tantivy::Bm25Index;
pub use vector::{LinearScan, VectorIndex};
