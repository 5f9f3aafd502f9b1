//! Lexical retrieval seam.
//!
//! Backends take the OR-expression produced by the expander and return
//! `(id, score)` pairs best-first. Score sign and magnitude are backend
//! specific; fusion only looks at magnitudes.

use tracing::{debug, warn};

use crate::core::ItemId;
use crate::error::{InvError, Result};
use crate::search::expand::ExpandedQuery;
use crate::storage::Database;

pub trait LexicalRetriever: Send + Sync {
    fn name(&self) -> &'static str;

    /// Run an OR-expression, returning at most `limit` hits best-first.
    fn retrieve(&self, query: &str, limit: usize) -> Result<Vec<(ItemId, f32)>>;
}

impl LexicalRetriever for Database {
    fn name(&self) -> &'static str {
        "fts5"
    }

    fn retrieve(&self, query: &str, limit: usize) -> Result<Vec<(ItemId, f32)>> {
        self.text_search(query, limit)
    }
}

/// Run the expanded query; if the backend rejects it, retry once with the
/// unwildcarded raw words.
///
/// Returns [`InvError::LexicalRetrieval`] only when both attempts fail.
pub fn retrieve_with_fallback(
    retriever: &dyn LexicalRetriever,
    expanded: &ExpandedQuery,
    limit: usize,
) -> Result<Vec<(ItemId, f32)>> {
    let query = expanded.to_query_string();
    if query.is_empty() || limit == 0 {
        return Ok(Vec::new());
    }

    let first_error = match retriever.retrieve(&query, limit) {
        Ok(hits) => {
            debug!(backend = retriever.name(), hits = hits.len(), "lexical retrieval");
            return Ok(hits);
        }
        Err(err) => err,
    };

    let fallback = expanded.fallback_query();
    warn!(
        backend = retriever.name(),
        error = %first_error,
        fallback = %fallback,
        "expanded query rejected; retrying with raw terms"
    );

    retriever.retrieve(&fallback, limit).map_err(|err| {
        InvError::LexicalRetrieval(format!(
            "{} rejected both {query:?} ({first_error}) and fallback {fallback:?} ({err})",
            retriever.name()
        ))
    })
}
