//! Weighted score fusion for hybrid search
//!
//! Combines lexical relevance with visual similarity by normalizing each
//! signal independently and summing them with caller-supplied weights.
//!
//! ## Algorithm
//!
//! ```text
//! lex(d)   = |raw_lex(d)| / max |raw_lex|            (max 0 → 1.0)
//! vis(d)   = (raw_vis(d) - min) / (max - min)        (range 0 → 1.0)
//! fused(d) = text_weight · lex(d) + visual_weight · vis(d)
//! ```
//!
//! An id present in only one signal contributes 0.0 for the other. When the
//! visual signal carries no results the weights collapse to text 1.0,
//! visual 0.0 for that call.

use std::collections::HashMap;

use serde::Serialize;

use crate::core::ItemId;

/// Outcome of one retrieval signal for one query.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal<T> {
    /// The capability is absent or failed for this call.
    Unavailable,
    /// The capability ran and found nothing.
    Empty,
    Results(Vec<T>),
}

impl<T> Signal<T> {
    /// `Results(vec![])` collapses to `Empty`.
    pub fn from_results(results: Vec<T>) -> Self {
        if results.is_empty() {
            Self::Empty
        } else {
            Self::Results(results)
        }
    }

    pub fn results(&self) -> &[T] {
        match self {
            Self::Results(results) => results,
            Self::Unavailable | Self::Empty => &[],
        }
    }

    pub fn has_results(&self) -> bool {
        !self.results().is_empty()
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Unavailable => "unavailable",
            Self::Empty => "empty",
            Self::Results(_) => "results",
        }
    }
}

/// Caller-supplied fusion weights.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FusionWeights {
    pub text: f32,
    pub visual: f32,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self {
            text: 0.4,
            visual: 0.6,
        }
    }
}

impl FusionWeights {
    pub const LEXICAL_ONLY: Self = Self {
        text: 1.0,
        visual: 0.0,
    };

    pub fn new(text: f32, visual: f32) -> Self {
        Self { text, visual }
    }

    /// Weights actually applied given the state of the visual signal.
    pub fn effective<T>(self, visual: &Signal<T>) -> Self {
        if visual.has_results() {
            self
        } else {
            Self::LEXICAL_ONLY
        }
    }
}

/// One fused candidate with its normalized components.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FusedResult {
    pub item_id: ItemId,
    pub score: f32,
    /// Normalized lexical score; `None` if absent from the lexical signal.
    pub lexical: Option<f32>,
    /// Normalized visual score; `None` if absent from the visual signal.
    pub visual: Option<f32>,
}

/// Scale lexical scores by the largest magnitude into `[0, 1]`.
pub fn normalize_lexical(results: &[(ItemId, f32)]) -> Vec<(ItemId, f32)> {
    let max = results
        .iter()
        .map(|(_, score)| score.abs())
        .fold(0.0_f32, f32::max);
    let denom = if max > 0.0 { max } else { 1.0 };
    results
        .iter()
        .map(|(id, score)| (*id, score.abs() / denom))
        .collect()
}

/// Min-max scale visual scores into `[0, 1]`, relative to this result set.
pub fn normalize_visual(results: &[(ItemId, f32)]) -> Vec<(ItemId, f32)> {
    let Some(first) = results.first().map(|(_, score)| *score) else {
        return Vec::new();
    };
    let (min, max) = results
        .iter()
        .fold((first, first), |(lo, hi), (_, score)| {
            (lo.min(*score), hi.max(*score))
        });
    let range = max - min;
    let denom = if range > 0.0 { range } else { 1.0 };
    results
        .iter()
        .map(|(id, score)| (*id, (score - min) / denom))
        .collect()
}

/// Fuse both signals and return the top `limit` candidates.
///
/// Ordering is stable for equal scores: lexical order first, then ids that
/// only the visual signal produced, in visual order.
pub fn fuse_scored(
    lexical: &Signal<(ItemId, f32)>,
    visual: &Signal<(ItemId, f32)>,
    weights: FusionWeights,
    limit: usize,
) -> Vec<FusedResult> {
    if limit == 0 {
        return Vec::new();
    }

    let weights = weights.effective(visual);
    let lex = normalize_lexical(lexical.results());
    let vis = normalize_visual(visual.results());

    let mut order: Vec<ItemId> = Vec::with_capacity(lex.len() + vis.len());
    let mut components: HashMap<ItemId, (Option<f32>, Option<f32>)> =
        HashMap::with_capacity(lex.len() + vis.len());

    for (id, score) in lex {
        let entry = components.entry(id).or_insert_with(|| {
            order.push(id);
            (None, None)
        });
        // First occurrence wins if the retriever repeated an id.
        entry.0.get_or_insert(score);
    }
    for (id, score) in vis {
        let entry = components.entry(id).or_insert_with(|| {
            order.push(id);
            (None, None)
        });
        entry.1.get_or_insert(score);
    }

    let mut results: Vec<FusedResult> = order
        .into_iter()
        .map(|item_id| {
            let (lexical, visual) = components.get(&item_id).copied().unwrap_or_default();
            let score = weights.text * lexical.unwrap_or(0.0)
                + weights.visual * visual.unwrap_or(0.0);
            FusedResult {
                item_id,
                score,
                lexical,
                visual,
            }
        })
        .collect();

    results.sort_by(|a, b| b.score.total_cmp(&a.score));
    results.truncate(limit);
    results
}

/// Fuse both signals and return only the ranked ids.
pub fn fuse(
    lexical: &Signal<(ItemId, f32)>,
    visual: &Signal<(ItemId, f32)>,
    weights: FusionWeights,
    limit: usize,
) -> Vec<ItemId> {
    fuse_scored(lexical, visual, weights, limit)
        .into_iter()
        .map(|r| r.item_id)
        .collect()
}
