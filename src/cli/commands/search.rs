//! invs search - Rank items for a free-text query
//!
//! Lexical (synonym-expanded) and visual (embedding) signals are fused by
//! weighted normalized scores. `--explain` shows the per-signal components.

use std::collections::HashMap;

use clap::Args;
use serde::Serialize;

use crate::app::AppContext;
use crate::cli::commands::{ITEM_TSV_HEADERS, emit_items, item_line, item_row};
use crate::cli::output::{
    HumanLayout, OutputFormat, emit_human, emit_json, emit_jsonl, emit_tsv, robot_ok,
};
use crate::core::{Item, ItemId};
use crate::error::{InvError, Result};
use crate::search::{FusedResult, FusionWeights, RankedSearch, SearchRequest};

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Search query (blank browses the catalog)
    pub query: String,

    /// Maximum number of results (default: search.results_per_page)
    #[arg(long, short)]
    pub limit: Option<usize>,

    /// Weight of the lexical signal (default: search.text_weight)
    #[arg(long)]
    pub text_weight: Option<f32>,

    /// Weight of the visual signal (default: search.visual_weight)
    #[arg(long)]
    pub visual_weight: Option<f32>,

    /// Show fused scores and per-signal components
    #[arg(long)]
    pub explain: bool,
}

impl SearchArgs {
    fn weights(&self, defaults: FusionWeights) -> Result<FusionWeights> {
        let weights = FusionWeights::new(
            self.text_weight.unwrap_or(defaults.text),
            self.visual_weight.unwrap_or(defaults.visual),
        );
        for (name, value) in [("text", weights.text), ("visual", weights.visual)] {
            if !value.is_finite() || value < 0.0 {
                return Err(InvError::ValidationFailed(format!(
                    "--{name}-weight must be a non-negative number, got {value}"
                )));
            }
        }
        Ok(weights)
    }
}

pub fn run(ctx: &AppContext, args: &SearchArgs) -> Result<()> {
    let options = ctx.searcher.options();
    let weights = args.weights(options.weights)?;
    let limit = args.limit.unwrap_or(options.results_per_page);

    if args.explain && !args.query.trim().is_empty() {
        let ranked = ctx.searcher.hybrid_search_scored(&args.query, weights, limit)?;
        return emit_explained(ctx, &args.query, &ranked);
    }

    let request = SearchRequest::new(args.query.as_str())
        .limit(limit)
        .weights(weights);
    let items = ctx.searcher.search(&request)?;
    emit_items(ctx, &format!("Results for \"{}\"", args.query.trim()), &items, Vec::new())
}

#[derive(Debug, Serialize)]
struct ExplainedHit<'a> {
    #[serde(flatten)]
    item: &'a Item,
    score: f32,
    lexical: Option<f32>,
    visual: Option<f32>,
}

#[derive(Debug, Serialize)]
struct SignalReport {
    state: &'static str,
    hits: usize,
}

#[derive(Debug, Serialize)]
struct ExplainReport<'a> {
    query: &'a str,
    expression: &'a str,
    lexical: SignalReport,
    visual: SignalReport,
    weights: FusionWeights,
    results: Vec<ExplainedHit<'a>>,
    total: usize,
}

fn pair_hits<'a>(items: &'a [Item], results: &[FusedResult]) -> Vec<ExplainedHit<'a>> {
    let by_id: HashMap<ItemId, &Item> = items.iter().map(|item| (item.id, item)).collect();
    results
        .iter()
        .filter_map(|fused| {
            by_id.get(&fused.item_id).map(|item| ExplainedHit {
                item,
                score: fused.score,
                lexical: fused.lexical,
                visual: fused.visual,
            })
        })
        .collect()
}

fn component(value: Option<f32>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.3}"))
}

fn emit_explained(ctx: &AppContext, query: &str, ranked: &RankedSearch) -> Result<()> {
    let items = ctx.db.fetch_items_by_ids(&ranked.ids())?;
    let hits = pair_hits(&items, &ranked.results);

    let mut warnings = Vec::new();
    if ranked.visual_state == "unavailable" {
        warnings.push("visual signal unavailable; ranked by lexical score only".to_string());
    }
    if ranked.lexical_state == "unavailable" {
        warnings.push("lexical signal unavailable; ranked by visual score only".to_string());
    }

    match ctx.output_format {
        OutputFormat::Json => {
            let report = ExplainReport {
                query,
                expression: &ranked.expression,
                lexical: SignalReport {
                    state: ranked.lexical_state,
                    hits: ranked.lexical_hits,
                },
                visual: SignalReport {
                    state: ranked.visual_state,
                    hits: ranked.visual_hits,
                },
                weights: ranked.weights,
                results: hits,
                total: ctx.searcher.item_count()?,
            };
            emit_json(&robot_ok(report).with_warnings(warnings))
        }
        OutputFormat::Jsonl => emit_jsonl(&hits),
        OutputFormat::Tsv => {
            let headers: Vec<&str> = ITEM_TSV_HEADERS
                .iter()
                .copied()
                .chain(["score", "lexical", "visual"])
                .collect();
            emit_tsv(&headers, &hits, |hit| {
                let mut row = item_row(hit.item);
                row.extend([
                    format!("{:.6}", hit.score),
                    component(hit.lexical),
                    component(hit.visual),
                ]);
                row
            });
            Ok(())
        }
        format @ (OutputFormat::Human | OutputFormat::Plain) => {
            let mut layout = HumanLayout::for_format(format);
            layout
                .title(&format!("Results for \"{}\"", query.trim()))
                .kv("expression", &ranked.expression)
                .kv(
                    "lexical",
                    &format!("{} ({} hits)", ranked.lexical_state, ranked.lexical_hits),
                )
                .kv(
                    "visual",
                    &format!("{} ({} hits)", ranked.visual_state, ranked.visual_hits),
                )
                .kv(
                    "weights",
                    &format!("text {:.2} / visual {:.2}", ranked.weights.text, ranked.weights.visual),
                )
                .blank();
            if hits.is_empty() {
                layout.push_line("No items found.");
            }
            for hit in &hits {
                layout.push_line(format!(
                    "{}  score {:.3}  lex {}  vis {}",
                    item_line(hit.item, format),
                    hit.score,
                    component(hit.lexical),
                    component(hit.visual)
                ));
            }
            for warning in &warnings {
                layout.blank().push_line(format!("warning: {warning}"));
            }
            emit_human(layout);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(text: Option<f32>, visual: Option<f32>) -> SearchArgs {
        SearchArgs {
            query: "chair".to_string(),
            limit: None,
            text_weight: text,
            visual_weight: visual,
            explain: false,
        }
    }

    #[test]
    fn weights_fall_back_per_field() {
        let weights = args(Some(1.0), None)
            .weights(FusionWeights::default())
            .unwrap();
        assert_eq!(weights, FusionWeights::new(1.0, 0.6));
    }

    #[test]
    fn negative_weight_is_rejected() {
        let err = args(None, Some(-0.5))
            .weights(FusionWeights::default())
            .unwrap_err();
        assert!(matches!(err, InvError::ValidationFailed(_)));
    }

    #[test]
    fn hits_follow_ranked_order_and_skip_missing_items() {
        let item = |id: ItemId| Item {
            id,
            name: format!("item {id}"),
            category: String::new(),
            extra: serde_json::json!({}),
            image_file: String::new(),
            thumb_file: String::new(),
            has_embedding: false,
        };
        let items = vec![item(1), item(3)];
        let results = vec![
            FusedResult { item_id: 3, score: 0.9, lexical: None, visual: Some(1.0) },
            FusedResult { item_id: 2, score: 0.5, lexical: Some(1.0), visual: None },
            FusedResult { item_id: 1, score: 0.1, lexical: Some(0.2), visual: None },
        ];
        let hits = pair_hits(&items, &results);
        let ids: Vec<ItemId> = hits.iter().map(|hit| hit.item.id).collect();
        assert_eq!(ids, vec![3, 1]);
        assert_eq!(component(hits[0].lexical), "-");
        assert_eq!(component(hits[1].lexical), "0.200");
    }
}
