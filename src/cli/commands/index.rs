//! invs index - Rebuild the Tantivy BM25 index from the store

use std::sync::Arc;
use std::time::Instant;

use clap::Args;
use serde::Serialize;
use tracing::info;

use crate::app::AppContext;
use crate::cli::output::{HumanLayout, OutputFormat, emit_human, emit_json, robot_ok};
use crate::error::Result;
use crate::search::Bm25Index;

#[derive(Args, Debug)]
pub struct IndexArgs {}

#[derive(Debug, Serialize)]
struct IndexReport {
    path: String,
    indexed: usize,
    active: bool,
    elapsed_ms: u64,
}

/// Rebuild the BM25 index at `store.index_path`; returns the document count.
pub(crate) fn rebuild(ctx: &AppContext) -> Result<usize> {
    let index = match &ctx.bm25 {
        Some(index) => Arc::clone(index),
        None => Arc::new(Bm25Index::open(ctx.config.store.index_path(&ctx.root))?),
    };
    index.rebuild_from(ctx.db.as_ref())
}

pub fn run(ctx: &AppContext, _args: &IndexArgs) -> Result<()> {
    let started = Instant::now();
    let indexed = rebuild(ctx)?;
    let report = IndexReport {
        path: ctx.config.store.index_path(&ctx.root).display().to_string(),
        indexed,
        active: ctx.bm25.is_some(),
        elapsed_ms: started.elapsed().as_millis() as u64,
    };
    info!(indexed, path = %report.path, "bm25 index written");

    match ctx.output_format {
        OutputFormat::Json | OutputFormat::Jsonl => emit_json(&robot_ok(&report)),
        OutputFormat::Tsv => {
            println!("{}\t{}", report.indexed, report.path);
            Ok(())
        }
        format @ (OutputFormat::Human | OutputFormat::Plain) => {
            let mut layout = HumanLayout::for_format(format);
            layout
                .title("BM25 index rebuilt")
                .kv("documents", &report.indexed.to_string())
                .kv("path", &report.path)
                .kv("elapsed", &format!("{} ms", report.elapsed_ms));
            if !report.active {
                layout
                    .blank()
                    .push_line("Set search.lexical_backend = \"tantivy\" to search with it.");
            }
            emit_human(layout);
            Ok(())
        }
    }
}
