//! invs import - Load catalog items from a JSON Lines file
//!
//! One `NewItem` object per line. Items without an `embedding` get one from
//! the provider's `embed_image` when their image file can be found.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::app::AppContext;
use crate::cli::commands::index;
use crate::cli::output::{HumanLayout, OutputFormat, emit_human, emit_json, emit_jsonl, robot_ok};
use crate::core::NewItem;
use crate::error::{InvError, Result};
use crate::search::EmbeddingProvider;
use crate::search::embeddings::{ensure_dims, into_unit_vector};

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// JSON Lines file, one item per line
    pub file: PathBuf,

    /// Delete every existing item first
    #[arg(long)]
    pub replace: bool,

    /// Directory that `image_file` is relative to (default: the file's directory)
    #[arg(long)]
    pub images_dir: Option<PathBuf>,
}

/// A line that could not be imported.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RejectedLine {
    pub line: usize,
    pub error: String,
}

#[derive(Debug, Default, Serialize)]
pub struct ImportReport {
    pub lines: usize,
    pub imported: usize,
    pub with_embedding: usize,
    pub computed_embeddings: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replaced: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indexed: Option<usize>,
    pub rejected: Vec<RejectedLine>,
    pub elapsed_ms: u64,
}

/// Parse JSONL into items, rejecting malformed lines individually.
///
/// `dims` is the expected embedding length; supplied vectors of another
/// length, or with zero norm, reject their line. Accepted vectors are
/// L2-normalized.
pub fn parse_lines<R: BufRead>(
    reader: R,
    dims: Option<usize>,
) -> Result<(Vec<(usize, NewItem)>, Vec<RejectedLine>, usize)> {
    let mut items = Vec::new();
    let mut rejected = Vec::new();
    let mut lines = 0;

    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        lines += 1;
        match parse_line(&line, dims) {
            Ok(item) => items.push((line_no, item)),
            Err(err) => {
                warn!(line = line_no, error = %err, "import line rejected");
                rejected.push(RejectedLine {
                    line: line_no,
                    error: err.to_string(),
                });
            }
        }
    }
    Ok((items, rejected, lines))
}

fn parse_line(line: &str, dims: Option<usize>) -> Result<NewItem> {
    let mut item: NewItem =
        serde_json::from_str(line).map_err(|err| InvError::Import(format!("invalid JSON: {err}")))?;
    item.name = item.name.trim().to_string();
    if item.name.is_empty() {
        return Err(InvError::Import("`name` is required".to_string()));
    }
    if let Some(vector) = item.embedding.take() {
        if let Some(dims) = dims {
            ensure_dims(&vector, dims)?;
        }
        item.embedding = Some(into_unit_vector(vector)?);
    }
    Ok(item)
}

/// Fill missing embeddings from image files; returns how many were computed.
fn compute_embeddings(
    provider: &dyn EmbeddingProvider,
    images_dir: &Path,
    items: &mut [(usize, NewItem)],
) -> usize {
    items
        .par_iter_mut()
        .filter(|(_, item)| item.embedding.is_none() && !item.image_file.is_empty())
        .map(|(line, item)| {
            let path = images_dir.join(&item.image_file);
            if !path.is_file() {
                debug!(line = *line, path = %path.display(), "image not found");
                return 0;
            }
            match provider.embed_image(&path) {
                Ok(vector) => {
                    item.embedding = Some(vector);
                    1
                }
                Err(err) => {
                    warn!(line = *line, path = %path.display(), error = %err, "image embedding failed");
                    0
                }
            }
        })
        .sum()
}

pub fn run(ctx: &AppContext, args: &ImportArgs) -> Result<()> {
    let report = import(ctx, args)?;
    emit_report(ctx, &report)
}

/// Run an import against the context's store, invalidating the cache after.
pub fn import(ctx: &AppContext, args: &ImportArgs) -> Result<ImportReport> {
    let started = Instant::now();
    let file = File::open(&args.file).map_err(|err| {
        InvError::Import(format!("cannot open {}: {err}", args.file.display()))
    })?;

    let dims = ctx
        .provider
        .as_ref()
        .map_or(ctx.config.embedding.dims as usize, |p| p.dims());
    let (mut items, rejected, lines) = parse_lines(BufReader::new(file), Some(dims))?;

    let images_dir = args.images_dir.clone().unwrap_or_else(|| {
        args.file
            .parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
    });
    let computed_embeddings = match &ctx.provider {
        Some(provider) => compute_embeddings(provider.as_ref(), &images_dir, &mut items),
        None => 0,
    };

    let new_items: Vec<NewItem> = items.into_iter().map(|(_, item)| item).collect();
    let with_embedding = new_items.iter().filter(|i| i.embedding.is_some()).count();
    let written = if args.replace {
        ctx.db
            .replace_items(&new_items)
            .map(|(removed, ids)| (Some(removed), ids))
    } else {
        ctx.db.insert_items(&new_items).map(|ids| (None, ids))
    };
    ctx.searcher.invalidate_embeddings();
    let (replaced, ids) = written?;

    let indexed = if ctx.bm25.is_some() {
        Some(index::rebuild(ctx)?)
    } else {
        None
    };

    let report = ImportReport {
        lines,
        imported: ids.len(),
        with_embedding,
        computed_embeddings,
        replaced,
        indexed,
        rejected,
        elapsed_ms: started.elapsed().as_millis() as u64,
    };
    info!(
        imported = report.imported,
        rejected = report.rejected.len(),
        with_embedding,
        computed_embeddings,
        "import finished"
    );
    Ok(report)
}

fn emit_report(ctx: &AppContext, report: &ImportReport) -> Result<()> {
    match ctx.output_format {
        OutputFormat::Json => emit_json(&robot_ok(report)),
        OutputFormat::Jsonl => emit_jsonl(&report.rejected),
        OutputFormat::Tsv => {
            println!("imported\trejected\twith_embedding");
            println!(
                "{}\t{}\t{}",
                report.imported,
                report.rejected.len(),
                report.with_embedding
            );
            Ok(())
        }
        format @ (OutputFormat::Human | OutputFormat::Plain) => {
            let mut layout = HumanLayout::for_format(format);
            layout
                .title("Import")
                .kv("lines", &report.lines.to_string())
                .kv("imported", &report.imported.to_string())
                .kv("with embedding", &report.with_embedding.to_string())
                .kv("computed", &report.computed_embeddings.to_string());
            if let Some(replaced) = report.replaced {
                layout.kv("replaced", &replaced.to_string());
            }
            if let Some(indexed) = report.indexed {
                layout.kv("bm25 documents", &indexed.to_string());
            }
            if !report.rejected.is_empty() {
                layout.blank().section("Rejected lines");
                for rejected in &report.rejected {
                    layout.bullet(&format!("line {}: {}", rejected.line, rejected.error));
                }
            }
            emit_human(layout);
            Ok(())
        }
    }
}
