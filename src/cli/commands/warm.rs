//! invs warm - Load the embedding cache and report its size

use clap::Args;

use crate::app::AppContext;
use crate::cli::output::{HumanLayout, OutputFormat, emit_human, emit_json, emit_jsonl, emit_tsv, robot_ok};
use crate::error::Result;
use crate::search::CacheStats;

#[derive(Args, Debug)]
pub struct WarmArgs {}

pub fn run(ctx: &AppContext, _args: &WarmArgs) -> Result<()> {
    let entries = ctx.searcher.warm()?;
    let stats = CacheStats {
        entries,
        ..ctx.cache.stats()
    };

    match ctx.output_format {
        OutputFormat::Json => emit_json(&robot_ok(&stats)),
        OutputFormat::Jsonl => emit_jsonl(std::slice::from_ref(&stats)),
        OutputFormat::Tsv => {
            emit_tsv(&["entries", "skipped", "loads"], &[stats], |s: &CacheStats| {
                vec![s.entries.to_string(), s.skipped.to_string(), s.loads.to_string()]
            });
            Ok(())
        }
        format @ (OutputFormat::Human | OutputFormat::Plain) => {
            let mut layout = HumanLayout::for_format(format);
            layout
                .title("Embedding cache")
                .kv("entries", &stats.entries.to_string())
                .kv("skipped", &stats.skipped.to_string())
                .kv("provider", ctx.provider_name());
            emit_human(layout);
            Ok(())
        }
    }
}
