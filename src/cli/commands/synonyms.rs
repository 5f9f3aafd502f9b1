//! invs synonyms - Inspect the synonym table

use clap::Args;
use serde::Serialize;

use crate::app::AppContext;
use crate::cli::output::{HumanLayout, OutputFormat, emit_human, emit_json, emit_jsonl, emit_tsv, robot_ok};
use crate::error::{InvError, Result};
use crate::search::synonyms::{self, CATALOG_GROUPS};

#[derive(Args, Debug)]
pub struct SynonymsArgs {
    /// Term to look up
    #[arg(required_unless_present = "overlaps", conflicts_with = "overlaps")]
    pub term: Option<String>,

    /// Report terms shared by more than one group
    #[arg(long)]
    pub overlaps: bool,
}

#[derive(Debug, Serialize)]
struct RelatedReport<'a> {
    term: &'a str,
    known: bool,
    related: Vec<&'a str>,
}

#[derive(Debug, Serialize)]
struct OverlapEntry<'a> {
    term: &'a str,
    groups: &'a [usize],
    /// Leading member of each group, to make the merge readable.
    heads: Vec<&'static str>,
}

pub fn run(ctx: &AppContext, args: &SynonymsArgs) -> Result<()> {
    if args.overlaps {
        return run_overlaps(ctx);
    }
    let term = args
        .term
        .as_deref()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| InvError::ValidationFailed("a term or --overlaps is required".into()))?;

    let table = synonyms::catalog();
    let related: Vec<&str> = table
        .related_terms(&term)
        .into_iter()
        .filter(|t| *t != term)
        .collect();
    let report = RelatedReport {
        term: &term,
        known: table.contains(&term),
        related,
    };

    match ctx.output_format {
        OutputFormat::Json => emit_json(&robot_ok(&report)),
        OutputFormat::Jsonl => emit_jsonl(&report.related),
        OutputFormat::Tsv => {
            emit_tsv(&["term", "related"], &report.related, |r| {
                vec![report.term.to_string(), (*r).to_string()]
            });
            Ok(())
        }
        format @ (OutputFormat::Human | OutputFormat::Plain) => {
            let mut layout = HumanLayout::for_format(format);
            layout.title(&format!("Related terms for \"{}\"", report.term));
            if !report.known {
                layout.push_line("Not in the synonym table; the term expands to itself.");
            }
            for related in &report.related {
                layout.bullet(related);
            }
            emit_human(layout);
            Ok(())
        }
    }
}

fn run_overlaps(ctx: &AppContext) -> Result<()> {
    let table = synonyms::catalog();
    let entries: Vec<OverlapEntry<'_>> = table
        .overlaps()
        .iter()
        .map(|(term, groups)| OverlapEntry {
            term,
            groups,
            heads: groups
                .iter()
                .filter_map(|idx| CATALOG_GROUPS.get(*idx).and_then(|g| g.first().copied()))
                .collect(),
        })
        .collect();

    match ctx.output_format {
        OutputFormat::Json => emit_json(&robot_ok(&entries)),
        OutputFormat::Jsonl => emit_jsonl(&entries),
        OutputFormat::Tsv => {
            emit_tsv(&["term", "groups"], &entries, |e| {
                vec![e.term.to_string(), e.heads.join(",")]
            });
            Ok(())
        }
        format @ (OutputFormat::Human | OutputFormat::Plain) => {
            let mut layout = HumanLayout::for_format(format);
            layout.title(&format!(
                "Terms shared across groups ({} of {} terms, {} groups)",
                entries.len(),
                table.len(),
                table.group_count()
            ));
            for entry in &entries {
                layout.kv(entry.term, &entry.heads.join(", "));
            }
            emit_human(layout);
            Ok(())
        }
    }
}
