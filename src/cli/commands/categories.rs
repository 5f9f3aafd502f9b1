//! invs categories / invs category - Category listing and filtering

use clap::Args;
use serde::Serialize;

use crate::app::AppContext;
use crate::cli::commands::emit_items;
use crate::cli::output::{HumanLayout, OutputFormat, emit_human, emit_json, emit_jsonl, emit_tsv, robot_ok};
use crate::error::Result;

#[derive(Args, Debug)]
pub struct CategoriesArgs {}

#[derive(Args, Debug)]
pub struct CategoryArgs {
    /// Category name (exact match)
    pub name: String,

    /// Maximum number of items (default: search.results_per_page)
    #[arg(long, short)]
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
struct CategoryList<'a> {
    categories: &'a [String],
    count: usize,
}

pub fn run_list(ctx: &AppContext, _args: &CategoriesArgs) -> Result<()> {
    let categories = ctx.searcher.categories()?;
    match ctx.output_format {
        OutputFormat::Json => emit_json(&robot_ok(CategoryList {
            categories: &categories,
            count: categories.len(),
        })),
        OutputFormat::Jsonl => emit_jsonl(&categories),
        OutputFormat::Tsv => {
            emit_tsv(&["category"], &categories, |c| vec![c.clone()]);
            Ok(())
        }
        format @ (OutputFormat::Human | OutputFormat::Plain) => {
            let mut layout = HumanLayout::for_format(format);
            layout.title(&format!("Categories ({})", categories.len()));
            for category in &categories {
                layout.bullet(category);
            }
            emit_human(layout);
            Ok(())
        }
    }
}

pub fn run_items(ctx: &AppContext, args: &CategoryArgs) -> Result<()> {
    let limit = args
        .limit
        .unwrap_or(ctx.searcher.options().results_per_page);
    let items = ctx.searcher.filter_by_category(&args.name, limit)?;
    emit_items(ctx, &format!("Category \"{}\"", args.name), &items, Vec::new())
}
