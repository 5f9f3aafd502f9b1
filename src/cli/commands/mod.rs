//! CLI command implementations
//!
//! Each subcommand has its own module with:
//! - Args struct for command-line arguments
//! - `run()` function to execute the command

use serde::Serialize;

use crate::app::AppContext;
use crate::cli::Commands;
use crate::cli::output::{
    HumanLayout, OutputFormat, emit_human, emit_json, emit_jsonl, emit_tsv, robot_ok,
};
use crate::core::Item;
use crate::error::Result;

pub mod browse;
pub mod categories;
pub mod config;
pub mod embed;
pub mod expand;
pub mod import;
pub mod index;
pub mod search;
pub mod synonyms;
pub mod warm;

/// Dispatch a command to its handler
pub fn run(ctx: &AppContext, command: &Commands) -> Result<()> {
    match command {
        Commands::Search(args) => search::run(ctx, args),
        Commands::Browse(args) => browse::run(ctx, args),
        Commands::Categories(args) => categories::run_list(ctx, args),
        Commands::Category(args) => categories::run_items(ctx, args),
        Commands::Import(args) => import::run(ctx, args),
        Commands::Index(args) => index::run(ctx, args),
        Commands::Warm(args) => warm::run(ctx, args),
        Commands::Synonyms(args) => synonyms::run(ctx, args),
        Commands::Expand(args) => expand::run(ctx, args),
        Commands::Embed(args) => embed::run(ctx, args),
        Commands::Config(args) => config::run(ctx, args),
    }
}

/// Item listing shared by `search`, `browse` and `category`.
#[derive(Debug, Serialize)]
pub(crate) struct ItemListing<'a> {
    pub items: &'a [Item],
    /// Catalog size, not the length of `items`.
    pub total: usize,
}

pub(crate) const ITEM_TSV_HEADERS: [&str; 5] = ["id", "name", "category", "image_file", "has_embedding"];

pub(crate) fn item_row(item: &Item) -> Vec<String> {
    vec![
        item.id.to_string(),
        item.name.clone(),
        item.category.clone(),
        item.image_file.clone(),
        item.has_embedding.to_string(),
    ]
}

pub(crate) fn item_line(item: &Item, format: OutputFormat) -> String {
    let category = if item.category.is_empty() {
        "-"
    } else {
        item.category.as_str()
    };
    if format.use_colors() {
        format!(
            "{:>6}  {}  {}",
            console::style(item.id).dim(),
            console::style(&item.name).bold(),
            console::style(category).cyan()
        )
    } else {
        format!("{:>6}  {}  {}", item.id, item.name, category)
    }
}

/// Emit an item list in the context's output format.
pub(crate) fn emit_items(
    ctx: &AppContext,
    title: &str,
    items: &[Item],
    warnings: Vec<String>,
) -> Result<()> {
    let total = ctx.searcher.item_count()?;
    match ctx.output_format {
        OutputFormat::Json => {
            emit_json(&robot_ok(ItemListing { items, total }).with_warnings(warnings))
        }
        OutputFormat::Jsonl => emit_jsonl(items),
        OutputFormat::Tsv => {
            emit_tsv(&ITEM_TSV_HEADERS, items, item_row);
            Ok(())
        }
        format @ (OutputFormat::Human | OutputFormat::Plain) => {
            let mut layout = HumanLayout::for_format(format);
            layout.title(&format!("{title} ({} of {total})", items.len()));
            if items.is_empty() {
                layout.push_line("No items found.");
            }
            for item in items {
                layout.push_line(item_line(item, format));
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

    fn item() -> Item {
        Item {
            id: 7,
            name: "Gold Chiavari Chair".to_string(),
            category: String::new(),
            extra: serde_json::json!({}),
            image_file: "gold.jpg".to_string(),
            thumb_file: String::new(),
            has_embedding: true,
        }
    }

    #[test]
    fn item_row_matches_headers() {
        let row = item_row(&item());
        assert_eq!(row.len(), ITEM_TSV_HEADERS.len());
        assert_eq!(row[0], "7");
        assert_eq!(row[4], "true");
    }

    #[test]
    fn plain_item_line_marks_missing_category() {
        let line = item_line(&item(), OutputFormat::Plain);
        assert_eq!(line, "     7  Gold Chiavari Chair  -");
    }

    #[test]
    fn listing_serializes_items_and_total() {
        let items = vec![item()];
        let json = serde_json::to_value(ItemListing {
            items: &items,
            total: 12,
        })
        .unwrap();
        assert_eq!(json["total"], 12);
        assert_eq!(json["items"][0]["name"], "Gold Chiavari Chair");
    }
}
