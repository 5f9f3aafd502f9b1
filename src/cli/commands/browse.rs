//! invs browse - List items by name without ranking

use clap::Args;

use crate::app::AppContext;
use crate::cli::commands::emit_items;
use crate::error::Result;

#[derive(Args, Debug)]
pub struct BrowseArgs {
    /// Page size (default: search.results_per_page)
    #[arg(long, short)]
    pub limit: Option<usize>,

    /// Number of items to skip
    #[arg(long, default_value = "0")]
    pub offset: usize,
}

pub fn run(ctx: &AppContext, args: &BrowseArgs) -> Result<()> {
    let limit = args
        .limit
        .unwrap_or(ctx.searcher.options().results_per_page);
    let items = ctx.searcher.browse(limit, args.offset)?;
    emit_items(ctx, "Catalog", &items, Vec::new())
}
