//! invs expand - Show how a query is expanded for lexical retrieval

use clap::Args;
use serde::Serialize;

use crate::app::AppContext;
use crate::cli::output::{HumanLayout, OutputFormat, emit_human, emit_json, emit_jsonl, robot_ok};
use crate::error::{InvError, Result};
use crate::search::ExpandedQuery;

#[derive(Args, Debug)]
pub struct ExpandArgs {
    /// Raw search query
    pub query: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub(crate) struct ExpansionReport {
    pub words: Vec<String>,
    pub terms: Vec<String>,
    pub expression: String,
    pub fallback: String,
}

impl From<&ExpandedQuery> for ExpansionReport {
    fn from(expanded: &ExpandedQuery) -> Self {
        Self {
            words: expanded.words().to_vec(),
            terms: expanded.lexical_terms().iter().map(ToString::to_string).collect(),
            expression: expanded.to_query_string(),
            fallback: expanded.fallback_query(),
        }
    }
}

pub fn run(ctx: &AppContext, args: &ExpandArgs) -> Result<()> {
    if args.query.trim().is_empty() {
        return Err(InvError::ValidationFailed(
            "a blank query is browsed, not expanded".to_string(),
        ));
    }
    let report = ExpansionReport::from(&ctx.searcher.expand(&args.query));

    match ctx.output_format {
        OutputFormat::Json => emit_json(&robot_ok(&report)),
        OutputFormat::Jsonl => emit_jsonl(std::slice::from_ref(&report)),
        OutputFormat::Tsv => {
            println!("{}", report.expression);
            Ok(())
        }
        format @ (OutputFormat::Human | OutputFormat::Plain) => {
            let mut layout = HumanLayout::for_format(format);
            layout
                .title(&format!("Expansion of \"{}\"", args.query.trim()))
                .kv("words", &report.words.join(" "))
                .kv("terms", &report.terms.len().to_string())
                .kv("fallback", &report.fallback)
                .blank()
                .push_line(report.expression.clone());
            emit_human(layout);
            Ok(())
        }
    }
}
