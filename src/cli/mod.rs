//! CLI module - Command-line interface definitions and handlers
//!
//! Uses clap v4 with derive macros for argument parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use output::OutputFormat;

pub mod commands;
pub mod output;

/// invs - hybrid lexical and visual search over an inventory catalog
#[derive(Parser, Debug)]
#[command(name = "invs")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable machine-readable JSON output (shorthand for --output-format=json)
    #[arg(long, short = 'm', visible_alias = "machine", global = true)]
    pub robot: bool,

    /// Output format (human, json, jsonl, plain, tsv)
    #[arg(long, short = 'O', global = true, value_enum)]
    pub output_format: Option<OutputFormat>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all logging
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file path (replaces the global and project config files)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Data root holding the database and index (default: ./.invs)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Effective output format: `--robot` forces JSON, then `--output-format`,
    /// then human.
    #[must_use]
    pub fn output_format(&self) -> OutputFormat {
        OutputFormat::from_args(self.robot, self.output_format)
    }
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Rank items for a free-text query
    Search(commands::search::SearchArgs),

    /// List items by name without ranking
    Browse(commands::browse::BrowseArgs),

    /// List distinct categories
    Categories(commands::categories::CategoriesArgs),

    /// List items in one category
    Category(commands::categories::CategoryArgs),

    /// Import items from a JSON Lines file
    Import(commands::import::ImportArgs),

    /// Rebuild the Tantivy BM25 index from the store
    Index(commands::index::IndexArgs),

    /// Load the embedding cache and report its size
    Warm(commands::warm::WarmArgs),

    /// Show related terms for a word, or the overlapping terms report
    Synonyms(commands::synonyms::SynonymsArgs),

    /// Print the expanded lexical query for a search string
    Expand(commands::expand::ExpandArgs),

    /// Embed a text with the configured provider
    Embed(commands::embed::EmbedArgs),

    /// Print the effective configuration
    Config(commands::config::ConfigArgs),
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn robot_flag_forces_json() {
        let cli = Cli::parse_from(["invs", "-m", "categories"]);
        assert_eq!(cli.output_format(), OutputFormat::Json);
        let cli = Cli::parse_from(["invs", "--robot", "-O", "tsv", "categories"]);
        assert_eq!(cli.output_format(), OutputFormat::Json);
    }

    #[test]
    fn explicit_format_and_global_flags() {
        let cli = Cli::parse_from([
            "invs", "browse", "-O", "tsv", "--root", "/tmp/x", "-vv", "--limit", "5",
        ]);
        assert_eq!(cli.output_format(), OutputFormat::Tsv);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.root, Some(PathBuf::from("/tmp/x")));
        match cli.command {
            Commands::Browse(args) => assert_eq!(args.limit, Some(5)),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn search_parses_weights() {
        let cli = Cli::parse_from([
            "invs",
            "search",
            "gold chair",
            "--text-weight",
            "1",
            "--visual-weight",
            "0",
            "--explain",
        ]);
        match cli.command {
            Commands::Search(args) => {
                assert_eq!(args.query, "gold chair");
                assert_eq!(args.text_weight, Some(1.0));
                assert_eq!(args.visual_weight, Some(0.0));
                assert!(args.explain);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
