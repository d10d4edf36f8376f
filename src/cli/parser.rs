//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// graph-search-agent: multi-round retrieval over a temporal knowledge graph.
///
/// Plans queries, searches and expands the graph for a fixed number of
/// rounds, then writes an answer that a critique pass may send back for
/// revision.
#[derive(Parser, Debug)]
#[command(name = "graph-search-agent")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose (debug) logging on stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, default_value = "text", global = true)]
    pub format: String,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Answer a query from a graph snapshot.
    ///
    /// Loads the snapshot into memory and runs the full workflow against
    /// the given group. Requires an OpenAI-compatible API key.
    #[command(after_help = r#"Examples:
  graph-search-agent query "Who rescued the village?" --graph world.json --group adv-1
  graph-search-agent query "What happened at the bridge?" --graph world.json --group adv-1 --depth 2
  graph-search-agent query "Who owes Ariel a debt?" --graph world.json --group adv-1 --no-reflection
  graph-search-agent --format json query "..." --graph world.json --group adv-1 --show-state | jq '.stats'
  OPENAI_API_KEY=sk-... graph-search-agent query "..." --graph world.json --group adv-1
"#)]
    Query {
        /// The question to answer.
        query: String,

        /// Path to a JSON graph snapshot.
        #[arg(short, long)]
        graph: PathBuf,

        /// Graph partition (group id) to search.
        #[arg(long)]
        group: String,

        /// Number of retrieval rounds.
        #[arg(short, long)]
        depth: Option<usize>,

        /// Hybrid-search result limit per query.
        #[arg(long)]
        max_results: Option<usize>,

        /// Maximum reflection-triggered regenerations.
        #[arg(long)]
        max_regenerations: Option<usize>,

        /// Skip the critique of the final answer.
        #[arg(long)]
        no_reflection: bool,

        /// Skip summaries between rounds.
        #[arg(long)]
        no_intermediate: bool,

        /// Model for every LLM call.
        #[arg(long)]
        model: Option<String>,

        /// Directory containing prompt template files.
        ///
        /// Overrides `GRAPH_AGENT_PROMPT_DIR` and the default
        /// `~/.config/graph-search-agent/prompts/`.
        #[arg(long)]
        prompt_dir: Option<PathBuf>,

        /// Include the accumulated records in the output.
        #[arg(long)]
        show_state: bool,
    },

    /// Write default prompt templates to a directory.
    ///
    /// Existing files are left untouched.
    #[command(after_help = r#"Examples:
  graph-search-agent init-prompts                  # ~/.config/graph-search-agent/prompts
  graph-search-agent init-prompts --dir ./prompts  # Custom directory
"#)]
    InitPrompts {
        /// Target directory (defaults to `~/.config/graph-search-agent/prompts`).
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_query() {
        let cli = Cli::try_parse_from([
            "graph-search-agent",
            "query",
            "Who rescued the village?",
            "--graph",
            "world.json",
            "--group",
            "adv-1",
            "--depth",
            "2",
            "--no-reflection",
        ])
        .unwrap_or_else(|_| unreachable!());

        match cli.command {
            Commands::Query {
                query,
                group,
                depth,
                no_reflection,
                no_intermediate,
                ..
            } => {
                assert_eq!(query, "Who rescued the village?");
                assert_eq!(group, "adv-1");
                assert_eq!(depth, Some(2));
                assert!(no_reflection);
                assert!(!no_intermediate);
            }
            Commands::InitPrompts { .. } => unreachable!(),
        }
        assert_eq!(cli.format, "text");
    }

    #[test]
    fn test_query_requires_graph_and_group() {
        let result = Cli::try_parse_from(["graph-search-agent", "query", "q"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "graph-search-agent",
            "init-prompts",
            "--format",
            "json",
            "-v",
        ])
        .unwrap_or_else(|_| unreachable!());
        assert_eq!(cli.format, "json");
        assert!(cli.verbose);
    }
}
