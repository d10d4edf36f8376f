//! CLI command implementations.
//!
//! Contains the business logic for each CLI command.

use std::path::Path;
use std::sync::Arc;

use crate::agent::client::create_provider;
use crate::agent::config::AgentConfig;
use crate::agent::prompt::PromptSet;
use crate::agent::workflow::{QueryRequest, WorkflowController};
use crate::cli::output::{OutputFormat, format_query_result};
use crate::cli::parser::{Cli, Commands};
use crate::error::{CommandError, Error, Result};
use crate::graph::InMemoryGraph;

/// Parameters for the query command.
#[derive(Debug, Clone, Default)]
pub struct QueryCommandParams<'a> {
    /// The question to answer.
    pub query: &'a str,
    /// Path to the JSON graph snapshot.
    pub graph: Option<&'a Path>,
    /// Graph partition to search.
    pub group: &'a str,
    /// Number of retrieval rounds.
    pub depth: Option<usize>,
    /// Hybrid-search result limit per query.
    pub max_results: Option<usize>,
    /// Maximum reflection-triggered regenerations.
    pub max_regenerations: Option<usize>,
    /// Skip the critique of the final answer.
    pub no_reflection: bool,
    /// Skip summaries between rounds.
    pub no_intermediate: bool,
    /// Model override.
    pub model: Option<&'a str>,
    /// Directory containing prompt template files.
    pub prompt_dir: Option<&'a Path>,
    /// Include accumulated records in the output.
    pub show_state: bool,
}

/// Executes the CLI command.
///
/// # Arguments
///
/// * `cli` - Parsed CLI arguments.
///
/// # Returns
///
/// Result with output string on success.
///
/// # Errors
///
/// Returns an error if the command fails to execute.
pub fn execute(cli: &Cli) -> Result<String> {
    let format = OutputFormat::parse(&cli.format);

    match &cli.command {
        Commands::Query {
            query,
            graph,
            group,
            depth,
            max_results,
            max_regenerations,
            no_reflection,
            no_intermediate,
            model,
            prompt_dir,
            show_state,
        } => {
            let params = QueryCommandParams {
                query,
                graph: Some(graph.as_path()),
                group,
                depth: *depth,
                max_results: *max_results,
                max_regenerations: *max_regenerations,
                no_reflection: *no_reflection,
                no_intermediate: *no_intermediate,
                model: model.as_deref(),
                prompt_dir: prompt_dir.as_deref(),
                show_state: *show_state,
            };
            cmd_query(&params, format)
        }
        Commands::InitPrompts { dir } => cmd_init_prompts(dir.as_deref(), format),
    }
}

fn cmd_query(params: &QueryCommandParams<'_>, format: OutputFormat) -> Result<String> {
    let graph_path = params.graph.ok_or_else(|| {
        CommandError::ExecutionFailed("A graph snapshot path is required".to_string())
    })?;
    let store = InMemoryGraph::load(graph_path).map_err(|e| CommandError::InvalidInput {
        path: graph_path.display().to_string(),
        message: e.to_string(),
    })?;

    // Build agent configuration from env + CLI overrides
    let mut builder = AgentConfig::builder();
    if let Some(depth) = params.depth {
        builder = builder.search_depth(depth);
    }
    if let Some(n) = params.max_results {
        builder = builder.max_results_per_round(n);
    }
    if let Some(n) = params.max_regenerations {
        builder = builder.max_regenerations(n);
    }
    if params.no_reflection {
        builder = builder.enable_reflection(false);
    }
    if params.no_intermediate {
        builder = builder.intermediate_summaries(false);
    }
    if let Some(model) = params.model {
        builder = builder.model(model);
    }
    if let Some(dir) = params.prompt_dir {
        builder = builder.prompt_dir(dir);
    }

    let config = builder.from_env().build().map_err(|e| {
        CommandError::ExecutionFailed(format!("Agent configuration error: {e}"))
    })?;

    let provider = create_provider(&config).map_err(|e| {
        CommandError::ExecutionFailed(format!("Provider creation failed: {e}"))
    })?;

    let mut request = QueryRequest::new(params.query, params.group);
    request.search_depth = params.depth;
    request.max_results_per_round = params.max_results;

    let controller = WorkflowController::new(Arc::from(provider), Arc::new(store), config);

    // Create tokio runtime as sync/async bridge
    let rt = tokio::runtime::Runtime::new().map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to create async runtime: {e}"))
    })?;

    match rt.block_on(controller.run(&request)) {
        Ok(result) => format_query_result(&result, params.show_state, format),
        Err(Error::Workflow(failure)) => Err(CommandError::ExecutionFailed(format!(
            "Query failed in round {}: {} ({} entities, {} facts gathered before the failure)",
            failure.round,
            failure.source,
            failure.state.nodes().len(),
            failure.state.edges().len()
        ))
        .into()),
        Err(e) => Err(e),
    }
}

fn cmd_init_prompts(dir: Option<&Path>, format: OutputFormat) -> Result<String> {
    let target_dir = dir
        .map(std::path::PathBuf::from)
        .or_else(PromptSet::default_dir)
        .ok_or_else(|| {
            CommandError::ExecutionFailed(
                "Could not determine home directory for default prompt path".to_string(),
            )
        })?;

    let written = PromptSet::write_defaults(&target_dir).map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to write prompt templates: {e}"))
    })?;

    match format {
        OutputFormat::Text => {
            if written.is_empty() {
                Ok(format!(
                    "All prompt templates already exist in: {}\n",
                    target_dir.display()
                ))
            } else {
                let mut output = format!(
                    "Wrote {} prompt template(s) to: {}\n",
                    written.len(),
                    target_dir.display()
                );
                for path in &written {
                    let name = path
                        .file_name()
                        .and_then(|n| n.to_str())
                        .unwrap_or("unknown");
                    output.push_str("  ");
                    output.push_str(name);
                    output.push('\n');
                }
                output.push_str("\nEdit these files to customize agent system prompts.\n");
                Ok(output)
            }
        }
        OutputFormat::Json => {
            let json = serde_json::json!({
                "directory": target_dir.to_string_lossy(),
                "written": written.iter().map(|p| p.to_string_lossy().into_owned()).collect::<Vec<_>>(),
                "count": written.len()
            });
            Ok(format.to_json(&json))
        }
    }
}
