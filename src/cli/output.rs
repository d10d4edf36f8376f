//! Output formatting for CLI commands.

use std::fmt::Write;

use serde::Serialize;

use crate::agent::QueryResult;
use crate::core::{DiscoveryRound, SearchState};
use crate::error::{CommandError, Result};

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// Pretty-printed JSON.
    Json,
}

impl OutputFormat {
    /// Parses a format name; unknown names fall back to text.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Text,
        }
    }

    /// Serializes `value` as pretty JSON.
    ///
    /// Falls back to compact output, then to an empty object, so the
    /// command still prints something parseable.
    pub fn to_json<T: Serialize + ?Sized>(self, value: &T) -> String {
        serde_json::to_string_pretty(value)
            .or_else(|_| serde_json::to_string(value))
            .unwrap_or_else(|_| "{}".to_string())
    }
}

fn round_label(round: DiscoveryRound) -> String {
    match round {
        DiscoveryRound::Round(r) => format!("r{r}"),
        DiscoveryRound::Expansion => "exp".to_string(),
    }
}

/// Renders the accumulated records of a run.
#[must_use]
pub fn format_state(state: &SearchState) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Queries issued ({}):", state.issued_queries.len());
    for query in &state.issued_queries {
        let _ = writeln!(out, "  {query}");
    }

    let _ = writeln!(out, "\nEntities ({}):", state.nodes().len());
    for node in state.nodes() {
        let _ = writeln!(
            out,
            "  [{} {:.2}] {} ({})",
            round_label(node.round_discovered),
            node.relevance_score,
            node.name,
            node.id
        );
    }

    let _ = writeln!(out, "\nFacts ({}):", state.edges().len());
    for edge in state.edges() {
        let _ = writeln!(
            out,
            "  [{} {:.2}] {}: {}",
            round_label(edge.round_discovered),
            edge.relevance_score,
            edge.relation_name,
            edge.fact
        );
    }

    let _ = writeln!(out, "\nCommunities ({}):", state.communities().len());
    for community in state.communities() {
        let _ = writeln!(
            out,
            "  [{} {:.2}] {}",
            round_label(community.round_discovered),
            community.relevance_score,
            community.name
        );
    }

    if !state.intermediate_summaries.is_empty() {
        let _ = writeln!(out, "\nRound summaries:");
        for (i, summary) in state.intermediate_summaries.iter().enumerate() {
            let _ = writeln!(out, "  {}. {summary}", i + 1);
        }
    }
    out
}

/// Renders a completed run.
///
/// # Errors
///
/// Returns [`CommandError::OutputFormat`] if JSON serialization fails.
pub fn format_query_result(
    result: &QueryResult,
    show_state: bool,
    format: OutputFormat,
) -> Result<String> {
    match format {
        OutputFormat::Text => {
            let stats = &result.stats;
            let mut output = result.answer.clone();
            let early = if stats.early_terminated {
                " (stopped early: nothing found)"
            } else {
                ""
            };
            let _ = write!(
                output,
                "\n\n---\nRounds: {}{early} | Queries: {} | Entities: {} | Facts: {} | Communities: {} | Regenerations: {} | Time: {:.1}s",
                stats.rounds,
                stats.queries_issued,
                result.state.nodes().len(),
                result.state.edges().len(),
                result.state.communities().len(),
                stats.regenerations,
                result.elapsed.as_secs_f64()
            );
            if stats.expansion_failures > 0 {
                let _ = write!(output, "\nExpansion failures: {}", stats.expansion_failures);
            }
            if show_state {
                output.push_str("\n\n");
                output.push_str(&format_state(&result.state));
            }
            output.push('\n');
            Ok(output)
        }
        OutputFormat::Json => {
            let value = if show_state {
                serde_json::to_value(result).map_err(|e| {
                    CommandError::OutputFormat(format!("JSON serialization failed: {e}"))
                })?
            } else {
                serde_json::json!({
                    "answer": result.answer,
                    "stats": result.stats,
                    "elapsed_secs": result.elapsed.as_secs_f64(),
                })
            };
            Ok(format.to_json(&value))
        }
    }
}
