//! Pluggable graph store trait.
//!
//! Implementations own storage, indexing, and reranking. The agent only
//! reads through this trait and never writes to the graph.

use async_trait::async_trait;

use super::config::SearchConfig;
use super::types::{GraphEdge, SearchResults};
use crate::error::AgentError;

/// Trait for temporal knowledge graph backends.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Store name for logging.
    fn name(&self) -> &'static str;

    /// Runs a hybrid search scoped to the given partitions.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::GraphStore`] when the store call fails.
    async fn hybrid_search(
        &self,
        group_ids: &[String],
        query: &str,
        config: &SearchConfig,
    ) -> Result<SearchResults, AgentError>;

    /// Returns up to `limit` relations whose source is `node_id`, looking
    /// only inside the given partitions.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::GraphStore`] when the store call fails.
    async fn outgoing_relations(
        &self,
        group_ids: &[String],
        node_id: &str,
        limit: usize,
    ) -> Result<Vec<GraphEdge>, AgentError>;
}
