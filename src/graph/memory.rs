//! In-memory graph store backed by a JSON snapshot.
//!
//! Scores hits by query-term overlap, so it needs no embedding model.
//! Every requested method is answered lexically; breadth-first node
//! search additionally surfaces the endpoints of matching facts. The CLI
//! uses it to run the agent against an exported graph, and tests use it
//! as a deterministic store.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::config::{NodeSearchMethod, SearchConfig};
use super::store::GraphStore;
use super::types::{GraphCommunity, GraphEdge, GraphNode, Scored, SearchResults};
use crate::error::AgentError;

/// Discount applied to nodes reached only through a matching fact.
const BFS_DISCOUNT: f64 = 0.9;

/// Words that carry no signal for term overlap.
const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "did", "does", "for", "how", "in", "is", "of", "on", "the", "to",
    "was", "what", "when", "where", "which", "who", "why",
];

/// One partition (group) of the graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphPartition {
    /// Entity nodes.
    #[serde(default)]
    pub nodes: Vec<GraphNode>,
    /// Fact edges.
    #[serde(default)]
    pub edges: Vec<GraphEdge>,
    /// Community summaries.
    #[serde(default)]
    pub communities: Vec<GraphCommunity>,
}

/// Serialized graph: partitions keyed by group id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphSnapshot {
    /// Partitions keyed by group id.
    #[serde(default)]
    pub groups: BTreeMap<String, GraphPartition>,
}

/// Graph store holding a whole snapshot in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryGraph {
    snapshot: GraphSnapshot,
}

impl InMemoryGraph {
    /// Wraps an already-parsed snapshot.
    #[must_use]
    pub const fn new(snapshot: GraphSnapshot) -> Self {
        Self { snapshot }
    }

    /// Loads a snapshot from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::GraphStore`] if the file cannot be read or is
    /// not a valid snapshot.
    pub fn load(path: &Path) -> Result<Self, AgentError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AgentError::graph_store("load", format!("{}: {e}", path.display()))
        })?;
        let snapshot: GraphSnapshot = serde_json::from_str(&raw).map_err(|e| {
            AgentError::graph_store("load", format!("{}: {e}", path.display()))
        })?;
        Ok(Self::new(snapshot))
    }

    /// Number of partitions in the snapshot.
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.snapshot.groups.len()
    }

    fn partitions<'a>(
        &'a self,
        group_ids: &'a [String],
    ) -> impl Iterator<Item = &'a GraphPartition> + 'a {
        group_ids
            .iter()
            .filter_map(|id| self.snapshot.groups.get(id))
    }
}

/// Splits text into lowercase terms, dropping stopwords.
fn terms(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .filter(|t| !STOPWORDS.contains(&t.as_str()))
        .collect()
}

/// Fraction of query terms present in the document.
#[allow(clippy::cast_precision_loss)]
fn overlap(query: &HashSet<String>, document: &str) -> f64 {
    if query.is_empty() {
        return 0.0;
    }
    let doc = terms(document);
    let matched = query.iter().filter(|t| doc.contains(*t)).count();
    matched as f64 / query.len() as f64
}

/// Sorts by score (stable for ties) and keeps the top `limit`.
fn top<T>(mut hits: Vec<Scored<T>>, limit: usize) -> Vec<Scored<T>> {
    hits.sort_by(|a, b| b.score.total_cmp(&a.score));
    hits.truncate(limit);
    hits
}

#[async_trait]
impl GraphStore for InMemoryGraph {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn hybrid_search(
        &self,
        group_ids: &[String],
        query: &str,
        config: &SearchConfig,
    ) -> Result<SearchResults, AgentError> {
        let query_terms = terms(query);
        let mut nodes = Vec::new();
        let mut edges = Vec::new();
        let mut communities = Vec::new();

        for partition in self.partitions(group_ids) {
            let mut node_scores: HashMap<&str, f64> = HashMap::new();
            for node in &partition.nodes {
                let score = overlap(&query_terms, &format!("{} {}", node.name, node.summary));
                if score > 0.0 {
                    node_scores.insert(node.id.as_str(), score);
                }
            }

            for edge in &partition.edges {
                let score = overlap(
                    &query_terms,
                    &format!("{} {}", edge.relation_name.replace('_', " "), edge.fact),
                );
                if score > 0.0 {
                    if config.node.methods.contains(&NodeSearchMethod::Bfs) {
                        for endpoint in [&edge.source_node_id, &edge.target_node_id] {
                            let reached = score * BFS_DISCOUNT;
                            let entry = node_scores.entry(endpoint.as_str()).or_insert(0.0);
                            if reached > *entry {
                                *entry = reached;
                            }
                        }
                    }
                    edges.push(Scored::new(edge.clone(), score));
                }
            }

            nodes.extend(
                partition
                    .nodes
                    .iter()
                    .filter_map(|n| node_scores.get(n.id.as_str()).map(|s| Scored::new(n.clone(), *s))),
            );

            for community in &partition.communities {
                let score = overlap(
                    &query_terms,
                    &format!("{} {}", community.name, community.summary),
                );
                if score > 0.0 {
                    communities.push(Scored::new(community.clone(), score));
                }
            }
        }

        Ok(SearchResults {
            nodes: top(nodes, config.limit),
            edges: top(edges, config.limit),
            communities: top(communities, config.limit),
        })
    }

    async fn outgoing_relations(
        &self,
        group_ids: &[String],
        node_id: &str,
        limit: usize,
    ) -> Result<Vec<GraphEdge>, AgentError> {
        Ok(self
            .partitions(group_ids)
            .flat_map(|p| p.edges.iter())
            .filter(|e| e.source_node_id == node_id)
            .take(limit)
            .cloned()
            .collect())
    }
}
