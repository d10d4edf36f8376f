//! Raw entities returned by a graph store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An entity node as stored in the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Node id.
    pub id: String,
    /// Entity name.
    pub name: String,
    /// Entity summary.
    #[serde(default)]
    pub summary: String,
}

/// A fact edge between two entity nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    /// Edge id.
    pub id: String,
    /// Relation type name.
    pub relation_name: String,
    /// Natural-language fact.
    pub fact: String,
    /// Source node id.
    pub source_node_id: String,
    /// Target node id.
    pub target_node_id: String,
    /// Episodes mentioning the fact.
    #[serde(default)]
    pub episode_refs: Vec<String>,
    /// Start of validity.
    #[serde(default)]
    pub valid_at: Option<DateTime<Utc>>,
    /// End of validity.
    #[serde(default)]
    pub invalid_at: Option<DateTime<Utc>>,
}

/// A community summary node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphCommunity {
    /// Community id.
    pub id: String,
    /// Community name.
    pub name: String,
    /// Community summary.
    #[serde(default)]
    pub summary: String,
}

/// A search hit with its reranker score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scored<T> {
    /// The hit.
    pub item: T,
    /// Reranker score in `[0, 1]`.
    pub score: f64,
}

impl<T> Scored<T> {
    /// Pairs a hit with its score.
    pub const fn new(item: T, score: f64) -> Self {
        Self { item, score }
    }
}

/// Results of one hybrid search call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    /// Node hits, best first.
    #[serde(default)]
    pub nodes: Vec<Scored<GraphNode>>,
    /// Edge hits, best first.
    #[serde(default)]
    pub edges: Vec<Scored<GraphEdge>>,
    /// Community hits, best first.
    #[serde(default)]
    pub communities: Vec<Scored<GraphCommunity>>,
}

