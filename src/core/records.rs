//! Accumulated records stored in the search state.
//!
//! Each record is a graph hit that passed its relevance threshold, stamped
//! with the round that discovered it and the score it was accepted with.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::graph::{GraphCommunity, GraphEdge, GraphNode};

/// How a record was discovered.
///
/// Normal rounds carry their index. Records found by structural or
/// semantic expansion use [`DiscoveryRound::Expansion`] so they are never
/// attributed to a round-scoped hybrid search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryRound {
    /// Discovered by the hybrid search of the given round.
    Round(usize),
    /// Discovered by structural or semantic expansion.
    Expansion,
}

impl DiscoveryRound {
    /// Returns `true` if this is the given normal round.
    #[must_use]
    pub const fn is_round(self, round: usize) -> bool {
        matches!(self, Self::Round(r) if r == round)
    }
}

impl std::fmt::Display for DiscoveryRound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Round(r) => write!(f, "round {r}"),
            Self::Expansion => f.write_str("expansion"),
        }
    }
}

/// An accepted entity node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Node id in the graph.
    pub id: String,
    /// Entity name.
    pub name: String,
    /// Entity summary.
    pub summary: String,
    /// Discovery round.
    pub round_discovered: DiscoveryRound,
    /// Reranker score at acceptance.
    pub relevance_score: f64,
}

impl NodeRecord {
    /// Stamps a graph node with its discovery round and score.
    #[must_use]
    pub fn discovered(node: GraphNode, round: DiscoveryRound, score: f64) -> Self {
        Self {
            id: node.id,
            name: node.name,
            summary: node.summary,
            round_discovered: round,
            relevance_score: score,
        }
    }
}

/// An accepted fact edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    /// Edge id in the graph.
    pub id: String,
    /// Relation type name (e.g. `RESCUED`).
    pub relation_name: String,
    /// Natural-language fact.
    pub fact: String,
    /// Source node id.
    pub source_node_id: String,
    /// Target node id.
    pub target_node_id: String,
    /// Episodes that mention this fact.
    #[serde(default)]
    pub episode_refs: Vec<String>,
    /// Start of validity, when known.
    #[serde(default)]
    pub valid_at: Option<DateTime<Utc>>,
    /// End of validity, when known.
    #[serde(default)]
    pub invalid_at: Option<DateTime<Utc>>,
    /// Discovery round.
    pub round_discovered: DiscoveryRound,
    /// Reranker score at acceptance (or the fixed structural score).
    pub relevance_score: f64,
}

impl EdgeRecord {
    /// Stamps a graph edge with its discovery round and score.
    #[must_use]
    pub fn discovered(edge: GraphEdge, round: DiscoveryRound, score: f64) -> Self {
        Self {
            id: edge.id,
            relation_name: edge.relation_name,
            fact: edge.fact,
            source_node_id: edge.source_node_id,
            target_node_id: edge.target_node_id,
            episode_refs: edge.episode_refs,
            valid_at: edge.valid_at,
            invalid_at: edge.invalid_at,
            round_discovered: round,
            relevance_score: score,
        }
    }
}

/// An accepted community summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityRecord {
    /// Community id in the graph.
    pub id: String,
    /// Community name.
    pub name: String,
    /// Community summary.
    pub summary: String,
    /// Discovery round.
    pub round_discovered: DiscoveryRound,
    /// Reranker score at acceptance.
    pub relevance_score: f64,
}

impl CommunityRecord {
    /// Stamps a graph community with its discovery round and score.
    #[must_use]
    pub fn discovered(community: GraphCommunity, round: DiscoveryRound, score: f64) -> Self {
        Self {
            id: community.id,
            name: community.name,
            summary: community.summary,
            round_discovered: round,
            relevance_score: score,
        }
    }
}
