//! Search configuration passed to the graph store on every call.
//!
//! The store decides how to honour each method and reranker; the agent
//! only picks which ones to request.

use serde::{Deserialize, Serialize};

/// Default per-query result limit for round searches.
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

/// Candidate-generation methods for edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeSearchMethod {
    /// Lexical full-text match on the fact.
    Bm25,
    /// Vector similarity on the fact embedding.
    CosineSimilarity,
    /// Breadth-first traversal from matched nodes.
    Bfs,
}

/// Candidate-generation methods for nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeSearchMethod {
    /// Lexical full-text match on name and summary.
    Bm25,
    /// Vector similarity on the name embedding.
    CosineSimilarity,
    /// Breadth-first traversal.
    Bfs,
}

/// Rerankers for edge candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeReranker {
    /// Reciprocal rank fusion.
    Rrf,
    /// Frequency of mentions across episodes.
    EpisodeMentions,
    /// Cross-encoder relevance model.
    CrossEncoder,
}

/// Rerankers for node candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeReranker {
    /// Reciprocal rank fusion.
    Rrf,
    /// Frequency of mentions across episodes.
    EpisodeMentions,
    /// Cross-encoder relevance model.
    CrossEncoder,
}

/// Edge half of a search configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeSearchConfig {
    /// Candidate methods.
    pub methods: Vec<EdgeSearchMethod>,
    /// Reranker applied to merged candidates.
    pub reranker: EdgeReranker,
}

/// Node half of a search configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSearchConfig {
    /// Candidate methods.
    pub methods: Vec<NodeSearchMethod>,
    /// Reranker applied to merged candidates.
    pub reranker: NodeReranker,
}

/// Full configuration for one hybrid search call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Edge search settings.
    pub edge: EdgeSearchConfig,
    /// Node search settings.
    pub node: NodeSearchConfig,
    /// Maximum hits per record kind.
    pub limit: usize,
}

impl SearchConfig {
    /// Configuration for a round query: lexical plus vector edges reranked
    /// by episode mentions, vector plus breadth-first nodes reranked by a
    /// cross-encoder.
    #[must_use]
    pub fn round_query(limit: usize) -> Self {
        Self {
            edge: EdgeSearchConfig {
                methods: vec![EdgeSearchMethod::Bm25, EdgeSearchMethod::CosineSimilarity],
                reranker: EdgeReranker::EpisodeMentions,
            },
            node: NodeSearchConfig {
                methods: vec![NodeSearchMethod::CosineSimilarity, NodeSearchMethod::Bfs],
                reranker: NodeReranker::CrossEncoder,
            },
            limit,
        }
    }

    /// Configuration for semantic edge expansion: vector similarity only.
    #[must_use]
    pub fn fact_similarity(limit: usize) -> Self {
        Self {
            edge: EdgeSearchConfig {
                methods: vec![EdgeSearchMethod::CosineSimilarity],
                reranker: EdgeReranker::EpisodeMentions,
            },
            node: NodeSearchConfig {
                methods: vec![NodeSearchMethod::CosineSimilarity],
                reranker: NodeReranker::CrossEncoder,
            },
            limit,
        }
    }

    /// Returns `true` if only vector similarity is requested.
    #[must_use]
    pub fn is_vector_only(&self) -> bool {
        self.edge
            .methods
            .iter()
            .all(|m| *m == EdgeSearchMethod::CosineSimilarity)
            && self
                .node
                .methods
                .iter()
                .all(|m| *m == NodeSearchMethod::CosineSimilarity)
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self::round_query(DEFAULT_SEARCH_LIMIT)
    }
}
