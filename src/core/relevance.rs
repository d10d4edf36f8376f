//! Relevance thresholds for accepting graph hits.
//!
//! This type lives in `core` so the state can enforce the thresholds at
//! insertion time without depending on agent configuration.

use serde::{Deserialize, Serialize};

/// Default minimum score for nodes.
pub const DEFAULT_NODE_THRESHOLD: f64 = 0.5;
/// Default minimum score for edges.
pub const DEFAULT_EDGE_THRESHOLD: f64 = 0.5;
/// Default minimum score for communities.
pub const DEFAULT_COMMUNITY_THRESHOLD: f64 = 0.3;

/// Kind of record a score is being checked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    /// Entity node.
    Node,
    /// Fact edge.
    Edge,
    /// Community summary.
    Community,
}

impl RecordKind {
    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::Edge => "edge",
            Self::Community => "community",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Minimum reranker scores a hit must reach to be stored.
///
/// Scores are compared inclusively: a hit scoring exactly the threshold
/// is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RelevanceThresholds {
    /// Minimum node score.
    pub node: f64,
    /// Minimum edge score.
    pub edge: f64,
    /// Minimum community score.
    pub community: f64,
}

impl Default for RelevanceThresholds {
    fn default() -> Self {
        Self {
            node: DEFAULT_NODE_THRESHOLD,
            edge: DEFAULT_EDGE_THRESHOLD,
            community: DEFAULT_COMMUNITY_THRESHOLD,
        }
    }
}

impl RelevanceThresholds {
    /// Returns the threshold for the given record kind.
    #[must_use]
    pub const fn for_kind(&self, kind: RecordKind) -> f64 {
        match kind {
            RecordKind::Node => self.node,
            RecordKind::Edge => self.edge,
            RecordKind::Community => self.community,
        }
    }

    /// Returns `true` if `score` meets the threshold for `kind`.
    ///
    /// `NaN` never meets a threshold.
    #[must_use]
    pub fn admits(&self, kind: RecordKind, score: f64) -> bool {
        score >= self.for_kind(kind)
    }
}
