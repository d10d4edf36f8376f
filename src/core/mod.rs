//! Core data model for graph exploration.
//!
//! Nothing in this module calls a collaborator: it holds the records,
//! thresholds, and the per-query [`SearchState`] the agent layer mutates.

pub mod records;
pub mod relevance;
pub mod state;

pub use records::{CommunityRecord, DiscoveryRound, EdgeRecord, NodeRecord};
pub use relevance::{RecordKind, RelevanceThresholds};
pub use state::{Admission, SearchState};
