//! Graph store seam.
//!
//! The agent talks to the temporal knowledge graph only through
//! [`GraphStore`]. [`InMemoryGraph`] answers from a JSON snapshot.

pub mod config;
pub mod memory;
pub mod store;
pub mod types;

pub use config::{
    EdgeReranker, EdgeSearchConfig, EdgeSearchMethod, NodeReranker, NodeSearchConfig,
    NodeSearchMethod, SearchConfig,
};
pub use memory::{GraphPartition, GraphSnapshot, InMemoryGraph};
pub use store::GraphStore;
pub use types::{GraphCommunity, GraphEdge, GraphNode, Scored, SearchResults};
