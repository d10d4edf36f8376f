//! # graph-search-agent
//!
//! Depth-bounded retrieval over a temporal knowledge graph.
//!
//! A query is answered in rounds. Each round plans a set of search strings,
//! runs a hybrid search for each against a [`graph::GraphStore`], keeps the
//! hits that clear their relevance threshold (each id once), and widens the
//! result with structural and semantic expansion. After the last round the
//! accumulated records are synthesized into an answer, which a reflection
//! pass may send back for a bounded number of revisions.
//!
//! ```text
//! PLAN → RETRIEVE → … → SYNTHESIZE → REFLECT → DONE
//! ```
//!
//! The entry point is [`agent::WorkflowController`]; text generation goes
//! through [`agent::LlmProvider`].

pub mod agent;
pub mod cli;
pub mod core;
pub mod error;
pub mod graph;

pub use agent::{AgentConfig, QueryRequest, QueryResult, WorkflowController};
pub use crate::core::SearchState;
pub use error::{AgentError, Error, Result};
