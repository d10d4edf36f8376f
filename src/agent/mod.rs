//! Agent layer: the control logic that answers a query from the graph.
//!
//! Uses a pluggable provider abstraction backed by OpenAI-compatible APIs
//! for every text generation call, and the [`GraphStore`](crate::graph::GraphStore)
//! trait for every graph read.
//!
//! # Architecture
//!
//! ```text
//! QueryRequest → WorkflowController
//!   ├── QueryPlanner (round queries; ConceptAgent extracts concepts)
//!   ├── RetrievalOrchestrator
//!   │   ├── hybrid search per query → thresholded, deduplicated merge
//!   │   └── structural ∥ semantic expansion
//!   ├── ... repeat for search_depth rounds (SynthesisEngine summarizes each)
//!   ├── SynthesisEngine → final answer
//!   └── ReflectionController → accept, or regenerate (bounded)
//! ```

pub mod client;
pub mod config;
pub mod message;
pub mod planner;
pub mod prompt;
pub mod provider;
pub mod providers;
pub mod reflection;
pub mod retrieval;
pub mod synthesizer;
pub mod timeout;
pub mod traits;
pub mod workflow;

// Re-export key types
pub use client::create_provider;
pub use config::{AgentConfig, AgentConfigBuilder, ExpansionLimits};
pub use message::{ChatMessage, ChatRequest, ChatResponse, Role, TokenUsage};
pub use planner::{ConceptAgent, QueryPlanner};
pub use prompt::PromptSet;
pub use provider::LlmProvider;
pub use reflection::{ReflectionAgent, ReflectionController, ReflectionVerdict, parse_verdict};
pub use retrieval::{RetrievalOrchestrator, RoundReport};
pub use synthesizer::{NO_INFORMATION_ANSWER, Synthesis, SynthesisEngine, SynthesizerAgent};
pub use traits::{Agent, AgentResponse};
pub use workflow::{QueryRequest, QueryResult, RunStats, WorkflowController, WorkflowStep};
