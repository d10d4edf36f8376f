//! Error types for graph-search-agent.
//!
//! Collaborator and orchestration failures are [`AgentError`]; CLI failures
//! are [`CommandError`]. Both convert into the top-level [`Error`].

use std::time::Duration;

use thiserror::Error;

use crate::core::SearchState;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Agent or collaborator failure.
    #[error(transparent)]
    Agent(#[from] AgentError),

    /// Workflow round failure.
    #[error(transparent)]
    Workflow(#[from] Box<WorkflowError>),

    /// CLI command failure.
    #[error(transparent)]
    Command(#[from] CommandError),
}

/// Errors raised by the agent layer and its collaborators.
#[derive(Debug, Error)]
pub enum AgentError {
    /// No API key was configured for the text generation provider.
    #[error("API key missing: set LLM_API_KEY or OPENAI_API_KEY")]
    ApiKeyMissing,

    /// The configured provider name has no implementation.
    #[error("unsupported provider: {name}")]
    UnsupportedProvider {
        /// Provider name as configured.
        name: String,
    },

    /// The text generation API call failed.
    #[error("API request failed: {message}")]
    ApiRequest {
        /// Error detail from the provider.
        message: String,
        /// HTTP status, when known.
        status: Option<u16>,
    },

    /// The graph store call failed.
    #[error("graph store error during {operation}: {message}")]
    GraphStore {
        /// Store operation that failed (e.g. `hybrid_search`).
        operation: &'static str,
        /// Error detail from the store.
        message: String,
    },

    /// A collaborator call exceeded its deadline.
    #[error("{operation} timed out after {}s", elapsed.as_secs_f64())]
    Timeout {
        /// Collaborator call that expired.
        operation: &'static str,
        /// Deadline that was exceeded.
        elapsed: Duration,
    },

    /// A collaborator response did not match the expected format.
    #[error("failed to parse response: {message}")]
    ResponseParse {
        /// What was wrong with the response.
        message: String,
        /// The raw response content.
        content: String,
    },

    /// The incoming query was rejected before any work started.
    #[error("invalid query: {message}")]
    InvalidQuery {
        /// Validation failure detail.
        message: String,
    },
}

impl AgentError {
    /// Builds a [`AgentError::GraphStore`] error.
    pub fn graph_store(operation: &'static str, message: impl Into<String>) -> Self {
        Self::GraphStore {
            operation,
            message: message.into(),
        }
    }

    /// Returns `true` for failures of an external collaborator call
    /// (LLM or graph store), including timeouts.
    #[must_use]
    pub const fn is_collaborator_failure(&self) -> bool {
        matches!(
            self,
            Self::ApiRequest { .. } | Self::GraphStore { .. } | Self::Timeout { .. }
        )
    }
}

/// A retrieval round failed.
///
/// Carries the partially accumulated state so the caller can either retry
/// the round with [`WorkflowController::resume`](crate::agent::WorkflowController::resume)
/// or abandon the run and use whatever was gathered.
#[derive(Debug, Error)]
#[error("round {round} failed: {source}")]
pub struct WorkflowError {
    /// Round index that failed.
    pub round: usize,
    /// Underlying collaborator error.
    #[source]
    pub source: AgentError,
    /// State at the time of failure, including results merged before the
    /// failing query.
    pub state: SearchState,
}

/// Errors raised by CLI commands.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The command could not run.
    #[error("{0}")]
    ExecutionFailed(String),

    /// Input file could not be read or parsed.
    #[error("invalid input {path}: {message}")]
    InvalidInput {
        /// Offending path.
        path: String,
        /// What went wrong.
        message: String,
    },

    /// Output could not be rendered.
    #[error("output format error: {0}")]
    OutputFormat(String),
}
