//! Workflow controller: the finite-state machine driving one query.
//!
//! ```text
//! PLAN -> RETRIEVE -> PLAN ... -> SYNTHESIZE -> REFLECT -> SYNTHESIZE ... -> DONE
//! ```
//!
//! Collaborators are injected at construction. Each run owns its own
//! [`SearchState`]; nothing is shared between concurrent runs.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::config::AgentConfig;
use super::planner::QueryPlanner;
use super::prompt::PromptSet;
use super::provider::LlmProvider;
use super::reflection::ReflectionController;
use super::retrieval::{RetrievalOrchestrator, RoundReport};
use super::synthesizer::{Synthesis, SynthesisEngine};
use crate::core::SearchState;
use crate::error::{AgentError, Result, WorkflowError};
use crate::graph::GraphStore;

/// Maximum accepted query length in bytes.
pub const MAX_QUERY_LEN: usize = 10_000;

/// A query submitted to the workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    /// Natural-language query.
    pub user_query: String,
    /// Graph partition to search.
    pub group_id: String,
    /// Round count override.
    #[serde(default)]
    pub search_depth: Option<usize>,
    /// Per-query result limit override.
    #[serde(default)]
    pub max_results_per_round: Option<usize>,
}

impl QueryRequest {
    /// Creates a request using the configured depth and result limit.
    #[must_use]
    pub fn new(user_query: impl Into<String>, group_id: impl Into<String>) -> Self {
        Self {
            user_query: user_query.into(),
            group_id: group_id.into(),
            search_depth: None,
            max_results_per_round: None,
        }
    }

    /// Overrides the number of rounds.
    #[must_use]
    pub const fn with_search_depth(mut self, depth: usize) -> Self {
        self.search_depth = Some(depth);
        self
    }

    /// Overrides the per-query result limit.
    #[must_use]
    pub const fn with_max_results_per_round(mut self, limit: usize) -> Self {
        self.max_results_per_round = Some(limit);
        self
    }

    /// Checks the request before any collaborator is called.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::InvalidQuery`] describing the first problem.
    pub fn validate(&self) -> std::result::Result<(), AgentError> {
        let invalid = |message: String| Err(AgentError::InvalidQuery { message });

        if self.user_query.trim().is_empty() {
            return invalid("query must not be empty".to_string());
        }
        if self.user_query.len() > MAX_QUERY_LEN {
            return invalid(format!(
                "query too long: {} bytes (max {MAX_QUERY_LEN})",
                self.user_query.len()
            ));
        }
        if self.group_id.trim().is_empty() {
            return invalid("group id must not be empty".to_string());
        }
        if self.search_depth == Some(0) {
            return invalid("search depth must be at least 1".to_string());
        }
        if self.max_results_per_round == Some(0) {
            return invalid("max results per round must be at least 1".to_string());
        }
        Ok(())
    }
}

/// States of the workflow machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowStep {
    /// Plan the current round's queries.
    Plan,
    /// Search the planned queries.
    Retrieve(Vec<String>),
    /// Write the final answer.
    Synthesize,
    /// Critique the final answer.
    Reflect,
    /// Terminal.
    Done,
}

/// Counters gathered over one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    /// Retrieval rounds completed.
    pub rounds: usize,
    /// Search strings issued by the planner.
    pub queries_issued: usize,
    /// Final-answer model calls.
    pub synthesis_calls: usize,
    /// Intermediate summaries written.
    pub intermediate_summaries: usize,
    /// Regenerations requested by reflection.
    pub regenerations: usize,
    /// Expansion calls that failed and were skipped.
    pub expansion_failures: usize,
    /// Hits skipped because their id was already stored.
    pub duplicates_skipped: usize,
    /// Hits discarded for scoring below threshold.
    pub below_threshold: usize,
    /// Whether exploration stopped after an empty first round.
    pub early_terminated: bool,
}

impl RunStats {
    const fn absorb(&mut self, report: &RoundReport) {
        self.expansion_failures += report.expansion_failures;
        self.duplicates_skipped += report.duplicates;
        self.below_threshold += report.below_threshold;
    }

    fn finish(&mut self, state: &SearchState) {
        self.rounds = state.current_round();
        self.queries_issued = state.issued_queries.len();
        self.regenerations = state.regeneration_count();
        self.early_terminated = state.early_terminated();
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    /// The accepted answer.
    pub answer: String,
    /// Everything accumulated while answering.
    pub state: SearchState,
    /// Run counters.
    pub stats: RunStats,
    /// Wall-clock time of the run.
    pub elapsed: Duration,
}

/// Drives the plan, retrieve, synthesize, and reflect loop.
pub struct WorkflowController {
    provider: Arc<dyn LlmProvider>,
    store: Arc<dyn GraphStore>,
    config: AgentConfig,
    planner: QueryPlanner,
    synthesis: SynthesisEngine,
    reflection: ReflectionController,
}

impl WorkflowController {
    /// Creates a controller over the given collaborators.
    ///
    /// Loads prompt templates from [`AgentConfig::prompt_dir`], falling
    /// back to compiled-in defaults.
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        store: Arc<dyn GraphStore>,
        config: AgentConfig,
    ) -> Self {
        let prompts = PromptSet::load(config.prompt_dir.as_deref());
        Self::with_prompts(provider, store, config, &prompts)
    }

    /// Creates a controller with an explicit prompt set.
    pub fn with_prompts(
        provider: Arc<dyn LlmProvider>,
        store: Arc<dyn GraphStore>,
        config: AgentConfig,
        prompts: &PromptSet,
    ) -> Self {
        Self {
            planner: QueryPlanner::new(&config, prompts.concepts.clone()),
            synthesis: SynthesisEngine::new(&config, prompts),
            reflection: ReflectionController::new(&config, prompts.reflection.clone()),
            provider,
            store,
            config,
        }
    }

    /// The controller's configuration.
    #[must_use]
    pub const fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Validates `request` and creates its initial state.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::InvalidQuery`] if the request is rejected.
    pub fn start(&self, request: &QueryRequest) -> std::result::Result<SearchState, AgentError> {
        request.validate()?;
        let depth = request.search_depth.unwrap_or(self.config.search_depth);
        let mut state = SearchState::new(request.user_query.trim(), request.group_id.trim(), depth);
        state.max_results_per_round = request
            .max_results_per_round
            .unwrap_or(self.config.max_results_per_round);
        Ok(state)
    }

    /// Answers a query end to end.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Agent`](crate::error::Error::Agent) for an invalid
    /// request and [`Error::Workflow`](crate::error::Error::Workflow) when a
    /// step fails. The latter carries the partial state for
    /// [`resume`](Self::resume).
    pub async fn run(&self, request: &QueryRequest) -> Result<QueryResult> {
        let state = self.start(request)?;
        info!(
            group_id = %state.group_id,
            search_depth = state.search_depth,
            max_results = state.max_results_per_round,
            "Starting graph search"
        );
        self.drive(state, WorkflowStep::Plan).await
    }

    /// Continues a run that failed, retrying from the state's current round.
    ///
    /// Exploration restarts at PLAN unless every round has already run, in
    /// which case the answer is synthesized directly.
    ///
    /// # Errors
    ///
    /// Same as [`run`](Self::run).
    pub async fn resume(&self, state: SearchState) -> Result<QueryResult> {
        let first = if state.rounds_exhausted() || state.early_terminated() {
            WorkflowStep::Synthesize
        } else {
            WorkflowStep::Plan
        };
        info!(round = state.current_round(), step = ?first, "Resuming graph search");
        self.drive(state, first).await
    }

    async fn drive(&self, mut state: SearchState, first: WorkflowStep) -> Result<QueryResult> {
        let started = Instant::now();
        let mut stats = RunStats::default();
        let mut step = first;

        while step != WorkflowStep::Done {
            let round = state.current_round();
            step = match self.step(&mut state, &mut stats, step).await {
                Ok(next) => next,
                Err(source) => {
                    warn!(
                        round,
                        collaborator = source.is_collaborator_failure(),
                        error = %source,
                        "Workflow step failed"
                    );
                    return Err(Box::new(WorkflowError {
                        round,
                        source,
                        state,
                    })
                    .into());
                }
            };
        }

        stats.finish(&state);
        let elapsed = started.elapsed();
        info!(
            rounds = stats.rounds,
            queries = stats.queries_issued,
            nodes = state.nodes().len(),
            edges = state.edges().len(),
            communities = state.communities().len(),
            regenerations = stats.regenerations,
            elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            "Graph search complete"
        );
        Ok(QueryResult {
            answer: state.final_answer.clone(),
            state,
            stats,
            elapsed,
        })
    }

    /// Executes one transition and returns the next step.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] when a round query or the final synthesis
    /// fails. Expansion, concept, summary, and reflection failures are
    /// absorbed.
    pub async fn step(
        &self,
        state: &mut SearchState,
        stats: &mut RunStats,
        step: WorkflowStep,
    ) -> std::result::Result<WorkflowStep, AgentError> {
        debug!(round = state.current_round(), step = ?step, "Workflow step");
        match step {
            WorkflowStep::Plan => {
                let queries = self.planner.plan(self.provider.as_ref(), state).await;
                Ok(WorkflowStep::Retrieve(queries))
            }
            WorkflowStep::Retrieve(queries) => {
                let report = RetrievalOrchestrator::new(self.store.as_ref(), &self.config)
                    .run_round(state, &queries)
                    .await?;
                stats.absorb(&report);

                if state.current_round() == 1 && state.is_empty() {
                    info!("First round found nothing, skipping remaining rounds");
                    state.mark_early_terminated();
                    return Ok(WorkflowStep::Synthesize);
                }
                if state.rounds_exhausted() {
                    return Ok(WorkflowStep::Synthesize);
                }
                if self.config.intermediate_summaries
                    && report.found_new()
                    && self
                        .synthesis
                        .summarize_round(self.provider.as_ref(), state)
                        .await
                {
                    stats.intermediate_summaries += 1;
                }
                Ok(WorkflowStep::Plan)
            }
            WorkflowStep::Synthesize => {
                let outcome = self
                    .synthesis
                    .synthesize(self.provider.as_ref(), state)
                    .await?;
                if outcome != Synthesis::NoInformation {
                    stats.synthesis_calls += 1;
                }
                Ok(WorkflowStep::Reflect)
            }
            WorkflowStep::Reflect => {
                // Nothing was retrieved, so there is nothing to judge the answer against.
                if state.is_empty() {
                    state.accept_answer();
                    return Ok(WorkflowStep::Done);
                }
                if self.reflection.reflect(self.provider.as_ref(), state).await {
                    Ok(WorkflowStep::Synthesize)
                } else {
                    Ok(WorkflowStep::Done)
                }
            }
            WorkflowStep::Done => Ok(WorkflowStep::Done),
        }
    }
}
