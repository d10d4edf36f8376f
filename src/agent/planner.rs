//! Query planning for retrieval rounds.
//!
//! Round 0 searches the user query verbatim. Later rounds widen the net
//! with entity names, relation types, and concepts extracted from the
//! previous round's strongest facts.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::config::{AgentConfig, ExpansionLimits};
use super::prompt::build_concept_prompt;
use super::provider::LlmProvider;
use super::timeout::with_timeout;
use super::traits::Agent;
use crate::core::{DiscoveryRound, EdgeRecord, SearchState};

/// Agent that extracts search concepts from retrieved facts.
pub struct ConceptAgent {
    model: String,
    system_prompt: String,
}

impl ConceptAgent {
    /// Creates a concept agent with the given configuration and system prompt.
    #[must_use]
    pub fn new(config: &AgentConfig, system_prompt: String) -> Self {
        Self {
            model: config.model.clone(),
            system_prompt,
        }
    }
}

#[async_trait]
impl Agent for ConceptAgent {
    fn name(&self) -> &'static str {
        "concepts"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn max_tokens(&self) -> u32 {
        256
    }
}

/// Splits a comma-separated concept reply into at most `max` distinct
/// concepts, in reply order.
///
/// List markers and surrounding whitespace are stripped; duplicates are
/// compared case-insensitively.
#[must_use]
pub fn parse_concepts(reply: &str, max: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    reply
        .split([',', '\n'])
        .map(|c| c.trim().trim_start_matches(['-', '*', '•']).trim())
        .filter(|c| !c.is_empty())
        .filter(|c| seen.insert(c.to_lowercase()))
        .take(max)
        .map(str::to_string)
        .collect()
}

/// Produces the search strings for each round.
pub struct QueryPlanner {
    agent: ConceptAgent,
    limits: ExpansionLimits,
    timeout: Duration,
}

impl QueryPlanner {
    /// Creates a planner whose concept agent uses `concept_prompt`.
    #[must_use]
    pub fn new(config: &AgentConfig, concept_prompt: String) -> Self {
        Self {
            agent: ConceptAgent::new(config, concept_prompt),
            limits: config.expansion,
            timeout: config.timeout,
        }
    }

    /// Plans the current round's queries and records them in
    /// `issued_queries`.
    ///
    /// Never fails: concept extraction degrades to no concepts.
    pub async fn plan(&self, provider: &dyn LlmProvider, state: &mut SearchState) -> Vec<String> {
        let round = state.current_round();
        let base = state.user_query.clone();

        let mut queries = vec![base.clone()];
        if round > 0 {
            queries.extend(
                self.entity_names(state)
                    .into_iter()
                    .map(|name| format!("{base} {name}")),
            );
            queries.extend(
                self.relation_names(state)
                    .into_iter()
                    .map(|relation| format!("{base} {relation}")),
            );
            let concepts = self.extract_concepts(provider, state).await;
            queries.extend(
                concepts
                    .into_iter()
                    .take(self.limits.concept_queries)
                    .map(|concept| format!("{base} {concept}")),
            );
        }

        let mut seen = HashSet::new();
        queries.retain(|q| seen.insert(q.clone()));

        debug!(round, queries = queries.len(), "Planned round queries");
        state.issued_queries.extend(queries.iter().cloned());
        queries
    }

    /// Names of the most recently accepted nodes not yet used for
    /// expansion. Each returned node is marked expanded.
    fn entity_names(&self, state: &mut SearchState) -> Vec<String> {
        let picked: Vec<(String, String)> = state
            .nodes()
            .iter()
            .rev()
            .filter(|n| !n.name.trim().is_empty() && !state.is_expanded(&n.id))
            .take(self.limits.entity_queries)
            .map(|n| (n.id.clone(), n.name.clone()))
            .collect();

        picked
            .into_iter()
            .map(|(id, name)| {
                state.mark_expanded(&id);
                name
            })
            .collect()
    }

    /// Distinct relation names, in discovery order, not yet used for
    /// expansion. Each returned name is marked queried.
    fn relation_names(&self, state: &mut SearchState) -> Vec<String> {
        let picked: Vec<String> = {
            let mut seen = HashSet::new();
            state
                .edges()
                .iter()
                .map(|e| e.relation_name.trim())
                .filter(|r| !r.is_empty() && !state.is_relation_queried(r) && seen.insert(*r))
                .take(self.limits.relation_queries)
                .map(str::to_string)
                .collect()
        };

        for relation in &picked {
            state.mark_relation_queried(relation);
        }
        picked
    }

    /// Extracts concepts from the previous round's strongest facts with a
    /// single LLM call.
    pub async fn extract_concepts(
        &self,
        provider: &dyn LlmProvider,
        state: &SearchState,
    ) -> Vec<String> {
        let Some(previous) = state.current_round().checked_sub(1) else {
            return Vec::new();
        };

        let mut edges: Vec<&EdgeRecord> = state.edges_from(DiscoveryRound::Round(previous)).collect();
        edges.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));
        let facts: Vec<&str> = edges
            .iter()
            .take(self.limits.concept_facts)
            .map(|e| e.fact.as_str())
            .filter(|f| !f.trim().is_empty())
            .collect();
        if facts.is_empty() {
            return Vec::new();
        }

        let prompt = build_concept_prompt(&facts);
        match with_timeout(
            "concept_extraction",
            self.timeout,
            self.agent.execute(provider, &prompt),
        )
        .await
        {
            Ok(response) => {
                let concepts = parse_concepts(&response.content, self.limits.max_concepts);
                if concepts.is_empty() {
                    warn!(round = state.current_round(), "Concept extraction returned nothing");
                } else {
                    debug!(count = concepts.len(), "Extracted concepts");
                }
                concepts
            }
            Err(e) => {
                warn!(error = %e, round = state.current_round(), "Concept extraction failed, continuing without concepts");
                Vec::new()
            }
        }
    }
}
