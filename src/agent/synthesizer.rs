//! Synthesis of intermediate summaries and the final answer.
//!
//! Takes the records accumulated in the [`SearchState`] and produces
//! natural-language text from them. The final answer never draws on
//! anything outside the state; an empty state short-circuits to a fixed
//! reply without calling the model.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::config::AgentConfig;
use super::message::{assistant_message, user_message};
use super::prompt::{
    PromptSet, build_final_prompt, build_intermediate_prompt, build_revision_prompt,
};
use super::provider::LlmProvider;
use super::timeout::with_timeout;
use super::traits::Agent;
use crate::core::{DiscoveryRound, EdgeRecord, NodeRecord, SearchState};
use crate::error::AgentError;

/// Answer returned when exploration found nothing at all.
pub const NO_INFORMATION_ANSWER: &str =
    "I could not find any information about this in the knowledge graph.";

/// Max tokens for an intermediate summary.
const INTERMEDIATE_MAX_TOKENS: u32 = 300;

/// Agent that turns graph records into prose.
///
/// The same type serves both synthesis roles; only the name, prompt, and
/// token budget differ.
pub struct SynthesizerAgent {
    name: &'static str,
    model: String,
    temperature: f32,
    max_tokens: u32,
    system_prompt: String,
}

impl SynthesizerAgent {
    /// Creates the final-answer agent.
    #[must_use]
    pub fn final_answer(config: &AgentConfig, system_prompt: String) -> Self {
        Self {
            name: "synthesizer",
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            system_prompt,
        }
    }

    /// Creates the intermediate-summary agent.
    #[must_use]
    pub fn intermediate(config: &AgentConfig, system_prompt: String) -> Self {
        Self {
            name: "intermediate",
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: INTERMEDIATE_MAX_TOKENS.min(config.max_tokens),
            system_prompt,
        }
    }
}

#[async_trait]
impl Agent for SynthesizerAgent {
    fn name(&self) -> &'static str {
        self.name
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn temperature(&self) -> f32 {
        self.temperature
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}

/// How the final answer was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Synthesis {
    /// The state was empty; the fixed reply was used.
    NoInformation,
    /// First answer from the model.
    Generated,
    /// Answer rewritten in response to reflection feedback.
    Revised,
}

/// Produces intermediate summaries and final answers.
pub struct SynthesisEngine {
    final_agent: SynthesizerAgent,
    intermediate_agent: SynthesizerAgent,
    timeout: Duration,
}

impl SynthesisEngine {
    /// Creates an engine using the prompts from `prompts`.
    #[must_use]
    pub fn new(config: &AgentConfig, prompts: &PromptSet) -> Self {
        Self {
            final_agent: SynthesizerAgent::final_answer(config, prompts.final_answer.clone()),
            intermediate_agent: SynthesizerAgent::intermediate(
                config,
                prompts.intermediate.clone(),
            ),
            timeout: config.timeout,
        }
    }

    /// Summarizes the records discovered by the round that just completed
    /// and appends the summary to the state.
    ///
    /// Returns `false` without calling the model when the round found
    /// nothing. A failed call is logged and skipped.
    pub async fn summarize_round(&self, provider: &dyn LlmProvider, state: &mut SearchState) -> bool {
        let Some(round) = state.current_round().checked_sub(1) else {
            return false;
        };
        let nodes: Vec<&NodeRecord> = state.nodes_from(DiscoveryRound::Round(round)).collect();
        let edges: Vec<&EdgeRecord> = state.edges_from(DiscoveryRound::Round(round)).collect();
        if nodes.is_empty() && edges.is_empty() {
            debug!(round, "Nothing new this round, skipping summary");
            return false;
        }

        let prompt = build_intermediate_prompt(&state.user_query, round, &nodes, &edges);
        let result = with_timeout(
            "intermediate_summary",
            self.timeout,
            self.intermediate_agent.execute(provider, &prompt),
        )
        .await;

        match result {
            Ok(response) if !response.content.trim().is_empty() => {
                state
                    .intermediate_summaries
                    .push(response.content.trim().to_string());
                debug!(round, "Intermediate summary recorded");
                true
            }
            Ok(_) => {
                warn!(round, "Intermediate summary was empty");
                false
            }
            Err(e) => {
                warn!(round, error = %e, "Intermediate summary failed, continuing");
                false
            }
        }
    }

    /// Writes `state.final_answer` from everything gathered.
    ///
    /// When reflection requested a regeneration, the previous answer and
    /// the feedback are sent as follow-up turns so the model revises
    /// rather than starts over.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] if the model call fails or returns nothing.
    pub async fn synthesize(
        &self,
        provider: &dyn LlmProvider,
        state: &mut SearchState,
    ) -> Result<Synthesis, AgentError> {
        if state.is_empty() {
            info!("No records gathered, returning fixed answer");
            NO_INFORMATION_ANSWER.clone_into(&mut state.final_answer);
            state.needs_regeneration = false;
            return Ok(Synthesis::NoInformation);
        }

        let mut turns = vec![user_message(&build_final_prompt(state))];
        let mut revising = false;
        if state.needs_regeneration
            && !state.final_answer.is_empty()
            && let Some(feedback) = state.reflection_feedback.as_deref()
        {
            turns.push(assistant_message(&state.final_answer));
            turns.push(user_message(&build_revision_prompt(feedback)));
            revising = true;
        }

        let response = with_timeout(
            "final_synthesis",
            self.timeout,
            self.final_agent.execute_turns(provider, turns),
        )
        .await?;

        let answer = response.content.trim();
        if answer.is_empty() {
            return Err(AgentError::ResponseParse {
                message: "final answer was empty".to_string(),
                content: response.content,
            });
        }

        answer.clone_into(&mut state.final_answer);
        state.needs_regeneration = false;
        info!(
            revision = state.regeneration_count(),
            chars = state.final_answer.len(),
            "Final answer synthesized"
        );
        Ok(if revising {
            Synthesis::Revised
        } else {
            Synthesis::Generated
        })
    }
}
