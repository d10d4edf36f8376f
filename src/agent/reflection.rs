//! Reflection on the final answer.
//!
//! The critique must answer in a fixed two-line shape:
//!
//! ```text
//! NEEDS_REGENERATION: YES
//! FEEDBACK: what to change
//! ```
//!
//! Anything that does not match is treated as acceptance, as is a failed
//! critique call. Regeneration is bounded by `max_regenerations`.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, info, warn};

use super::config::AgentConfig;
use super::prompt::build_reflection_prompt;
use super::provider::LlmProvider;
use super::timeout::with_timeout;
use super::traits::Agent;
use crate::core::SearchState;
use crate::error::AgentError;

static VERDICT_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"(?is)\A\s*NEEDS_REGENERATION:[ \t]*(YES|NO)[ \t]*(?:\r?\n\s*FEEDBACK:[ \t]*(.*?))?\s*\z",
    )
    .ok()
});

/// Parsed critique.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReflectionVerdict {
    /// The answer stands.
    Accept,
    /// The answer should be rewritten.
    Regenerate {
        /// What the rewrite should address.
        feedback: String,
    },
}

/// Parses a critique reply.
///
/// # Errors
///
/// Returns [`AgentError::ResponseParse`] if the reply does not match the
/// verdict format, or asks for regeneration without feedback.
pub fn parse_verdict(content: &str) -> Result<ReflectionVerdict, AgentError> {
    let parse_error = |message: &str| AgentError::ResponseParse {
        message: message.to_string(),
        content: content.to_string(),
    };

    let re = VERDICT_RE
        .as_ref()
        .ok_or_else(|| parse_error("verdict pattern unavailable"))?;
    let caps = re
        .captures(content)
        .ok_or_else(|| parse_error("reply does not match NEEDS_REGENERATION/FEEDBACK format"))?;

    let needs_regeneration = caps
        .get(1)
        .is_some_and(|m| m.as_str().eq_ignore_ascii_case("yes"));
    if !needs_regeneration {
        return Ok(ReflectionVerdict::Accept);
    }

    let feedback = caps.get(2).map_or("", |m| m.as_str().trim());
    if feedback.is_empty() || feedback.eq_ignore_ascii_case("none") {
        return Err(parse_error("regeneration requested without feedback"));
    }
    Ok(ReflectionVerdict::Regenerate {
        feedback: feedback.to_string(),
    })
}

/// Agent that critiques the final answer.
pub struct ReflectionAgent {
    model: String,
    system_prompt: String,
}

impl ReflectionAgent {
    /// Creates a reflection agent with the given configuration and system prompt.
    #[must_use]
    pub fn new(config: &AgentConfig, system_prompt: String) -> Self {
        Self {
            model: config.model.clone(),
            system_prompt,
        }
    }
}

#[async_trait]
impl Agent for ReflectionAgent {
    fn name(&self) -> &'static str {
        "reflection"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn max_tokens(&self) -> u32 {
        512
    }
}

/// Decides whether the final answer is regenerated.
pub struct ReflectionController {
    agent: ReflectionAgent,
    enabled: bool,
    max_regenerations: usize,
    timeout: Duration,
}

impl ReflectionController {
    /// Creates a controller whose agent uses `reflection_prompt`.
    #[must_use]
    pub fn new(config: &AgentConfig, reflection_prompt: String) -> Self {
        Self {
            agent: ReflectionAgent::new(config, reflection_prompt),
            enabled: config.enable_reflection,
            max_regenerations: config.max_regenerations,
            timeout: config.timeout,
        }
    }

    /// Critiques `state.final_answer` and records the decision on the state.
    ///
    /// Returns `true` if a regeneration was requested. Does nothing when
    /// reflection is disabled, there is no answer, or the regeneration
    /// budget is spent.
    pub async fn reflect(&self, provider: &dyn LlmProvider, state: &mut SearchState) -> bool {
        if !self.enabled
            || state.final_answer.trim().is_empty()
            || state.regeneration_count() >= self.max_regenerations
        {
            state.accept_answer();
            return false;
        }

        let prompt = build_reflection_prompt(state);
        let content = match with_timeout(
            "reflection",
            self.timeout,
            self.agent.execute(provider, &prompt),
        )
        .await
        {
            Ok(response) => response.content,
            Err(e) => {
                warn!(error = %e, "Reflection failed, accepting answer");
                state.accept_answer();
                return false;
            }
        };

        match parse_verdict(&content) {
            Ok(ReflectionVerdict::Accept) => {
                debug!("Reflection accepted the answer");
                state.accept_answer();
                false
            }
            Ok(ReflectionVerdict::Regenerate { feedback }) => {
                let requested = state.request_regeneration(feedback, self.max_regenerations);
                if requested {
                    info!(
                        regeneration = state.regeneration_count(),
                        max = self.max_regenerations,
                        "Reflection requested regeneration"
                    );
                }
                requested
            }
            Err(e) => {
                warn!(error = %e, "Unparseable reflection, accepting answer");
                state.accept_answer();
                false
            }
        }
    }
}
