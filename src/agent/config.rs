//! Agent configuration with builder pattern and environment variable support.
//!
//! Configuration is resolved in order: explicit values → environment variables → defaults.

use std::path::PathBuf;
use std::time::Duration;

use crate::core::RelevanceThresholds;
use crate::error::AgentError;
use crate::graph::config::DEFAULT_SEARCH_LIMIT;

/// Default model for every LLM call.
const DEFAULT_MODEL: &str = "gpt-4o-mini";
/// Default sampling temperature.
const DEFAULT_TEMPERATURE: f32 = 0.3;
/// Default max tokens per LLM response.
const DEFAULT_MAX_TOKENS: u32 = 2048;
/// Default per-call timeout in seconds, applied to LLM and graph store calls.
const DEFAULT_TIMEOUT_SECS: u64 = 60;
/// Default number of retrieval rounds.
pub const DEFAULT_SEARCH_DEPTH: usize = 3;
/// Default cap on reflection-triggered regenerations.
pub const DEFAULT_MAX_REGENERATIONS: usize = 2;
/// Default number of round queries searched at once.
const DEFAULT_SEARCH_CONCURRENCY: usize = 4;

/// Caps applied by query planning and graph expansion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExpansionLimits {
    /// Entity-name queries per round.
    pub entity_queries: usize,
    /// Relation-type queries per round.
    pub relation_queries: usize,
    /// Concept queries per round.
    pub concept_queries: usize,
    /// Facts sent to the concept extractor.
    pub concept_facts: usize,
    /// Concepts kept from the extractor's reply.
    pub max_concepts: usize,
    /// Prior-round nodes used as structural expansion seeds.
    pub structural_seeds: usize,
    /// Outgoing relations fetched per seed node.
    pub relations_per_node: usize,
    /// Score assigned to structurally discovered edges.
    pub structural_score: f64,
    /// New edges whose facts seed semantic expansion.
    pub semantic_seeds: usize,
    /// Result limit for each semantic expansion search.
    pub semantic_result_limit: usize,
}

impl Default for ExpansionLimits {
    fn default() -> Self {
        Self {
            entity_queries: 3,
            relation_queries: 2,
            concept_queries: 3,
            concept_facts: 5,
            max_concepts: 15,
            structural_seeds: 5,
            relations_per_node: 5,
            structural_score: 0.6,
            semantic_seeds: 3,
            semantic_result_limit: 5,
        }
    }
}

/// Configuration for the agent system.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// LLM provider name (e.g., "openai").
    pub provider: String,
    /// API key for the provider.
    pub api_key: String,
    /// Optional base URL override (for proxies or compatible APIs).
    pub base_url: Option<String>,
    /// Model used for concept extraction, synthesis, and reflection.
    pub model: String,
    /// Sampling temperature for synthesis.
    pub temperature: f32,
    /// Maximum tokens per response.
    pub max_tokens: u32,
    /// Deadline for each collaborator call.
    pub timeout: Duration,
    /// Number of retrieval rounds.
    pub search_depth: usize,
    /// Hybrid-search result limit per query.
    pub max_results_per_round: usize,
    /// Round queries searched concurrently (1 = sequential).
    pub search_concurrency: usize,
    /// Whether the final answer is critiqued.
    pub enable_reflection: bool,
    /// Maximum regenerations the critique may trigger.
    pub max_regenerations: usize,
    /// Whether non-terminal rounds produce a summary.
    pub intermediate_summaries: bool,
    /// Minimum scores for accepting hits.
    pub thresholds: RelevanceThresholds,
    /// Planning and expansion caps.
    pub expansion: ExpansionLimits,
    /// Directory containing prompt template files.
    ///
    /// When set, the agent system loads system prompts from markdown files
    /// in this directory, falling back to compiled-in defaults for any
    /// missing files.
    pub prompt_dir: Option<PathBuf>,
}

impl AgentConfig {
    /// Creates a new builder for `AgentConfig`.
    #[must_use]
    pub fn builder() -> AgentConfigBuilder {
        AgentConfigBuilder::default()
    }

    /// Creates configuration from environment variables with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ApiKeyMissing`] if no API key is found.
    pub fn from_env() -> Result<Self, AgentError> {
        Self::builder().from_env().build()
    }
}

/// Builder for [`AgentConfig`].
#[derive(Debug, Clone, Default)]
pub struct AgentConfigBuilder {
    provider: Option<String>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    timeout: Option<Duration>,
    search_depth: Option<usize>,
    max_results_per_round: Option<usize>,
    search_concurrency: Option<usize>,
    enable_reflection: Option<bool>,
    max_regenerations: Option<usize>,
    intermediate_summaries: Option<bool>,
    thresholds: Option<RelevanceThresholds>,
    expansion: Option<ExpansionLimits>,
    prompt_dir: Option<PathBuf>,
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

impl AgentConfigBuilder {
    /// Populates unset fields from environment variables.
    #[must_use]
    pub fn from_env(mut self) -> Self {
        if self.provider.is_none() {
            self.provider = std::env::var("GRAPH_AGENT_PROVIDER").ok();
        }
        if self.api_key.is_none() {
            self.api_key = std::env::var("LLM_API_KEY")
                .or_else(|_| std::env::var("OPENAI_API_KEY"))
                .ok();
        }
        if self.base_url.is_none() {
            self.base_url = std::env::var("LLM_ENDPOINT")
                .or_else(|_| std::env::var("OPENAI_BASE_URL"))
                .ok();
        }
        if self.model.is_none() {
            self.model = std::env::var("LLM_MODEL").ok();
        }
        if self.search_depth.is_none() {
            self.search_depth = env_parse("GRAPH_AGENT_SEARCH_DEPTH");
        }
        if self.max_results_per_round.is_none() {
            self.max_results_per_round = env_parse("GRAPH_AGENT_MAX_RESULTS");
        }
        if self.max_regenerations.is_none() {
            self.max_regenerations = env_parse("GRAPH_AGENT_MAX_REGENERATIONS");
        }
        if self.timeout.is_none() {
            self.timeout = env_parse::<u64>("GRAPH_AGENT_TIMEOUT_SECS").map(Duration::from_secs);
        }
        if self.prompt_dir.is_none() {
            self.prompt_dir = std::env::var("GRAPH_AGENT_PROMPT_DIR")
                .ok()
                .map(PathBuf::from);
        }
        self
    }

    /// Sets the LLM provider name.
    #[must_use]
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Sets the API key.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the base URL override.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the model.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the sampling temperature.
    #[must_use]
    pub const fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Sets the max tokens per response.
    #[must_use]
    pub const fn max_tokens(mut self, n: u32) -> Self {
        self.max_tokens = Some(n);
        self
    }

    /// Sets the per-call timeout.
    #[must_use]
    pub const fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Sets the number of retrieval rounds.
    #[must_use]
    pub const fn search_depth(mut self, n: usize) -> Self {
        self.search_depth = Some(n);
        self
    }

    /// Sets the per-query result limit.
    #[must_use]
    pub const fn max_results_per_round(mut self, n: usize) -> Self {
        self.max_results_per_round = Some(n);
        self
    }

    /// Sets how many round queries are searched at once.
    #[must_use]
    pub const fn search_concurrency(mut self, n: usize) -> Self {
        self.search_concurrency = Some(n);
        self
    }

    /// Enables or disables reflection.
    #[must_use]
    pub const fn enable_reflection(mut self, enabled: bool) -> Self {
        self.enable_reflection = Some(enabled);
        self
    }

    /// Sets the regeneration cap.
    #[must_use]
    pub const fn max_regenerations(mut self, n: usize) -> Self {
        self.max_regenerations = Some(n);
        self
    }

    /// Enables or disables intermediate round summaries.
    #[must_use]
    pub const fn intermediate_summaries(mut self, enabled: bool) -> Self {
        self.intermediate_summaries = Some(enabled);
        self
    }

    /// Sets the relevance thresholds.
    #[must_use]
    pub const fn thresholds(mut self, thresholds: RelevanceThresholds) -> Self {
        self.thresholds = Some(thresholds);
        self
    }

    /// Sets the planning and expansion caps.
    #[must_use]
    pub const fn expansion(mut self, limits: ExpansionLimits) -> Self {
        self.expansion = Some(limits);
        self
    }

    /// Sets the prompt template directory.
    #[must_use]
    pub fn prompt_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.prompt_dir = Some(dir.into());
        self
    }

    /// Builds the [`AgentConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ApiKeyMissing`] if no API key was set.
    pub fn build(self) -> Result<AgentConfig, AgentError> {
        let api_key = self.api_key.ok_or(AgentError::ApiKeyMissing)?;

        Ok(AgentConfig {
            provider: self.provider.unwrap_or_else(|| "openai".to_string()),
            api_key,
            base_url: self.base_url,
            model: self.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            temperature: self.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            max_tokens: self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            timeout: self
                .timeout
                .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            search_depth: self.search_depth.unwrap_or(DEFAULT_SEARCH_DEPTH).max(1),
            max_results_per_round: self
                .max_results_per_round
                .unwrap_or(DEFAULT_SEARCH_LIMIT)
                .max(1),
            search_concurrency: self
                .search_concurrency
                .unwrap_or(DEFAULT_SEARCH_CONCURRENCY)
                .max(1),
            enable_reflection: self.enable_reflection.unwrap_or(true),
            max_regenerations: self
                .max_regenerations
                .unwrap_or(DEFAULT_MAX_REGENERATIONS),
            intermediate_summaries: self.intermediate_summaries.unwrap_or(true),
            thresholds: self.thresholds.unwrap_or_default(),
            expansion: self.expansion.unwrap_or_default(),
            prompt_dir: self.prompt_dir,
        })
    }
}
