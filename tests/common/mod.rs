//! Scripted collaborators for workflow tests.
//!
//! `ScriptedGraph` answers hybrid searches from a per-query table and can
//! be told to fail specific calls. `ScriptedLlm` routes each request by its
//! system prompt and counts calls per role.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use graph_search_agent::agent::prompt::{
    CONCEPT_SYSTEM_PROMPT, FINAL_SYSTEM_PROMPT, INTERMEDIATE_SYSTEM_PROMPT,
    REFLECTION_SYSTEM_PROMPT,
};
use graph_search_agent::agent::{
    AgentConfig, AgentConfigBuilder, ChatRequest, ChatResponse, LlmProvider, PromptSet,
    WorkflowController,
};
use graph_search_agent::error::AgentError;
use graph_search_agent::graph::{
    GraphCommunity, GraphEdge, GraphNode, GraphStore, Scored, SearchConfig, SearchResults,
};

pub const VILLAGE_QUERY: &str = "Who rescued the village?";

/// Graph store answering from scripted tables.
#[derive(Default)]
pub struct ScriptedGraph {
    responses: HashMap<String, SearchResults>,
    relations: HashMap<String, Vec<GraphEdge>>,
    failures: Mutex<HashMap<String, usize>>,
    fail_relations: bool,
    searches: Mutex<Vec<String>>,
    relation_calls: AtomicUsize,
}

impl ScriptedGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the results returned for `query`.
    pub fn with_results(mut self, query: &str, results: SearchResults) -> Self {
        self.responses.insert(query.to_string(), results);
        self
    }

    /// Scripts the outgoing relations of `node_id`.
    pub fn with_relations(mut self, node_id: &str, edges: Vec<GraphEdge>) -> Self {
        self.relations.insert(node_id.to_string(), edges);
        self
    }

    /// Makes the next `times` searches for `query` fail.
    pub fn failing(self, query: &str, times: usize) -> Self {
        if let Ok(mut failures) = self.failures.lock() {
            failures.insert(query.to_string(), times);
        }
        self
    }

    /// Makes every outgoing-relations call fail.
    pub const fn failing_relations(mut self) -> Self {
        self.fail_relations = true;
        self
    }

    /// Every query searched, in call order.
    pub fn searched(&self) -> Vec<String> {
        self.searches.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn relation_calls(&self) -> usize {
        self.relation_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GraphStore for ScriptedGraph {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn hybrid_search(
        &self,
        _group_ids: &[String],
        query: &str,
        config: &SearchConfig,
    ) -> Result<SearchResults, AgentError> {
        if let Ok(mut searches) = self.searches.lock() {
            searches.push(query.to_string());
        }
        if let Ok(mut failures) = self.failures.lock()
            && let Some(remaining) = failures.get_mut(query)
            && *remaining > 0
        {
            *remaining -= 1;
            return Err(AgentError::graph_store("hybrid_search", "scripted failure"));
        }
        let mut results = self.responses.get(query).cloned().unwrap_or_default();
        results.nodes.truncate(config.limit);
        results.edges.truncate(config.limit);
        results.communities.truncate(config.limit);
        Ok(results)
    }

    async fn outgoing_relations(
        &self,
        _group_ids: &[String],
        node_id: &str,
        limit: usize,
    ) -> Result<Vec<GraphEdge>, AgentError> {
        self.relation_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_relations {
            return Err(AgentError::graph_store("outgoing_relations", "scripted failure"));
        }
        let mut edges = self.relations.get(node_id).cloned().unwrap_or_default();
        edges.truncate(limit);
        Ok(edges)
    }
}

/// Text generation double routed by system prompt.
pub struct ScriptedLlm {
    concepts_reply: String,
    intermediate_reply: String,
    reflection_reply: String,
    concept_calls: AtomicUsize,
    intermediate_calls: AtomicUsize,
    final_calls: AtomicUsize,
    reflection_calls: AtomicUsize,
    final_requests: Mutex<Vec<ChatRequest>>,
}

impl Default for ScriptedLlm {
    fn default() -> Self {
        Self {
            concepts_reply: "flood, courage".to_string(),
            intermediate_reply: "Ariel appears central to the rescue.".to_string(),
            reflection_reply: "NEEDS_REGENERATION: NO\nFEEDBACK: None".to_string(),
            concept_calls: AtomicUsize::new(0),
            intermediate_calls: AtomicUsize::new(0),
            final_calls: AtomicUsize::new(0),
            reflection_calls: AtomicUsize::new(0),
            final_requests: Mutex::new(Vec::new()),
        }
    }
}

impl ScriptedLlm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_concepts(mut self, reply: &str) -> Self {
        self.concepts_reply = reply.to_string();
        self
    }

    pub fn with_reflection(mut self, reply: &str) -> Self {
        self.reflection_reply = reply.to_string();
        self
    }

    pub fn concept_calls(&self) -> usize {
        self.concept_calls.load(Ordering::SeqCst)
    }

    pub fn intermediate_calls(&self) -> usize {
        self.intermediate_calls.load(Ordering::SeqCst)
    }

    pub fn final_calls(&self) -> usize {
        self.final_calls.load(Ordering::SeqCst)
    }

    pub fn reflection_calls(&self) -> usize {
        self.reflection_calls.load(Ordering::SeqCst)
    }

    pub fn final_requests(&self) -> Vec<ChatRequest> {
        self.final_requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError> {
        let content = match request.system_prompt() {
            Some(CONCEPT_SYSTEM_PROMPT) => {
                self.concept_calls.fetch_add(1, Ordering::SeqCst);
                self.concepts_reply.clone()
            }
            Some(INTERMEDIATE_SYSTEM_PROMPT) => {
                self.intermediate_calls.fetch_add(1, Ordering::SeqCst);
                self.intermediate_reply.clone()
            }
            Some(FINAL_SYSTEM_PROMPT) => {
                let n = self.final_calls.fetch_add(1, Ordering::SeqCst) + 1;
                if let Ok(mut requests) = self.final_requests.lock() {
                    requests.push(request.clone());
                }
                format!("Answer draft {n}: Ariel rescued the village.")
            }
            Some(REFLECTION_SYSTEM_PROMPT) => {
                self.reflection_calls.fetch_add(1, Ordering::SeqCst);
                self.reflection_reply.clone()
            }
            other => {
                return Err(AgentError::ApiRequest {
                    message: format!("unexpected system prompt: {other:?}"),
                    status: Some(400),
                });
            }
        };
        Ok(ChatResponse {
            content,
            ..ChatResponse::default()
        })
    }
}

/// Config builder with a test key and a short deadline.
pub fn config() -> AgentConfigBuilder {
    AgentConfig::builder()
        .api_key("test-key")
        .timeout(Duration::from_secs(5))
}

pub fn controller(
    graph: &Arc<ScriptedGraph>,
    llm: &Arc<ScriptedLlm>,
    config: AgentConfig,
) -> WorkflowController {
    WorkflowController::with_prompts(
        Arc::clone(llm) as Arc<dyn LlmProvider>,
        Arc::clone(graph) as Arc<dyn GraphStore>,
        config,
        &PromptSet::defaults(),
    )
}

pub fn node(id: &str, name: &str, score: f64) -> Scored<GraphNode> {
    Scored::new(
        GraphNode {
            id: id.to_string(),
            name: name.to_string(),
            summary: format!("{name} is part of the story."),
        },
        score,
    )
}

pub fn raw_edge(id: &str, relation: &str, fact: &str) -> GraphEdge {
    GraphEdge {
        id: id.to_string(),
        relation_name: relation.to_string(),
        fact: fact.to_string(),
        source_node_id: "n1".to_string(),
        target_node_id: "n2".to_string(),
        episode_refs: vec!["ep1".to_string()],
        valid_at: None,
        invalid_at: None,
    }
}

pub fn edge(id: &str, relation: &str, fact: &str, score: f64) -> Scored<GraphEdge> {
    Scored::new(raw_edge(id, relation, fact), score)
}

pub fn community(id: &str, name: &str, score: f64) -> Scored<GraphCommunity> {
    Scored::new(
        GraphCommunity {
            id: id.to_string(),
            name: name.to_string(),
            summary: String::new(),
        },
        score,
    )
}

pub fn results(
    nodes: Vec<Scored<GraphNode>>,
    edges: Vec<Scored<GraphEdge>>,
    communities: Vec<Scored<GraphCommunity>>,
) -> SearchResults {
    SearchResults {
        nodes,
        edges,
        communities,
    }
}

/// Round-0 hits for the village query: Ariel and the rescue fact.
pub fn village_graph() -> ScriptedGraph {
    ScriptedGraph::new().with_results(
        VILLAGE_QUERY,
        results(
            vec![node("n1", "Ariel", 0.9)],
            vec![edge("e1", "RESCUED", "Ariel rescued the village", 0.8)],
            Vec::new(),
        ),
    )
}
