//! Retrieval rounds against the graph store.
//!
//! A round searches every planned query, merges the hits into the
//! [`SearchState`] in query order, then widens the round with two
//! concurrent expansions:
//!
//! - **Structural**: outgoing relations of the nodes found in the prior round.
//! - **Semantic**: vector search on the facts of this round's strongest new edges.
//!
//! Searches may run concurrently, but merging is serialized so each id is
//! stored once. A failed round query aborts the round; a failed expansion
//! call is logged and skipped.

use futures_util::future::join_all;
use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::config::AgentConfig;
use super::timeout::with_timeout;
use crate::core::{Admission, DiscoveryRound, SearchState};
use crate::error::AgentError;
use crate::graph::{GraphEdge, GraphStore, SearchConfig, SearchResults};

/// Counters for one retrieval round.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RoundReport {
    /// Round index the report covers.
    pub round: usize,
    /// Queries searched.
    pub queries: usize,
    /// Records accepted from round queries.
    pub accepted: usize,
    /// Nodes accepted from round queries.
    pub new_nodes: usize,
    /// Records accepted from expansion.
    pub expansion_accepted: usize,
    /// Hits skipped because their id was already stored.
    pub duplicates: usize,
    /// Hits discarded for scoring below threshold.
    pub below_threshold: usize,
    /// Expansion calls that failed and were skipped.
    pub expansion_failures: usize,
}

impl RoundReport {
    fn new(round: usize, queries: usize) -> Self {
        Self {
            round,
            queries,
            ..Self::default()
        }
    }

    const fn record(&mut self, admission: Admission, from_expansion: bool) {
        match admission {
            Admission::Accepted if from_expansion => self.expansion_accepted += 1,
            Admission::Accepted => self.accepted += 1,
            Admission::Duplicate => self.duplicates += 1,
            Admission::BelowThreshold => self.below_threshold += 1,
        }
    }

    /// Returns `true` if the round stored anything new.
    #[must_use]
    pub const fn found_new(&self) -> bool {
        self.accepted + self.expansion_accepted > 0
    }
}

/// Runs retrieval rounds against a [`GraphStore`].
pub struct RetrievalOrchestrator<'a> {
    store: &'a dyn GraphStore,
    config: &'a AgentConfig,
}

impl<'a> RetrievalOrchestrator<'a> {
    /// Creates an orchestrator over the given store.
    #[must_use]
    pub const fn new(store: &'a dyn GraphStore, config: &'a AgentConfig) -> Self {
        Self { store, config }
    }

    /// Searches every query, merges the results, expands, and advances the
    /// round counter.
    ///
    /// Hits from queries merged before a failure stay in `state`.
    ///
    /// # Errors
    ///
    /// Returns the first round-query failure. The round counter is not
    /// advanced in that case.
    pub async fn run_round(
        &self,
        state: &mut SearchState,
        queries: &[String],
    ) -> Result<RoundReport, AgentError> {
        let round = state.current_round();
        let mut report = RoundReport::new(round, queries.len());
        let group_ids = vec![state.group_id.clone()];
        let search = SearchConfig::round_query(state.max_results_per_round);

        let mut searches = stream::iter(queries)
            .map(|query| {
                with_timeout(
                    "hybrid_search",
                    self.config.timeout,
                    self.store.hybrid_search(&group_ids, query, &search),
                )
            })
            .buffered(self.config.search_concurrency);

        for query in queries {
            let Some(result) = searches.next().await else {
                break;
            };
            let results = result?;
            debug!(
                round,
                query = %query,
                nodes = results.nodes.len(),
                edges = results.edges.len(),
                communities = results.communities.len(),
                "Search returned"
            );
            self.merge(state, results, DiscoveryRound::Round(round), &mut report);
        }
        drop(searches);

        if round > 0 && report.new_nodes > 0 {
            self.expand(state, &group_ids, &mut report).await;
        }

        state.advance_round();
        info!(
            round,
            queries = report.queries,
            accepted = report.accepted,
            expansion_accepted = report.expansion_accepted,
            duplicates = report.duplicates,
            discarded = report.below_threshold,
            expansion_failures = report.expansion_failures,
            "Round complete"
        );
        Ok(report)
    }

    fn merge(
        &self,
        state: &mut SearchState,
        results: SearchResults,
        round: DiscoveryRound,
        report: &mut RoundReport,
    ) {
        let thresholds = &self.config.thresholds;
        let from_expansion = !round.is_round(report.round);

        for hit in results.nodes {
            let admission = state.admit_node(hit.item, round, hit.score, thresholds);
            if admission == Admission::Accepted && !from_expansion {
                report.new_nodes += 1;
            }
            report.record(admission, from_expansion);
        }
        for hit in results.edges {
            let admission = state.admit_edge(hit.item, round, hit.score, thresholds);
            report.record(admission, from_expansion);
        }
        for hit in results.communities {
            let admission = state.admit_community(hit.item, round, hit.score, thresholds);
            report.record(admission, from_expansion);
        }
    }

    /// Runs structural and semantic expansion concurrently and merges both.
    async fn expand(&self, state: &mut SearchState, group_ids: &[String], report: &mut RoundReport) {
        let limits = &self.config.expansion;
        let round = state.current_round();

        let prior: Vec<&str> = state
            .nodes_from(DiscoveryRound::Round(round - 1))
            .map(|n| n.id.as_str())
            .collect();
        let seeds: Vec<String> = prior
            .iter()
            .rev()
            .take(limits.structural_seeds)
            .map(|id| (*id).to_string())
            .collect();

        let edge_threshold = self.config.thresholds.edge;
        let facts: Vec<String> = state
            .edges_from(DiscoveryRound::Round(round))
            .filter(|e| e.relevance_score > edge_threshold && !e.fact.trim().is_empty())
            .take(limits.semantic_seeds)
            .map(|e| e.fact.clone())
            .collect();

        debug!(
            round,
            structural_seeds = seeds.len(),
            semantic_seeds = facts.len(),
            "Expanding round"
        );

        let ((edges, structural_failures), (related, semantic_failures)) = tokio::join!(
            self.structural_expansion(group_ids, &seeds),
            self.semantic_expansion(group_ids, &facts)
        );
        report.expansion_failures += structural_failures + semantic_failures;

        for edge in edges {
            let admission = state.admit_edge(
                edge,
                DiscoveryRound::Expansion,
                limits.structural_score,
                &self.config.thresholds,
            );
            report.record(admission, true);
        }
        for results in related {
            self.merge(state, results, DiscoveryRound::Expansion, report);
        }
    }

    /// Fetches outgoing relations for each seed node. Returns the edges and
    /// the number of failed calls.
    async fn structural_expansion(
        &self,
        group_ids: &[String],
        seeds: &[String],
    ) -> (Vec<GraphEdge>, usize) {
        let limit = self.config.expansion.relations_per_node;
        let calls = seeds.iter().map(|id| {
            with_timeout(
                "outgoing_relations",
                self.config.timeout,
                self.store.outgoing_relations(group_ids, id, limit),
            )
        });

        let mut edges = Vec::new();
        let mut failures = 0;
        for (id, result) in seeds.iter().zip(join_all(calls).await) {
            match result {
                Ok(found) => edges.extend(found.into_iter().take(limit)),
                Err(e) => {
                    failures += 1;
                    warn!(node_id = %id, error = %e, "Structural expansion failed for node");
                }
            }
        }
        (edges, failures)
    }

    /// Searches each fact by vector similarity. Returns the result sets and
    /// the number of failed calls.
    async fn semantic_expansion(
        &self,
        group_ids: &[String],
        facts: &[String],
    ) -> (Vec<SearchResults>, usize) {
        let search = SearchConfig::fact_similarity(self.config.expansion.semantic_result_limit);
        let calls = facts.iter().map(|fact| {
            with_timeout(
                "hybrid_search",
                self.config.timeout,
                self.store.hybrid_search(group_ids, fact, &search),
            )
        });

        let mut related = Vec::new();
        let mut failures = 0;
        for result in join_all(calls).await {
            match result {
                Ok(results) => related.push(results),
                Err(e) => {
                    failures += 1;
                    warn!(error = %e, "Semantic expansion failed for fact");
                }
            }
        }
        (related, failures)
    }
}
