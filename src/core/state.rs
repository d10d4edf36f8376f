//! Search state accumulated across retrieval rounds.
//!
//! The state is owned by a single workflow run. Collections are
//! append-only: each record id is stored at most once, in first-acceptance
//! order, and a record below its relevance threshold is never stored.

use std::collections::{BTreeSet, HashSet};

use serde::Serialize;

use super::records::{CommunityRecord, DiscoveryRound, EdgeRecord, NodeRecord};
use super::relevance::{RecordKind, RelevanceThresholds};
use crate::graph::config::DEFAULT_SEARCH_LIMIT;
use crate::graph::{GraphCommunity, GraphEdge, GraphNode};

/// Outcome of offering a hit to the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Stored as a new record.
    Accepted,
    /// Id already present; the earlier record is kept untouched.
    Duplicate,
    /// Score below the threshold for its kind; discarded.
    BelowThreshold,
}

/// Mutable record of one query's exploration.
#[derive(Debug, Clone, Serialize)]
pub struct SearchState {
    /// The natural-language query being answered.
    pub user_query: String,
    /// Graph partition searched.
    pub group_id: String,
    /// Maximum number of retrieval rounds.
    pub search_depth: usize,
    /// Hybrid-search result limit for each round query.
    pub max_results_per_round: usize,
    current_round: usize,
    nodes: Vec<NodeRecord>,
    edges: Vec<EdgeRecord>,
    communities: Vec<CommunityRecord>,
    #[serde(skip)]
    node_ids: HashSet<String>,
    #[serde(skip)]
    edge_ids: HashSet<String>,
    #[serde(skip)]
    community_ids: HashSet<String>,
    /// Ids of every node a search has surfaced, accepted or not.
    pub explored_entity_ids: BTreeSet<String>,
    /// Ids of nodes whose names were already used for query expansion.
    expanded_node_ids: BTreeSet<String>,
    /// Relation names already used for query expansion.
    queried_relations: BTreeSet<String>,
    /// Every search string issued so far, in issue order.
    pub issued_queries: Vec<String>,
    /// Summaries produced after non-terminal rounds.
    pub intermediate_summaries: Vec<String>,
    /// Final synthesized answer (empty until synthesis completes).
    pub final_answer: String,
    /// Critique from the last reflection that requested regeneration.
    pub reflection_feedback: Option<String>,
    /// Whether the last reflection asked for a new answer.
    pub needs_regeneration: bool,
    regeneration_count: usize,
    early_terminated: bool,
}

impl SearchState {
    /// Creates an empty state at round 0.
    #[must_use]
    pub fn new(user_query: impl Into<String>, group_id: impl Into<String>, search_depth: usize) -> Self {
        Self {
            user_query: user_query.into(),
            group_id: group_id.into(),
            search_depth,
            max_results_per_round: DEFAULT_SEARCH_LIMIT,
            current_round: 0,
            nodes: Vec::new(),
            edges: Vec::new(),
            communities: Vec::new(),
            node_ids: HashSet::new(),
            edge_ids: HashSet::new(),
            community_ids: HashSet::new(),
            explored_entity_ids: BTreeSet::new(),
            expanded_node_ids: BTreeSet::new(),
            queried_relations: BTreeSet::new(),
            issued_queries: Vec::new(),
            intermediate_summaries: Vec::new(),
            final_answer: String::new(),
            reflection_feedback: None,
            needs_regeneration: false,
            regeneration_count: 0,
            early_terminated: false,
        }
    }

    /// Current round index (number of completed retrieval rounds).
    #[must_use]
    pub const fn current_round(&self) -> usize {
        self.current_round
    }

    /// Returns `true` once every configured round has run.
    #[must_use]
    pub const fn rounds_exhausted(&self) -> bool {
        self.current_round >= self.search_depth
    }

    /// Marks the current round complete. Rounds are never replayed.
    pub(crate) const fn advance_round(&mut self) {
        self.current_round += 1;
    }

    /// Accumulated nodes in discovery order.
    #[must_use]
    pub fn nodes(&self) -> &[NodeRecord] {
        &self.nodes
    }

    /// Accumulated edges in discovery order.
    #[must_use]
    pub fn edges(&self) -> &[EdgeRecord] {
        &self.edges
    }

    /// Accumulated communities in discovery order.
    #[must_use]
    pub fn communities(&self) -> &[CommunityRecord] {
        &self.communities
    }

    /// Returns `true` if nothing at all has been accepted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty() && self.communities.is_empty()
    }

    /// Nodes discovered by the given round or mechanism.
    pub fn nodes_from(&self, round: DiscoveryRound) -> impl Iterator<Item = &NodeRecord> {
        self.nodes.iter().filter(move |n| n.round_discovered == round)
    }

    /// Edges discovered by the given round or mechanism.
    pub fn edges_from(&self, round: DiscoveryRound) -> impl Iterator<Item = &EdgeRecord> {
        self.edges.iter().filter(move |e| e.round_discovered == round)
    }

    /// Offers a node hit; stores it only if it meets the node threshold and
    /// its id is new.
    pub fn admit_node(
        &mut self,
        node: GraphNode,
        round: DiscoveryRound,
        score: f64,
        thresholds: &RelevanceThresholds,
    ) -> Admission {
        self.explored_entity_ids.insert(node.id.clone());
        if !thresholds.admits(RecordKind::Node, score) {
            return Admission::BelowThreshold;
        }
        if !self.node_ids.insert(node.id.clone()) {
            return Admission::Duplicate;
        }
        self.nodes.push(NodeRecord::discovered(node, round, score));
        Admission::Accepted
    }

    /// Offers an edge hit; stores it only if it meets the edge threshold and
    /// its id is new.
    pub fn admit_edge(
        &mut self,
        edge: GraphEdge,
        round: DiscoveryRound,
        score: f64,
        thresholds: &RelevanceThresholds,
    ) -> Admission {
        if !thresholds.admits(RecordKind::Edge, score) {
            return Admission::BelowThreshold;
        }
        if !self.edge_ids.insert(edge.id.clone()) {
            return Admission::Duplicate;
        }
        self.edges.push(EdgeRecord::discovered(edge, round, score));
        Admission::Accepted
    }

    /// Offers a community hit; stores it only if it meets the community
    /// threshold and its id is new.
    pub fn admit_community(
        &mut self,
        community: GraphCommunity,
        round: DiscoveryRound,
        score: f64,
        thresholds: &RelevanceThresholds,
    ) -> Admission {
        if !thresholds.admits(RecordKind::Community, score) {
            return Admission::BelowThreshold;
        }
        if !self.community_ids.insert(community.id.clone()) {
            return Admission::Duplicate;
        }
        self.communities
            .push(CommunityRecord::discovered(community, round, score));
        Admission::Accepted
    }

    /// Returns `true` if the node's name was already used for expansion.
    #[must_use]
    pub fn is_expanded(&self, node_id: &str) -> bool {
        self.expanded_node_ids.contains(node_id)
    }

    /// Records that the node's name was used for expansion.
    pub fn mark_expanded(&mut self, node_id: &str) {
        self.expanded_node_ids.insert(node_id.to_string());
    }

    /// Returns `true` if the relation name was already used for expansion.
    #[must_use]
    pub fn is_relation_queried(&self, relation: &str) -> bool {
        self.queried_relations.contains(relation)
    }

    /// Records that the relation name was used for expansion.
    pub fn mark_relation_queried(&mut self, relation: &str) {
        self.queried_relations.insert(relation.to_string());
    }

    /// Number of regenerations requested so far.
    #[must_use]
    pub const fn regeneration_count(&self) -> usize {
        self.regeneration_count
    }

    /// Requests a regeneration with the given feedback.
    ///
    /// Once `max` regenerations have been spent, accepts the current answer
    /// instead and returns `false`.
    pub fn request_regeneration(&mut self, feedback: String, max: usize) -> bool {
        if self.regeneration_count >= max {
            self.accept_answer();
            return false;
        }
        self.regeneration_count += 1;
        self.reflection_feedback = Some(feedback);
        self.needs_regeneration = true;
        true
    }

    /// Accepts the current answer and clears any pending feedback.
    pub fn accept_answer(&mut self) {
        self.reflection_feedback = None;
        self.needs_regeneration = false;
    }

    /// Whether exploration stopped early because round one found nothing.
    #[must_use]
    pub const fn early_terminated(&self) -> bool {
        self.early_terminated
    }

    pub(crate) const fn mark_early_terminated(&mut self) {
        self.early_terminated = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn node(id: &str, name: &str) -> GraphNode {
        GraphNode {
            id: id.to_string(),
            name: name.to_string(),
            summary: String::new(),
        }
    }

    fn edge(id: &str) -> GraphEdge {
        GraphEdge {
            id: id.to_string(),
            relation_name: "RELATES_TO".to_string(),
            fact: format!("fact {id}"),
            source_node_id: "a".to_string(),
            target_node_id: "b".to_string(),
            episode_refs: Vec::new(),
            valid_at: None,
            invalid_at: None,
        }
    }

    fn community(id: &str) -> GraphCommunity {
        GraphCommunity {
            id: id.to_string(),
            name: id.to_string(),
            summary: String::new(),
        }
    }

    #[test]
    fn test_new_state_is_empty() {
        let state = SearchState::new("q", "g", 3);
        assert!(state.is_empty());
        assert_eq!(state.current_round(), 0);
        assert!(!state.rounds_exhausted());
        assert!(state.final_answer.is_empty());
    }

    #[test]
    fn test_duplicate_keeps_first_record() {
        let t = RelevanceThresholds::default();
        let mut state = SearchState::new("q", "g", 3);
        assert_eq!(
            state.admit_node(node("n1", "Ariel"), DiscoveryRound::Round(0), 0.9, &t),
            Admission::Accepted
        );
        assert_eq!(
            state.admit_node(node("n1", "Ariel (renamed)"), DiscoveryRound::Round(1), 0.7, &t),
            Admission::Duplicate
        );
        assert_eq!(state.nodes().len(), 1);
        assert_eq!(state.nodes()[0].name, "Ariel");
        assert!((state.nodes()[0].relevance_score - 0.9).abs() < f64::EPSILON);
        assert_eq!(state.nodes()[0].round_discovered, DiscoveryRound::Round(0));
    }

    #[test]
    fn test_below_threshold_discarded_but_explored() {
        let t = RelevanceThresholds::default();
        let mut state = SearchState::new("q", "g", 3);
        assert_eq!(
            state.admit_node(node("n2", "Bram"), DiscoveryRound::Round(0), 0.2, &t),
            Admission::BelowThreshold
        );
        assert!(state.nodes().is_empty());
        assert!(state.explored_entity_ids.contains("n2"));
        // A later, stronger hit for the same id is still accepted.
        assert_eq!(
            state.admit_node(node("n2", "Bram"), DiscoveryRound::Round(1), 0.8, &t),
            Admission::Accepted
        );
    }

    #[test]
    fn test_community_uses_lower_threshold() {
        let t = RelevanceThresholds::default();
        let mut state = SearchState::new("q", "g", 3);
        assert_eq!(
            state.admit_community(community("c1"), DiscoveryRound::Round(0), 0.35, &t),
            Admission::Accepted
        );
        assert_eq!(
            state.admit_edge(edge("e1"), DiscoveryRound::Round(0), 0.35, &t),
            Admission::BelowThreshold
        );
    }

    #[test]
    fn test_round_counter_and_exhaustion() {
        let mut state = SearchState::new("q", "g", 2);
        state.advance_round();
        assert_eq!(state.current_round(), 1);
        assert!(!state.rounds_exhausted());
        state.advance_round();
        assert!(state.rounds_exhausted());
    }

    #[test]
    fn test_regeneration_capped() {
        let mut state = SearchState::new("q", "g", 1);
        assert!(state.request_regeneration("too vague".to_string(), 2));
        assert_eq!(state.reflection_feedback.as_deref(), Some("too vague"));
        assert!(state.needs_regeneration);
        assert!(state.request_regeneration("still vague".to_string(), 2));
        assert!(!state.request_regeneration("again".to_string(), 2));
        assert_eq!(state.regeneration_count(), 2);
        assert!(!state.needs_regeneration);
        assert!(state.reflection_feedback.is_none());
    }

    #[test]
    fn test_expansion_bookkeeping() {
        let mut state = SearchState::new("q", "g", 3);
        assert!(!state.is_expanded("n1"));
        state.mark_expanded("n1");
        assert!(state.is_expanded("n1"));
    }

    #[test]
    fn test_serialized_state_omits_dedup_sets() {
        let t = RelevanceThresholds::default();
        let mut state = SearchState::new("q", "g", 3);
        state.admit_edge(edge("e1"), DiscoveryRound::Expansion, 0.6, &t);
        let json = serde_json::to_value(&state).unwrap_or_default();
        assert!(json.get("edge_ids").is_none());
        assert_eq!(json["edges"][0]["round_discovered"], "expansion");
    }

    proptest! {
        #[test]
        fn prop_ids_unique_and_scores_above_threshold(
            hits in prop::collection::vec((0u8..3, 0u8..6, 0.0f64..1.0, 0usize..4), 0..80)
        ) {
            let t = RelevanceThresholds::default();
            let mut state = SearchState::new("q", "g", 4);
            for (kind, id, score, round) in hits {
                let id = format!("id{id}");
                let round = DiscoveryRound::Round(round);
                match kind {
                    0 => { state.admit_node(node(&id, &id), round, score, &t); }
                    1 => { state.admit_edge(edge(&id), round, score, &t); }
                    _ => { state.admit_community(community(&id), round, score, &t); }
                }
            }

            let node_ids: HashSet<&str> = state.nodes().iter().map(|n| n.id.as_str()).collect();
            prop_assert_eq!(node_ids.len(), state.nodes().len());
            let edge_ids: HashSet<&str> = state.edges().iter().map(|e| e.id.as_str()).collect();
            prop_assert_eq!(edge_ids.len(), state.edges().len());
            let community_ids: HashSet<&str> =
                state.communities().iter().map(|c| c.id.as_str()).collect();
            prop_assert_eq!(community_ids.len(), state.communities().len());

            prop_assert!(state.nodes().iter().all(|n| n.relevance_score >= 0.5));
            prop_assert!(state.edges().iter().all(|e| e.relevance_score >= 0.5));
            prop_assert!(state.communities().iter().all(|c| c.relevance_score >= 0.3));
        }
    }
}
