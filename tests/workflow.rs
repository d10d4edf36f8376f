//! End-to-end workflow runs against scripted collaborators.

#![allow(clippy::panic)]

mod common;

use std::collections::HashSet;
use std::sync::Arc;

use common::{
    ScriptedGraph, ScriptedLlm, VILLAGE_QUERY, community, config, controller, edge, node,
    raw_edge, results, village_graph,
};
use graph_search_agent::agent::{
    LlmProvider, NO_INFORMATION_ANSWER, PromptSet, QueryRequest, QueryResult, WorkflowController,
};
use graph_search_agent::core::DiscoveryRound;
use graph_search_agent::error::{Error, WorkflowError};
use graph_search_agent::graph::{GraphSnapshot, GraphStore, InMemoryGraph};

async fn run(
    graph: &Arc<ScriptedGraph>,
    llm: &Arc<ScriptedLlm>,
    depth: usize,
    max_regenerations: usize,
) -> graph_search_agent::Result<QueryResult> {
    let config = config()
        .search_depth(depth)
        .max_regenerations(max_regenerations)
        .build()
        .unwrap_or_else(|_| unreachable!());
    controller(graph, llm, config)
        .run(&QueryRequest::new(VILLAGE_QUERY, "adv-1"))
        .await
}

fn into_failure(result: graph_search_agent::Result<QueryResult>) -> WorkflowError {
    match result {
        Err(Error::Workflow(failure)) => *failure,
        other => panic!("expected a workflow failure, got {other:?}"),
    }
}

/// Village graph where the Ariel follow-up query rediscovers Ariel with a
/// lower score and also finds Bram.
fn ariel_graph() -> ScriptedGraph {
    village_graph().with_results(
        "Who rescued the village? Ariel",
        results(
            vec![node("n1", "Ariel", 0.7), node("n2", "Bram", 0.8)],
            vec![edge("e2", "GUARDED", "Bram guarded the bridge", 0.9)],
            Vec::new(),
        ),
    )
}

#[tokio::test]
async fn test_rediscovered_entity_keeps_first_record() {
    let graph = Arc::new(ariel_graph());
    let llm = Arc::new(ScriptedLlm::new());

    let result = run(&graph, &llm, 3, 2).await.unwrap_or_else(|_| unreachable!());

    assert!(
        result
            .state
            .issued_queries
            .iter()
            .any(|q| q == "Who rescued the village? Ariel")
    );
    let ariel: Vec<_> = result.state.nodes().iter().filter(|n| n.id == "n1").collect();
    assert_eq!(ariel.len(), 1);
    assert!((ariel[0].relevance_score - 0.9).abs() < f64::EPSILON);
    assert_eq!(ariel[0].round_discovered, DiscoveryRound::Round(0));

    let bram = result.state.nodes().iter().find(|n| n.id == "n2");
    assert_eq!(
        bram.map(|n| n.round_discovered),
        Some(DiscoveryRound::Round(1))
    );
    assert!(result.stats.duplicates_skipped > 0);
    assert_eq!(result.answer, "Answer draft 1: Ariel rescued the village.");
}

#[tokio::test]
async fn test_records_are_unique_and_above_threshold() {
    let graph = Arc::new(ariel_graph().with_relations(
        "n1",
        vec![raw_edge("e1", "RESCUED", "Ariel rescued the village")],
    ));
    let llm = Arc::new(ScriptedLlm::new());

    let result = run(&graph, &llm, 3, 0).await.unwrap_or_else(|_| unreachable!());
    let state = &result.state;

    let node_ids: HashSet<_> = state.nodes().iter().map(|n| n.id.as_str()).collect();
    let edge_ids: HashSet<_> = state.edges().iter().map(|e| e.id.as_str()).collect();
    assert_eq!(node_ids.len(), state.nodes().len());
    assert_eq!(edge_ids.len(), state.edges().len());
    assert!(state.nodes().iter().all(|n| n.relevance_score >= 0.5));
    assert!(state.edges().iter().all(|e| e.relevance_score >= 0.5));
}

#[tokio::test]
async fn test_low_scores_are_discarded() {
    let graph = Arc::new(ScriptedGraph::new().with_results(
        VILLAGE_QUERY,
        results(
            vec![node("n1", "Ariel", 0.5), node("n9", "Crow", 0.49)],
            vec![edge("e9", "SAW", "The crow saw the flood", 0.3)],
            vec![
                community("c1", "River folk", 0.3),
                community("c9", "Hill folk", 0.29),
            ],
        ),
    ));
    let llm = Arc::new(ScriptedLlm::new());

    let result = run(&graph, &llm, 1, 0).await.unwrap_or_else(|_| unreachable!());

    let ids: Vec<_> = result.state.nodes().iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, ["n1"]);
    assert!(result.state.edges().is_empty());
    let communities: Vec<_> = result
        .state
        .communities()
        .iter()
        .map(|c| c.id.as_str())
        .collect();
    assert_eq!(communities, ["c1"]);
    assert_eq!(result.stats.below_threshold, 3);
}

#[tokio::test]
async fn test_runs_exactly_depth_rounds() {
    let graph = Arc::new(ariel_graph());
    let llm = Arc::new(ScriptedLlm::new());

    let result = run(&graph, &llm, 3, 0).await.unwrap_or_else(|_| unreachable!());

    assert_eq!(result.state.current_round(), 3);
    assert_eq!(result.stats.rounds, 3);
    assert!(!result.stats.early_terminated);
    // Concepts are extracted once per round after the first.
    assert_eq!(llm.concept_calls(), 2);
    // Rounds 0 and 1 are summarized; the last round goes straight to synthesis.
    assert_eq!(llm.intermediate_calls(), 2);
    assert_eq!(result.state.intermediate_summaries.len(), 2);
    assert!(result.state.nodes().iter().all(|n| match n.round_discovered {
        DiscoveryRound::Round(r) => r < 3,
        DiscoveryRound::Expansion => true,
    }));
}

#[tokio::test]
async fn test_empty_first_round_stops_early() {
    let graph = Arc::new(ScriptedGraph::new());
    let llm = Arc::new(ScriptedLlm::new());

    let result = run(&graph, &llm, 3, 2).await.unwrap_or_else(|_| unreachable!());

    assert_eq!(graph.searched(), [VILLAGE_QUERY]);
    assert_eq!(result.state.issued_queries, [VILLAGE_QUERY]);
    assert_eq!(result.state.current_round(), 1);
    assert!(result.stats.early_terminated);
    assert_eq!(result.answer, NO_INFORMATION_ANSWER);
    assert_eq!(llm.final_calls(), 0);
    assert_eq!(llm.concept_calls(), 0);
    assert_eq!(llm.reflection_calls(), 0);
    assert_eq!(result.stats.synthesis_calls, 0);
}

#[tokio::test]
async fn test_regeneration_is_bounded() {
    let graph = Arc::new(village_graph());
    let llm = Arc::new(
        ScriptedLlm::new()
            .with_reflection("NEEDS_REGENERATION: YES\nFEEDBACK: Mention who helped Ariel."),
    );

    let result = run(&graph, &llm, 1, 2).await.unwrap_or_else(|_| unreachable!());

    assert_eq!(llm.final_calls(), 3);
    assert_eq!(llm.reflection_calls(), 2);
    assert_eq!(result.stats.synthesis_calls, 3);
    assert_eq!(result.stats.regenerations, 2);
    assert_eq!(result.answer, "Answer draft 3: Ariel rescued the village.");
    assert!(!result.state.needs_regeneration);

    let requests = llm.final_requests();
    assert_eq!(requests[0].messages.len(), 2);
    // System, original prompt, previous answer, revision request.
    assert_eq!(requests[1].messages.len(), 4);
    assert!(
        requests[1]
            .messages
            .last()
            .is_some_and(|m| m.content.contains("Mention who helped Ariel."))
    );
}

#[tokio::test]
async fn test_malformed_reflection_accepts_answer() {
    let graph = Arc::new(village_graph());
    let llm = Arc::new(ScriptedLlm::new().with_reflection("Looks fine to me."));

    let result = run(&graph, &llm, 1, 2).await.unwrap_or_else(|_| unreachable!());

    assert_eq!(llm.final_calls(), 1);
    assert_eq!(llm.reflection_calls(), 1);
    assert_eq!(result.stats.regenerations, 0);
}

#[tokio::test]
async fn test_expansion_failures_do_not_abort_round() {
    let graph = Arc::new(
        ariel_graph()
            .with_results(
                "Bram guarded the bridge",
                results(vec![node("n3", "Old bridge", 0.8)], Vec::new(), Vec::new()),
            )
            .failing_relations(),
    );
    let llm = Arc::new(ScriptedLlm::new());

    let result = run(&graph, &llm, 3, 0).await.unwrap_or_else(|_| unreachable!());

    assert!(graph.relation_calls() > 0);
    assert!(result.stats.expansion_failures >= 1);
    let bridge = result.state.nodes().iter().find(|n| n.id == "n3");
    assert_eq!(
        bridge.map(|n| n.round_discovered),
        Some(DiscoveryRound::Expansion)
    );
}

#[tokio::test]
async fn test_structural_expansion_admits_neighbor_facts() {
    let graph = Arc::new(ariel_graph().with_relations(
        "n1",
        vec![raw_edge("e7", "OWES", "The miller owes Ariel a debt")],
    ));
    let llm = Arc::new(ScriptedLlm::new());

    let result = run(&graph, &llm, 2, 0).await.unwrap_or_else(|_| unreachable!());

    let debt = result.state.edges().iter().find(|e| e.id == "e7");
    assert_eq!(
        debt.map(|e| e.round_discovered),
        Some(DiscoveryRound::Expansion)
    );
}

#[tokio::test]
async fn test_round_failure_returns_state_and_resumes() {
    let graph = Arc::new(
        ariel_graph().failing("Who rescued the village? RESCUED", 1),
    );
    let llm = Arc::new(ScriptedLlm::new());
    let config = config()
        .search_depth(3)
        .search_concurrency(1)
        .max_regenerations(0)
        .build()
        .unwrap_or_else(|_| unreachable!());
    let controller = controller(&graph, &llm, config);

    let failure = into_failure(
        controller
            .run(&QueryRequest::new(VILLAGE_QUERY, "adv-1"))
            .await,
    );

    assert_eq!(failure.round, 1);
    assert_eq!(failure.state.current_round(), 1);
    // Bram came from the query merged before the failing one.
    assert!(failure.state.nodes().iter().any(|n| n.id == "n2"));
    assert_eq!(llm.final_calls(), 0);

    let result = controller
        .resume(failure.state)
        .await
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(result.state.current_round(), 3);
    assert_eq!(result.answer, "Answer draft 1: Ariel rescued the village.");
}

#[tokio::test]
async fn test_invalid_request_issues_no_calls() {
    let graph = Arc::new(village_graph());
    let llm = Arc::new(ScriptedLlm::new());
    let config = config().build().unwrap_or_else(|_| unreachable!());

    let result = controller(&graph, &llm, config)
        .run(&QueryRequest::new("   ", "adv-1"))
        .await;

    assert!(result.is_err());
    assert!(graph.searched().is_empty());
    assert_eq!(llm.final_calls(), 0);
}

/// Two tenants whose partitions both use node id `n1`.
const SHARED_ID_SNAPSHOT: &str = r#"{
  "groups": {
    "adv-1": {
      "nodes": [
        { "id": "n1", "name": "Ariel", "summary": "A ranger" },
        { "id": "n3", "name": "Bram", "summary": "A bridge keeper" },
        { "id": "n4", "name": "Cora", "summary": "Bram sister" }
      ],
      "edges": [
        { "id": "e1", "relation_name": "MET", "fact": "Ariel met Bram",
          "source_node_id": "n1", "target_node_id": "n3" }
      ]
    },
    "other-tenant": {
      "nodes": [{ "id": "n1", "name": "Guild", "summary": "A merchant guild" }],
      "edges": [
        { "id": "secret", "relation_name": "OWES", "fact": "The guild owes a debt",
          "source_node_id": "n1", "target_node_id": "n9" }
      ]
    }
  }
}"#;

#[tokio::test]
async fn test_structural_expansion_stays_in_group() {
    let snapshot: GraphSnapshot =
        serde_json::from_str(SHARED_ID_SNAPSHOT).unwrap_or_else(|e| panic!("snapshot: {e}"));
    let llm = Arc::new(ScriptedLlm::new());
    let config = config()
        .search_depth(2)
        .max_regenerations(0)
        .build()
        .unwrap_or_else(|_| unreachable!());
    let controller = WorkflowController::with_prompts(
        Arc::clone(&llm) as Arc<dyn LlmProvider>,
        Arc::new(InMemoryGraph::new(snapshot)) as Arc<dyn GraphStore>,
        config,
        &PromptSet::defaults(),
    );

    let result = controller
        .run(&QueryRequest::new("Ariel", "adv-1"))
        .await
        .unwrap_or_else(|e| panic!("run failed: {e}"));

    // Cora is new in round 1, so round 1 expands from Ariel's relations.
    let cora = result.state.nodes().iter().find(|n| n.id == "n4");
    assert_eq!(
        cora.map(|n| n.round_discovered),
        Some(DiscoveryRound::Round(1))
    );
    let edge_ids: Vec<&str> = result.state.edges().iter().map(|e| e.id.as_str()).collect();
    assert_eq!(edge_ids, ["e1"]);
}
