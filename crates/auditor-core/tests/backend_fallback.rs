//! A faulting graph engine must hand the run to Direct mode and end in the
//! same state a Direct-only run produces.
#![cfg(feature = "graph-engine")]

mod common;

use async_trait::async_trait;
use auditor_core::config::AuditConfig;
use auditor_core::engine::graph::{GraphEngineBackend, StateGraph, AGGREGATOR_NODE, START};
use auditor_core::engine::{
    run_goal_pipeline, DirectBackend, OrchestrationBackend, Orchestrator, RunContext, RunLedger,
    RunPhase,
};
use auditor_core::errors::BackendError;
use auditor_evidence::{BackendKind, GoalId};
use common::{scenario_collectors, sorted_evidences, workspace};
use std::sync::Arc;

fn goals() -> Vec<String> {
    ["git_forensic_analysis", "state_management", "graph_orchestration"]
        .map(String::from)
        .to_vec()
}

/// Collector nodes wired to the aggregator, but nothing reaches END.
fn dangling_topology(collectors: &[Arc<dyn auditor_core::Collector>]) -> StateGraph {
    let mut g = StateGraph::new();
    g.add_aggregator(AGGREGATOR_NODE);
    for c in collectors {
        g.add_collector(Arc::clone(c));
        g.add_edge(START, c.name()).add_edge(c.name(), AGGREGATOR_NODE);
    }
    g
}

#[tokio::test]
async fn build_fault_falls_back_to_direct_with_identical_results() {
    let ws = workspace("see src/state.py and src/graph.py");

    let faulty = Orchestrator::new(
        AuditConfig::default(),
        scenario_collectors(),
        Arc::new(GraphEngineBackend::with_topology(dangling_topology)),
    );
    let fallback = faulty.run(&ws.repo_spec(), &ws.doc, &goals()).await.unwrap();

    let reference = Orchestrator::new(AuditConfig::default(), scenario_collectors(), Arc::new(DirectBackend))
        .run(&ws.repo_spec(), &ws.doc, &goals())
        .await
        .unwrap();

    assert!(fallback.artifact.fell_back);
    assert_eq!(fallback.artifact.backend, BackendKind::Direct);
    assert_eq!(fallback.timeline.last(), Some(&RunPhase::Done));
    assert_eq!(fallback.artifact.total_evidences(), 6);
    assert_eq!(fallback.artifact.aggregated.summary, reference.artifact.aggregated.summary);
    assert_eq!(sorted_evidences(&fallback.artifact), sorted_evidences(&reference.artifact));
}

#[tokio::test]
async fn healthy_graph_engine_matches_direct() {
    let ws = workspace("src/state.py");

    let graph = Orchestrator::new(
        AuditConfig::default(),
        scenario_collectors(),
        Arc::new(GraphEngineBackend::default()),
    )
    .run(&ws.repo_spec(), &ws.doc, &goals())
    .await
    .unwrap();
    let direct = Orchestrator::new(AuditConfig::default(), scenario_collectors(), Arc::new(DirectBackend))
        .run(&ws.repo_spec(), &ws.doc, &goals())
        .await
        .unwrap();

    assert!(!graph.artifact.fell_back);
    assert_eq!(graph.artifact.backend, BackendKind::GraphEngine);
    assert_eq!(sorted_evidences(&graph.artifact), sorted_evidences(&direct.artifact));

    // Every goal passes FanOut, FanIn and Merge in order even when goals interleave.
    for goal in goals() {
        let positions: Vec<usize> = [
            RunPhase::FanOut(goal.clone()),
            RunPhase::FanIn(goal.clone()),
            RunPhase::Merge(goal.clone()),
        ]
        .iter()
        .map(|p| graph.timeline.iter().position(|t| t == p).unwrap())
        .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{goal}: {positions:?}");
    }
}

/// Merges the first goal, then faults mid-run.
struct FailsAfterFirstGoal;

#[async_trait]
impl OrchestrationBackend for FailsAfterFirstGoal {
    fn kind(&self) -> BackendKind {
        BackendKind::GraphEngine
    }

    async fn execute(
        &self,
        ctx: &RunContext,
        goals: &[GoalId],
        ledger: &Arc<RunLedger>,
    ) -> Result<(), BackendError> {
        if let Some(first) = goals.first() {
            run_goal_pipeline(ctx, first, ledger).await?;
        }
        Err(BackendError::Execution("engine crashed".into()))
    }
}

#[tokio::test]
async fn execution_fault_resumes_only_unmerged_goals() {
    let ws = workspace("src/state.py");
    let outcome = Orchestrator::new(
        AuditConfig::default(),
        scenario_collectors(),
        Arc::new(FailsAfterFirstGoal),
    )
    .run(&ws.repo_spec(), &ws.doc, &goals())
    .await
    .unwrap();

    assert!(outcome.artifact.fell_back);
    assert_eq!(outcome.artifact.total_evidences(), 6);
    let fan_outs = outcome
        .timeline
        .iter()
        .filter(|p| matches!(p, RunPhase::FanOut(_)))
        .count();
    assert_eq!(fan_outs, goals().len(), "no goal may run twice");
}
