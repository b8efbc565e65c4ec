//! Orchestration backends: interchangeable drivers of the per-goal pipeline
//! `FanOut -> runner -> FanIn -> Merge`.

use async_trait::async_trait;
use auditor_evidence::{BackendKind, GoalId};
use std::sync::Arc;
use uuid::Uuid;

use super::ledger::RunLedger;
use super::runner::{DetectiveRunner, RunnerOutcome};
use crate::config::BackendPreference;
use crate::errors::BackendError;
use crate::sources::SourceSet;

/// Everything a backend needs to run goals; cheap to clone into tasks.
#[derive(Clone)]
pub struct RunContext {
    pub run_id: Uuid,
    pub sources: Arc<SourceSet>,
    pub runner: Arc<DetectiveRunner>,
}

#[async_trait]
pub trait OrchestrationBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Run every goal of `goals` not already merged into `ledger`.
    async fn execute(
        &self,
        ctx: &RunContext,
        goals: &[GoalId],
        ledger: &Arc<RunLedger>,
    ) -> Result<(), BackendError>;
}

/// One goal end to end against the shared ledger.
pub async fn run_goal_pipeline(
    ctx: &RunContext,
    goal: &str,
    ledger: &RunLedger,
) -> Result<(), BackendError> {
    ledger.fan_out(goal)?;
    let outcome = ctx.runner.run(goal, &ctx.sources).await;
    ledger.fan_in(goal)?;
    merge_outcome(goal, outcome, ledger)
}

/// Aggregation step shared by both backends.
pub(crate) fn merge_outcome(
    goal: &str,
    outcome: RunnerOutcome,
    ledger: &RunLedger,
) -> Result<(), BackendError> {
    let partial = outcome.into_partial(goal);
    let aggregated = partial.aggregated();
    tracing::info!(
        goal,
        evidences = aggregated.total_evidences,
        found = aggregated.found_total,
        skipped = partial.skipped.len(),
        "goal aggregated"
    );
    ledger.merge(goal, partial)
}

/// Sequential driver; also the fallback when another backend faults.
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectBackend;

#[async_trait]
impl OrchestrationBackend for DirectBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Direct
    }

    async fn execute(
        &self,
        ctx: &RunContext,
        goals: &[GoalId],
        ledger: &Arc<RunLedger>,
    ) -> Result<(), BackendError> {
        for goal in ledger.remaining(goals) {
            run_goal_pipeline(ctx, &goal, ledger).await?;
        }
        Ok(())
    }
}

/// Pick the backend once per run from preference and compiled features.
pub fn select_backend(pref: BackendPreference) -> Arc<dyn OrchestrationBackend> {
    match pref {
        BackendPreference::Direct => Arc::new(DirectBackend),
        BackendPreference::Auto | BackendPreference::Graph => graph_or_direct(pref),
    }
}

#[cfg(feature = "graph-engine")]
fn graph_or_direct(_pref: BackendPreference) -> Arc<dyn OrchestrationBackend> {
    Arc::new(super::graph::GraphEngineBackend::default())
}

#[cfg(not(feature = "graph-engine"))]
fn graph_or_direct(pref: BackendPreference) -> Arc<dyn OrchestrationBackend> {
    if pref == BackendPreference::Graph {
        tracing::warn!("graph engine requested but not compiled in; using direct mode");
    }
    Arc::new(DirectBackend)
}
