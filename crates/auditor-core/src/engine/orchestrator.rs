//! Audit run driver.
//!
//! `INIT` acquires both sources concurrently; only then does any goal fan
//! out. The selected backend runs the goals; if it faults, or returns while
//! a requested goal is still unmerged, Direct mode finishes whatever it
//! left. `DONE` is recorded once every requested goal has merged.

use auditor_evidence::{BackendKind, GoalId, RunArtifact, RunStatus};
use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

use super::backend::{select_backend, DirectBackend, OrchestrationBackend, RunContext};
use super::ledger::{RunLedger, RunPhase};
use super::runner::DetectiveRunner;
use crate::collectors::{default_collectors, Collector};
use crate::config::{dedup_preserving_order, AuditConfig};
use crate::errors::{AuditError, BackendError, ConfigError};
use crate::sources::{acquire_document, acquire_repository, CloneOptions, SourceSet};

/// Finished run: the persisted artifact plus the phase timeline.
#[derive(Debug)]
pub struct AuditOutcome {
    pub artifact: RunArtifact,
    pub timeline: Vec<RunPhase>,
}

pub struct Orchestrator {
    config: AuditConfig,
    collectors: Vec<Arc<dyn Collector>>,
    backend: Arc<dyn OrchestrationBackend>,
}

impl Orchestrator {
    /// Production wiring: default collectors and the configured backend.
    /// Returns the resolved goals alongside, so the rubric is loaded once.
    pub fn prepare(config: AuditConfig) -> Result<(Self, Vec<GoalId>), ConfigError> {
        let goals = config.validated_goals()?;
        let collectors = default_collectors(&config)?;
        let backend = select_backend(config.backend);
        Ok((Self::new(config, collectors, backend), goals))
    }

    pub fn new(
        config: AuditConfig,
        collectors: Vec<Arc<dyn Collector>>,
        backend: Arc<dyn OrchestrationBackend>,
    ) -> Self {
        Self {
            config,
            collectors,
            backend,
        }
    }

    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.backend.kind()
    }

    pub async fn run(
        &self,
        repo_spec: &str,
        doc_path: &Path,
        goals: &[GoalId],
    ) -> Result<AuditOutcome, AuditError> {
        let run_id = Uuid::new_v4();
        let goals = dedup_preserving_order(goals.iter().cloned());
        if goals.is_empty() {
            return Err(ConfigError::Invalid("no audit goals given".into()).into());
        }
        self.run_goals(run_id, repo_spec, doc_path, goals)
            .instrument(tracing::info_span!("audit_run", %run_id))
            .await
    }

    async fn run_goals(
        &self,
        run_id: Uuid,
        repo_spec: &str,
        doc_path: &Path,
        goals: Vec<GoalId>,
    ) -> Result<AuditOutcome, AuditError> {
        let started_at = Utc::now();
        tracing::info!(
            repository = repo_spec,
            document = %doc_path.display(),
            goals = goals.len(),
            "audit run started"
        );

        let sources = Arc::new(self.acquire(repo_spec, doc_path).await?);
        let ctx = RunContext {
            run_id,
            sources,
            runner: Arc::new(DetectiveRunner::new(
                self.collectors.clone(),
                self.config.collector_timeout(),
            )),
        };
        let ledger = Arc::new(RunLedger::new());

        let mut backend = self.backend.kind();
        let mut fell_back = false;
        let executed = self
            .backend
            .execute(&ctx, &goals, &ledger)
            .await
            .and_then(|()| all_merged(&ledger, &goals));
        if let Err(e) = executed {
            if backend == BackendKind::Direct {
                return Err(e.into());
            }
            tracing::warn!(
                backend = %backend,
                error = %e,
                remaining = ledger.remaining(&goals).len(),
                "backend failed; falling back to direct mode"
            );
            DirectBackend.execute(&ctx, &goals, &ledger).await?;
            all_merged(&ledger, &goals)?;
            backend = BackendKind::Direct;
            fell_back = true;
        }
        ledger.finish(&goals)?;

        let state = ledger.snapshot();
        let timeline = ledger.timeline();
        let artifact = RunArtifact {
            run_id,
            repository: ctx
                .sources
                .repository
                .as_ref()
                .map_or_else(|| repo_spec.to_string(), |r| r.origin().to_string()),
            document: doc_path.display().to_string(),
            goals,
            backend,
            fell_back,
            status: RunStatus::Done,
            evidences: state.flatten(),
            aggregated: state.aggregated(),
            skipped_collectors: state.skipped,
            started_at,
            finished_at: Utc::now(),
        };

        tracing::info!(
            total_evidences = artifact.total_evidences(),
            skipped = artifact.skipped_collectors.len(),
            backend = %artifact.backend,
            fell_back,
            "audit run done"
        );
        Ok(AuditOutcome { artifact, timeline })
    }

    /// INIT: both acquisitions run concurrently; one failure is tolerated.
    async fn acquire(&self, repo_spec: &str, doc_path: &Path) -> Result<SourceSet, AuditError> {
        let clone = CloneOptions {
            timeout: self.config.clone_timeout(),
            depth: self.config.clone_depth,
            ..CloneOptions::default()
        };
        let (repository, document) = tokio::join!(
            acquire_repository(repo_spec, &clone),
            acquire_document(doc_path)
        );

        match (repository, document) {
            (Err(repository), Err(document)) => Err(AuditError::NoSources {
                repository,
                document,
            }),
            (repository, document) => {
                let repository = repository
                    .inspect_err(|e| tracing::warn!(error = %e, "repository unavailable"))
                    .ok();
                let document = document
                    .inspect_err(|e| tracing::warn!(error = %e, "document unavailable"))
                    .ok();
                Ok(SourceSet::new(repository, document))
            }
        }
    }
}

/// A backend that returns `Ok` with goals still unmerged has faulted.
fn all_merged(ledger: &RunLedger, goals: &[GoalId]) -> Result<(), BackendError> {
    let left = ledger.remaining(goals);
    if left.is_empty() {
        Ok(())
    } else {
        Err(BackendError::Execution(format!(
            "backend returned with goals unmerged: {}",
            left.join(", ")
        )))
    }
}

/// Write the artifact to the configured output path.
pub fn persist(outcome: &AuditOutcome, out: &Path) -> Result<(), AuditError> {
    outcome.artifact.write_json(out)?;
    tracing::info!(path = %out.display(), "run artifact written");
    Ok(())
}
