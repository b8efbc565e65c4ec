//! Collectors ("detectives"): independent producers of at most one Evidence
//! record per goal, each reading a single data source.
//!
//! A collector never lets I/O or parse trouble escape as a panic; anything
//! that prevents a finding resolves to a [`CollectorError`]. Timeouts are
//! imposed from outside by the runner.

pub mod doc;
pub mod repo;

use async_trait::async_trait;
use auditor_evidence::{Evidence, GoalId, SkippedCollector};
use std::sync::Arc;

use crate::config::AuditConfig;
use crate::errors::{CollectorError, ConfigError};
use crate::sources::SourceSet;
use crate::tools::{FileIngestor, GitHistory, SourceTreeScanner};

pub use doc::DocAnalyst;
pub use repo::RepoInvestigator;

#[async_trait]
pub trait Collector: Send + Sync {
    /// Stable name used in logs and diagnostics.
    fn name(&self) -> &'static str;

    async fn collect(&self, goal: &str, sources: &SourceSet) -> Result<Evidence, CollectorError>;
}

/// Typed failure of one collector invocation.
#[derive(Debug)]
pub struct CollectorFailure {
    pub collector: String,
    pub goal: GoalId,
    pub error: CollectorError,
}

impl CollectorFailure {
    pub fn new(collector: impl Into<String>, goal: impl Into<GoalId>, error: CollectorError) -> Self {
        Self {
            collector: collector.into(),
            goal: goal.into(),
            error,
        }
    }

    pub fn to_skipped(&self) -> SkippedCollector {
        SkippedCollector::new(
            self.goal.clone(),
            self.collector.clone(),
            self.error.kind(),
            self.error.to_string(),
        )
    }
}

/// Outcome of one collector invocation: exactly one Evidence, or a failure.
pub type CollectorResult = Result<Evidence, CollectorFailure>;

/// The two production collectors, wired from configuration.
pub fn default_collectors(cfg: &AuditConfig) -> Result<Vec<Arc<dyn Collector>>, ConfigError> {
    let repo = RepoInvestigator::new(
        Arc::new(GitHistory),
        Arc::new(SourceTreeScanner::new(cfg.scan.clone())),
    );
    let doc = DocAnalyst::new(
        Arc::new(FileIngestor::new(cfg.document_chunk_chars)),
        &cfg.path_pattern,
    )?;
    Ok(vec![Arc::new(repo), Arc::new(doc)])
}
