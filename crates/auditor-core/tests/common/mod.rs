#![allow(dead_code)]

use async_trait::async_trait;
use auditor_core::collectors::{Collector, DocAnalyst, RepoInvestigator};
use auditor_core::config::DEFAULT_PATH_PATTERN;
use auditor_core::errors::CollectorError;
use auditor_core::sources::RepoHandle;
use auditor_core::tools::{Commit, CommitHistory, FileIngestor, MarkerScan, MarkerScanner};
use auditor_evidence::{Evidence, RunArtifact};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

pub struct FixedHistory(pub usize);

#[async_trait]
impl CommitHistory for FixedHistory {
    async fn commits(&self, _repo: &RepoHandle) -> Vec<Commit> {
        (0..self.0)
            .map(|i| Commit {
                hash: format!("{i:040x}"),
                timestamp: "2025-03-01T12:00:00+00:00".into(),
                message: format!("step {i}"),
            })
            .collect()
    }
}

pub struct NoMarker;

#[async_trait]
impl MarkerScanner for NoMarker {
    async fn scan(&self, _repo: &RepoHandle) -> Result<MarkerScan, CollectorError> {
        Ok(MarkerScan::default())
    }
}

/// Repo collector over a fake three-commit history; doc collector reading
/// the real file.
pub fn scenario_collectors() -> Vec<Arc<dyn Collector>> {
    vec![
        Arc::new(RepoInvestigator::new(Arc::new(FixedHistory(3)), Arc::new(NoMarker))),
        Arc::new(DocAnalyst::new(Arc::new(FileIngestor::new(1000)), DEFAULT_PATH_PATTERN).unwrap()),
    ]
}

pub struct Workspace {
    pub repo: TempDir,
    pub doc_dir: TempDir,
    pub doc: PathBuf,
}

pub fn workspace(doc_text: &str) -> Workspace {
    let repo = tempfile::tempdir().unwrap();
    let doc_dir = tempfile::tempdir().unwrap();
    let doc = doc_dir.path().join("report.txt");
    std::fs::write(&doc, doc_text).unwrap();
    Workspace { repo, doc_dir, doc }
}

impl Workspace {
    pub fn repo_spec(&self) -> String {
        self.repo.path().display().to_string()
    }
}

/// Evidences in a stable order for order-insensitive comparison.
pub fn sorted_evidences(artifact: &RunArtifact) -> Vec<Evidence> {
    let mut out = artifact.evidences.clone();
    out.sort_by(|a, b| (&a.goal, &a.location).cmp(&(&b.goal, &b.location)));
    out
}
