use async_trait::async_trait;
use auditor_evidence::{Evidence, EvidenceError};
use std::sync::Arc;

use super::Collector;
use crate::errors::CollectorError;
use crate::sources::SourceSet;
use crate::tools::{Commit, CommitHistory, MarkerScan, MarkerScanner};

pub const REPO_FOUND_CONFIDENCE: f64 = 0.9;
pub const REPO_NOT_FOUND_CONFIDENCE: f64 = 0.1;

/// Forensic signals from the repository: commit history and graph markers.
pub struct RepoInvestigator {
    history: Arc<dyn CommitHistory>,
    scanner: Arc<dyn MarkerScanner>,
}

impl RepoInvestigator {
    pub const NAME: &'static str = "RepoInvestigator";

    pub fn new(history: Arc<dyn CommitHistory>, scanner: Arc<dyn MarkerScanner>) -> Self {
        Self { history, scanner }
    }
}

#[async_trait]
impl Collector for RepoInvestigator {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn collect(&self, goal: &str, sources: &SourceSet) -> Result<Evidence, CollectorError> {
        let repo = sources
            .repository
            .as_ref()
            .ok_or(CollectorError::SourceUnavailable {
                source_kind: "repository",
            })?;

        let (commits, scan) = tokio::join!(self.history.commits(repo), self.scanner.scan(repo));
        let scan = scan?;

        tracing::debug!(
            goal,
            commits = commits.len(),
            marker_found = scan.marker_found,
            edge_sites = scan.edge_sites.len(),
            files_skipped = scan.files_skipped,
            "repository signals collected"
        );

        Ok(repo_evidence(goal, repo.origin(), &commits, &scan)?)
    }
}

/// `found = commits present OR marker present`; content is the first snippet.
pub fn repo_evidence(
    goal: &str,
    location: &str,
    commits: &[Commit],
    scan: &MarkerScan,
) -> Result<Evidence, EvidenceError> {
    let found = !commits.is_empty() || scan.marker_found;
    Evidence::new(
        goal,
        found,
        scan.snippets.first().cloned(),
        location,
        format!(
            "Found {} commits; stategraph_found={}",
            commits.len(),
            scan.marker_found
        ),
        if found {
            REPO_FOUND_CONFIDENCE
        } else {
            REPO_NOT_FOUND_CONFIDENCE
        },
    )
}
