//! Persisted run result.
//!
//! The artifact is the hand-off to the judgment stage and the record kept
//! for later inspection. JSON encoding round-trips every Evidence and
//! AggregatedEvidence field, including exact confidence values.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::aggregate::{aggregate, AggregatedEvidence};
use crate::diagnostics::SkippedCollector;
use crate::types::{Evidence, EvidenceError, GoalId};

/// Execution backend that produced (the bulk of) a run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Direct,
    GraphEngine,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct => f.write_str("direct"),
            Self::GraphEngine => f.write_str("graph_engine"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Done,
}

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("artifact io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("artifact json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("artifact contains invalid evidence: {0}")]
    InvalidEvidence(#[from] EvidenceError),

    #[error("artifact grouped view disagrees with its evidence list: {0}")]
    Inconsistent(String),
}

/// `{evidences, aggregated}` keyed by run, plus provenance of the run itself.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunArtifact {
    pub run_id: Uuid,
    pub repository: String,
    pub document: String,
    pub goals: Vec<GoalId>,
    pub backend: BackendKind,
    /// True when the selected backend failed and Direct mode finished the run.
    #[serde(default)]
    pub fell_back: bool,
    pub status: RunStatus,
    pub evidences: Vec<Evidence>,
    pub aggregated: AggregatedEvidence,
    #[serde(default)]
    pub skipped_collectors: Vec<SkippedCollector>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunArtifact {
    /// Write pretty JSON to `out`, creating parent directories.
    pub fn write_json(&self, out: &Path) -> Result<(), ArtifactError> {
        if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| ArtifactError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let body = serde_json::to_string_pretty(self)?;
        std::fs::write(out, body).map_err(|source| ArtifactError::Io {
            path: out.to_path_buf(),
            source,
        })
    }

    /// Load an artifact, re-check every Evidence record and the grouped view.
    pub fn read_json(path: &Path) -> Result<Self, ArtifactError> {
        let body = std::fs::read_to_string(path).map_err(|source| ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let artifact: RunArtifact = serde_json::from_str(&body)?;
        artifact.validate()?;
        Ok(artifact)
    }

    /// Every record is valid and `aggregated` is exactly `aggregate(evidences)`,
    /// plus empty groups for goals that produced nothing.
    pub fn validate(&self) -> Result<(), ArtifactError> {
        for e in self.evidences.iter().chain(self.aggregated.by_goal.values().flatten()) {
            e.validate()?;
        }

        let mut expected = aggregate(&self.evidences);
        for (goal, group) in &self.aggregated.by_goal {
            if group.is_empty() {
                expected.by_goal.entry(goal.clone()).or_default();
                expected.summary.entry(goal.clone()).or_default();
            }
        }
        if expected != self.aggregated {
            let goal = expected
                .by_goal
                .keys()
                .chain(self.aggregated.by_goal.keys())
                .find(|g| {
                    expected.by_goal.get(*g) != self.aggregated.by_goal.get(*g)
                        || expected.summary.get(*g) != self.aggregated.summary.get(*g)
                });
            return Err(ArtifactError::Inconsistent(match goal {
                Some(goal) => format!("goal {goal}"),
                None => "run totals".to_string(),
            }));
        }
        Ok(())
    }

    pub fn total_evidences(&self) -> usize {
        self.aggregated.total_evidences
    }
}
