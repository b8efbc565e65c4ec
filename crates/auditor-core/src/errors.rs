//! Error taxonomy of the audit pipeline.
//!
//! Only [`AuditError`] ever reaches the caller of a run. Acquisition and
//! collector failures are absorbed into diagnostics; backend failures end in
//! a Direct-mode fallback.

use auditor_evidence::{ArtifactError, EvidenceError, SkipReason};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse {path}: {detail}")]
    Parse { path: PathBuf, detail: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Failure to obtain a source handle.
#[derive(Debug, thiserror::Error)]
pub enum AcquireError {
    #[error("git clone of {url} failed: {stderr}")]
    CloneFailed { url: String, stderr: String },

    #[error("git clone of {url} timed out after {timeout:?}")]
    CloneTimeout { url: String, timeout: Duration },

    #[error("cannot run git: {0}")]
    GitUnavailable(#[source] std::io::Error),

    #[error("cannot allocate working directory: {0}")]
    WorkDir(#[source] std::io::Error),

    #[error("document {path} unreadable: {detail}")]
    DocumentUnreadable { path: PathBuf, detail: String },
}

/// Failure of a single collector invocation.
#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    #[error("{source_kind} source unavailable")]
    SourceUnavailable { source_kind: &'static str },

    #[error("collector exceeded {0:?}")]
    Timeout(Duration),

    #[error("extraction failed: {0}")]
    Extraction(String),

    #[error("collector produced invalid evidence: {0}")]
    InvalidEvidence(#[from] EvidenceError),

    #[error("evidence addresses goal {actual}, expected {expected}")]
    GoalMismatch { expected: String, actual: String },

    #[error("collector task panicked: {0}")]
    Panicked(String),
}

impl CollectorError {
    pub fn kind(&self) -> SkipReason {
        match self {
            Self::SourceUnavailable { .. } => SkipReason::SourceUnavailable,
            Self::Timeout(_) => SkipReason::Timeout,
            Self::Extraction(_) | Self::InvalidEvidence(_) | Self::GoalMismatch { .. } => {
                SkipReason::Failed
            }
            Self::Panicked(_) => SkipReason::Panicked,
        }
    }
}

/// Fault of an orchestration backend, at build or execution time.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    #[error("graph build failed: {0}")]
    Build(String),

    #[error("graph execution failed: {0}")]
    Execution(String),

    #[error("phase order violated for goal {goal}: {from} -> {to}")]
    PhaseOrder {
        goal: String,
        from: String,
        to: String,
    },
}

/// Run-level failure, surfaced with a non-zero exit status.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("no source could be acquired (repository: {repository}; document: {document})")]
    NoSources {
        repository: AcquireError,
        document: AcquireError,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    /// Direct mode itself failed; there is nothing left to fall back to.
    #[error("direct execution failed: {0}")]
    Backend(#[from] BackendError),
}
