//! Evidence collection and aggregation for repository audits.
//!
//! A run acquires a repository and a report document, fans every audit goal
//! out to the collectors concurrently, and folds their Evidence into one
//! [`auditor_evidence::AuditRunState`].

pub mod collectors;
pub mod config;
pub mod engine;
pub mod errors;
pub mod sources;
pub mod tools;

pub use collectors::{default_collectors, Collector, CollectorFailure, DocAnalyst, RepoInvestigator};
pub use config::{AuditConfig, BackendPreference, Rubric, ScanOptions};
pub use engine::{
    persist, select_backend, AuditOutcome, DetectiveRunner, DirectBackend, OrchestrationBackend,
    Orchestrator, RunLedger, RunPhase,
};
pub use errors::{AcquireError, AuditError, BackendError, CollectorError, ConfigError};
pub use sources::{DocHandle, RepoHandle, SourceSet};
