pub mod aggregate;
pub mod artifact;
pub mod diagnostics;
pub mod judgment;
pub mod state;
pub mod types;

// Convenience re-exports
pub use aggregate::{aggregate, AggregatedEvidence, GoalSummary};
pub use artifact::{ArtifactError, BackendKind, RunArtifact, RunStatus};
pub use diagnostics::{SkipReason, SkippedCollector};
pub use judgment::{AuditReport, CriterionResult, Judge, JudgmentError, JudicialOpinion};
pub use state::AuditRunState;
pub use types::{Evidence, EvidenceError, GoalId};
