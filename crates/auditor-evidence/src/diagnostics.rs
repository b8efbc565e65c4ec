//! Structured diagnostics for collectors that produced no Evidence.
//!
//! A skipped collector is a failure, not a negative finding: it never shows
//! up as an Evidence record with `found = false`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::GoalId;

/// Why a collector contributed nothing for a goal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The data source the collector reads was never acquired.
    SourceUnavailable,
    /// The invocation exceeded the collector timeout.
    Timeout,
    /// The collector returned an error.
    Failed,
    /// The collector task panicked or was aborted.
    Panicked,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SourceUnavailable => "source_unavailable",
            Self::Timeout => "timeout",
            Self::Failed => "failed",
            Self::Panicked => "panicked",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SkippedCollector {
    pub goal: GoalId,
    pub collector: String,
    pub reason: SkipReason,
    pub detail: String,
}

impl SkippedCollector {
    pub fn new(
        goal: impl Into<GoalId>,
        collector: impl Into<String>,
        reason: SkipReason,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            goal: goal.into(),
            collector: collector.into(),
            reason,
            detail: detail.into(),
        }
    }
}
