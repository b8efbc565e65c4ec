//! Fan-in aggregation: group Evidence by goal and count it.
//!
//! `aggregate` is a pure fold over its input. It performs no I/O, never
//! mutates the slice, and can be re-run on a growing prefix of the flat
//! evidence list to refresh the run-level view after each merge.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::{Evidence, GoalId};

/// Per-goal statistics derived alongside the grouping.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct GoalSummary {
    pub evidences: usize,
    pub found: usize,
    pub mean_confidence: f64,
}

/// Run-level grouped view of the evidence produced so far.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AggregatedEvidence {
    /// Evidence per goal, in the order it was given.
    pub by_goal: BTreeMap<GoalId, Vec<Evidence>>,

    /// Number of Evidence records across all goals.
    pub total_evidences: usize,

    /// Number of records with `found = true`.
    #[serde(default)]
    pub found_total: usize,

    #[serde(default)]
    pub summary: BTreeMap<GoalId, GoalSummary>,
}

impl AggregatedEvidence {
    pub fn goals(&self) -> impl Iterator<Item = &str> {
        self.by_goal.keys().map(String::as_str)
    }

    pub fn for_goal(&self, goal: &str) -> &[Evidence] {
        self.by_goal.get(goal).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Group `evidences` by goal, preserving input order within each goal.
pub fn aggregate(evidences: &[Evidence]) -> AggregatedEvidence {
    let mut by_goal: BTreeMap<GoalId, Vec<Evidence>> = BTreeMap::new();
    for e in evidences {
        by_goal.entry(e.goal.clone()).or_default().push(e.clone());
    }

    let summary = by_goal
        .iter()
        .map(|(goal, items)| (goal.clone(), summarize(items)))
        .collect();

    AggregatedEvidence {
        by_goal,
        total_evidences: evidences.len(),
        found_total: evidences.iter().filter(|e| e.found).count(),
        summary,
    }
}

fn summarize(items: &[Evidence]) -> GoalSummary {
    let found = items.iter().filter(|e| e.found).count();
    let mean_confidence = if items.is_empty() {
        0.0
    } else {
        items.iter().map(|e| e.confidence).sum::<f64>() / items.len() as f64
    };
    GoalSummary {
        evidences: items.len(),
        found,
        mean_confidence,
    }
}
