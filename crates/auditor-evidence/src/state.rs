//! Run-scoped accumulator of Evidence across goals.
//!
//! # Merge semantics
//!
//! `merge` is a per-goal set union: a record already present for a goal
//! (by value) is not appended a second time. That makes the operation
//!
//! - idempotent: `s.merge(s.clone())` has the same contents as `s`,
//! - commutative: `a.merge(b)` and `b.merge(a)` hold the same records per goal,
//! - associative: grouping of merges does not change the contents,
//!
//! so partial results from goals that complete in any order can be folded
//! in without coordination beyond single-writer access. Order within a goal
//! follows merge order and is not part of the contract; compare states with
//! [`AuditRunState::same_contents`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::aggregate::{aggregate, AggregatedEvidence};
use crate::diagnostics::SkippedCollector;
use crate::types::{Evidence, GoalId};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AuditRunState {
    pub evidences: BTreeMap<GoalId, Vec<Evidence>>,
    #[serde(default)]
    pub skipped: Vec<SkippedCollector>,
}

impl AuditRunState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Partial state for one goal's pipeline.
    ///
    /// The goal key is registered even when `evidences` is empty, so a goal
    /// whose collectors all failed still appears with an empty list.
    pub fn for_goal(
        goal: impl Into<GoalId>,
        evidences: Vec<Evidence>,
        skipped: Vec<SkippedCollector>,
    ) -> Self {
        let mut state = Self::new();
        state.evidences.insert(goal.into(), Vec::new());
        for e in evidences {
            state.push_unique(e);
        }
        for s in skipped {
            if !state.skipped.contains(&s) {
                state.skipped.push(s);
            }
        }
        state
    }

    /// Union `partial` into `self` and return the result.
    pub fn merge(mut self, partial: AuditRunState) -> AuditRunState {
        self.merge_in(partial);
        self
    }

    /// In-place form of [`AuditRunState::merge`].
    pub fn merge_in(&mut self, partial: AuditRunState) {
        for (goal, items) in partial.evidences {
            self.evidences.entry(goal).or_default();
            for e in items {
                self.push_unique(e);
            }
        }
        for s in partial.skipped {
            if !self.skipped.contains(&s) {
                self.skipped.push(s);
            }
        }
    }

    fn push_unique(&mut self, e: Evidence) {
        let list = self.evidences.entry(e.goal.clone()).or_default();
        if !list.contains(&e) {
            list.push(e);
        }
    }

    pub fn contains_goal(&self, goal: &str) -> bool {
        self.evidences.contains_key(goal)
    }

    pub fn total_evidences(&self) -> usize {
        self.evidences.values().map(Vec::len).sum()
    }

    /// Flat evidence list, goals in key order, records in merge order.
    pub fn flatten(&self) -> Vec<Evidence> {
        self.evidences.values().flatten().cloned().collect()
    }

    /// Grouped view recomputed from the flat list.
    ///
    /// Goals that were merged without any evidence keep an empty group.
    pub fn aggregated(&self) -> AggregatedEvidence {
        let mut agg = aggregate(&self.flatten());
        for goal in self.evidences.keys() {
            agg.by_goal.entry(goal.clone()).or_default();
            agg.summary.entry(goal.clone()).or_default();
        }
        agg
    }

    /// Same goals, and per goal the same records irrespective of order.
    pub fn same_contents(&self, other: &AuditRunState) -> bool {
        if self.evidences.len() != other.evidences.len() {
            return false;
        }
        let evidences_match = self.evidences.iter().all(|(goal, mine)| {
            other
                .evidences
                .get(goal)
                .is_some_and(|theirs| same_multiset(mine, theirs))
        });
        evidences_match && same_multiset(&self.skipped, &other.skipped)
    }
}

fn same_multiset<T: PartialEq>(a: &[T], b: &[T]) -> bool {
    a.len() == b.len() && a.iter().all(|x| b.contains(x)) && b.iter().all(|x| a.contains(x))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::SkipReason;

    fn ev(goal: &str, location: &str) -> Evidence {
        Evidence::new(goal, true, None, location, "test", 0.9).unwrap()
    }

    fn partial(goal: &str, locations: &[&str]) -> AuditRunState {
        AuditRunState::for_goal(
            goal,
            locations.iter().map(|l| ev(goal, l)).collect(),
            Vec::new(),
        )
    }

    #[test]
    fn merge_is_idempotent() {
        let s = partial("a", &["repo", "doc"]);
        let merged = s.clone().merge(s.clone());
        assert!(merged.same_contents(&s));
        assert_eq!(merged.total_evidences(), 2);
    }

    #[test]
    fn merge_is_commutative() {
        let a = partial("a", &["repo"]);
        let b = partial("b", &["doc"]).merge(partial("a", &["doc"]));
        assert!(a.clone().merge(b.clone()).same_contents(&b.merge(a)));
    }

    #[test]
    fn merge_is_associative() {
        let a = partial("a", &["repo"]);
        let b = partial("a", &["doc"]);
        let c = partial("c", &["repo"]);
        let left = a.clone().merge(b.clone()).merge(c.clone());
        let right = a.merge(b.merge(c));
        assert!(left.same_contents(&right));
    }

    #[test]
    fn empty_goal_survives_merge_and_aggregation() {
        let skipped = SkippedCollector::new("a", "RepoInvestigator", SkipReason::Timeout, "30s");
        let state = AuditRunState::new().merge(AuditRunState::for_goal("a", vec![], vec![skipped]));
        assert!(state.contains_goal("a"));
        let agg = state.aggregated();
        assert_eq!(agg.total_evidences, 0);
        assert!(agg.for_goal("a").is_empty());
        assert!(agg.by_goal.contains_key("a"));
        assert_eq!(state.skipped.len(), 1);
    }

    #[test]
    fn evidence_is_filed_under_its_own_goal() {
        // A partial for goal "a" that carries a record for "b" files it under "b".
        let state = AuditRunState::for_goal("a", vec![ev("b", "repo")], vec![]);
        assert!(state.evidences["a"].is_empty());
        assert_eq!(state.evidences["b"].len(), 1);
    }
}
