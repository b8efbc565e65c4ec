//! Run ledger: the single shared audit state of a run plus its phase timeline.
//!
//! All merges go through one lock, so concurrently finishing goals cannot
//! lose each other's records.

use auditor_evidence::{AuditRunState, GoalId};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard};

use crate::errors::BackendError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunPhase {
    Init,
    FanOut(GoalId),
    FanIn(GoalId),
    Merge(GoalId),
    Done,
}

impl RunPhase {
    fn goal(&self) -> Option<&str> {
        match self {
            Self::FanOut(g) | Self::FanIn(g) | Self::Merge(g) => Some(g),
            Self::Init | Self::Done => None,
        }
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init => f.write_str("init"),
            Self::FanOut(g) => write!(f, "fan_out({g})"),
            Self::FanIn(g) => write!(f, "fan_in({g})"),
            Self::Merge(g) => write!(f, "merge({g})"),
            Self::Done => f.write_str("done"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum GoalStage {
    FannedOut,
    FannedIn,
    Merged,
}

impl GoalStage {
    fn name(&self) -> &'static str {
        match self {
            Self::FannedOut => "fan_out",
            Self::FannedIn => "fan_in",
            Self::Merged => "merge",
        }
    }
}

#[derive(Debug)]
struct LedgerInner {
    state: AuditRunState,
    timeline: Vec<RunPhase>,
    stages: BTreeMap<GoalId, GoalStage>,
    done: bool,
}

#[derive(Debug)]
pub struct RunLedger {
    inner: Mutex<LedgerInner>,
}

impl Default for RunLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl RunLedger {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(LedgerInner {
                state: AuditRunState::new(),
                timeline: vec![RunPhase::Init],
                stages: BTreeMap::new(),
                done: false,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LedgerInner> {
        // A panic while holding the lock cannot leave a half-merged state:
        // merge_in only appends.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn fan_out(&self, goal: &str) -> Result<(), BackendError> {
        self.transition(RunPhase::FanOut(goal.to_string()))
    }

    pub fn fan_in(&self, goal: &str) -> Result<(), BackendError> {
        self.transition(RunPhase::FanIn(goal.to_string()))
    }

    /// Record `Merge(goal)` and fold the partial state in, atomically.
    pub fn merge(&self, goal: &str, partial: AuditRunState) -> Result<(), BackendError> {
        let mut inner = self.lock();
        let phase = RunPhase::Merge(goal.to_string());
        check_transition(&inner, &phase)?;
        inner.state.merge_in(partial);
        record(&mut inner, phase);
        Ok(())
    }

    /// Record `Done`. Every goal of `goals` and every goal started along the
    /// way must already be merged.
    pub fn finish(&self, goals: &[GoalId]) -> Result<(), BackendError> {
        let mut inner = self.lock();
        let phase = RunPhase::Done;
        check_transition(&inner, &phase)?;
        if let Some(goal) = goals
            .iter()
            .find(|g| inner.stages.get(g.as_str()) != Some(&GoalStage::Merged))
        {
            return Err(BackendError::PhaseOrder {
                goal: goal.clone(),
                from: inner.stages.get(goal.as_str()).map_or("pending", GoalStage::name).to_string(),
                to: phase.to_string(),
            });
        }
        record(&mut inner, phase);
        Ok(())
    }

    fn transition(&self, phase: RunPhase) -> Result<(), BackendError> {
        let mut inner = self.lock();
        check_transition(&inner, &phase)?;
        record(&mut inner, phase);
        Ok(())
    }

    pub fn is_merged(&self, goal: &str) -> bool {
        self.lock().stages.get(goal) == Some(&GoalStage::Merged)
    }

    /// Goals of `goals` not yet merged, in the given order.
    pub fn remaining(&self, goals: &[GoalId]) -> Vec<GoalId> {
        let inner = self.lock();
        goals
            .iter()
            .filter(|g| inner.stages.get(g.as_str()) != Some(&GoalStage::Merged))
            .cloned()
            .collect()
    }

    pub fn is_done(&self) -> bool {
        self.lock().done
    }

    pub fn snapshot(&self) -> AuditRunState {
        self.lock().state.clone()
    }

    pub fn timeline(&self) -> Vec<RunPhase> {
        self.lock().timeline.clone()
    }

    pub fn into_parts(self) -> (AuditRunState, Vec<RunPhase>) {
        let inner = self
            .inner
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        (inner.state, inner.timeline)
    }
}

fn check_transition(inner: &LedgerInner, phase: &RunPhase) -> Result<(), BackendError> {
    let from = inner.timeline.last().map(ToString::to_string).unwrap_or_default();
    let violation = || BackendError::PhaseOrder {
        goal: phase.goal().unwrap_or("*").to_string(),
        from: from.clone(),
        to: phase.to_string(),
    };

    if inner.done {
        return Err(violation());
    }

    let stage = phase.goal().and_then(|g| inner.stages.get(g)).copied();
    let allowed = match phase {
        RunPhase::Init => false,
        // A goal left half-done by a failed backend may be fanned out again.
        RunPhase::FanOut(_) => stage != Some(GoalStage::Merged),
        RunPhase::FanIn(_) => stage == Some(GoalStage::FannedOut),
        RunPhase::Merge(_) => stage == Some(GoalStage::FannedIn),
        RunPhase::Done => inner
            .stages
            .values()
            .all(|s| *s == GoalStage::Merged),
    };
    if allowed {
        Ok(())
    } else {
        Err(violation())
    }
}

fn record(inner: &mut LedgerInner, phase: RunPhase) {
    tracing::debug!(phase = %phase, "run phase");
    match &phase {
        RunPhase::FanOut(g) => {
            inner.stages.insert(g.clone(), GoalStage::FannedOut);
        }
        RunPhase::FanIn(g) => {
            inner.stages.insert(g.clone(), GoalStage::FannedIn);
        }
        RunPhase::Merge(g) => {
            inner.stages.insert(g.clone(), GoalStage::Merged);
        }
        RunPhase::Done => inner.done = true,
        RunPhase::Init => {}
    }
    inner.timeline.push(phase);
}
