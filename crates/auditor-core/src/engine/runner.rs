//! Detective Runner: concurrent fan-out of all collectors for one goal.
//!
//! Guarantees:
//! - every collector task is spawned before the first one is awaited;
//! - a slow, failing or panicking collector never suppresses a sibling's result;
//! - results arrive in completion order, which callers must not rely on;
//! - the outcome holds between 0 and `collectors.len()` Evidence records.
//!
//! Failures are not escalated; they come back as [`CollectorFailure`]s so a
//! failed collector stays distinguishable from a negative finding.

use auditor_evidence::{AuditRunState, Evidence, SkippedCollector};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::timeout;

use crate::collectors::{Collector, CollectorFailure, CollectorResult};
use crate::errors::CollectorError;
use crate::sources::SourceSet;

/// Collector variants in the default wiring; the pool never shrinks below it.
pub const MIN_POOL_SIZE: usize = 2;

#[derive(Debug, Default)]
pub struct RunnerOutcome {
    pub evidences: Vec<Evidence>,
    pub failures: Vec<CollectorFailure>,
}

impl RunnerOutcome {
    pub fn skipped(&self) -> Vec<SkippedCollector> {
        self.failures.iter().map(CollectorFailure::to_skipped).collect()
    }

    /// Partial run state for merging into the run ledger.
    pub fn into_partial(self, goal: &str) -> AuditRunState {
        let skipped = self.skipped();
        AuditRunState::for_goal(goal, self.evidences, skipped)
    }
}

/// A fixed set of collectors plus the per-invocation timeout.
#[derive(Clone)]
pub struct DetectiveRunner {
    collectors: Vec<Arc<dyn Collector>>,
    collector_timeout: Duration,
}

impl DetectiveRunner {
    pub fn new(collectors: Vec<Arc<dyn Collector>>, collector_timeout: Duration) -> Self {
        Self {
            collectors,
            collector_timeout,
        }
    }

    pub fn collectors(&self) -> &[Arc<dyn Collector>] {
        &self.collectors
    }

    pub fn collector_timeout(&self) -> Duration {
        self.collector_timeout
    }

    pub async fn run(&self, goal: &str, sources: &Arc<SourceSet>) -> RunnerOutcome {
        run_detectives(goal, sources, &self.collectors, self.collector_timeout).await
    }
}

pub async fn run_detectives(
    goal: &str,
    sources: &Arc<SourceSet>,
    collectors: &[Arc<dyn Collector>],
    collector_timeout: Duration,
) -> RunnerOutcome {
    let pool = Arc::new(Semaphore::new(collectors.len().max(MIN_POOL_SIZE)));
    let mut join_set = JoinSet::new();

    for collector in collectors {
        let collector = Arc::clone(collector);
        let sources = Arc::clone(sources);
        let goal = goal.to_string();
        let pool = Arc::clone(&pool);
        join_set.spawn(async move {
            let _permit = pool.acquire_owned().await;
            invoke_isolated(collector, goal, sources, collector_timeout).await
        });
    }

    let mut outcome = RunnerOutcome::default();
    while let Some(res) = join_set.join_next().await {
        match res {
            Ok(Ok(evidence)) => outcome.evidences.push(evidence),
            Ok(Err(failure)) => {
                tracing::warn!(
                    goal = %failure.goal,
                    collector = %failure.collector,
                    reason = %failure.error.kind(),
                    error = %failure.error,
                    "collector skipped"
                );
                outcome.failures.push(failure);
            }
            Err(e) => {
                tracing::warn!(goal, error = %e, "collector join error");
                outcome.failures.push(CollectorFailure::new(
                    "unknown",
                    goal,
                    CollectorError::Panicked(format!("join error: {e}")),
                ));
            }
        }
    }
    outcome
}

/// Run one collector in its own task under the timeout.
///
/// The inner task contains panics and is aborted on timeout, so the caller
/// always gets a result tagged with the collector's name.
async fn invoke_isolated(
    collector: Arc<dyn Collector>,
    goal: String,
    sources: Arc<SourceSet>,
    collector_timeout: Duration,
) -> CollectorResult {
    let name = collector.name();
    let started = Instant::now();

    let task_goal = goal.clone();
    let mut inner =
        tokio::spawn(async move { collector.collect(&task_goal, &sources).await });

    let result = match timeout(collector_timeout, &mut inner).await {
        Ok(Ok(Ok(evidence))) if evidence.goal != goal => Err(CollectorError::GoalMismatch {
            expected: goal.clone(),
            actual: evidence.goal,
        }),
        Ok(Ok(Ok(evidence))) => Ok(evidence),
        Ok(Ok(Err(e))) => Err(e),
        Ok(Err(join_err)) => Err(CollectorError::Panicked(join_err.to_string())),
        Err(_) => {
            inner.abort();
            Err(CollectorError::Timeout(collector_timeout))
        }
    };

    tracing::debug!(
        goal = %goal,
        collector = name,
        ok = result.is_ok(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "collector finished"
    );

    result.map_err(|e| CollectorFailure::new(name, goal, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use auditor_evidence::SkipReason;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Behavior {
        Succeed,
        Fail,
        Hang,
        Panic,
        WrongGoal,
    }

    struct Scripted {
        name: &'static str,
        behavior: Behavior,
        delay: Duration,
    }

    impl Scripted {
        fn new(name: &'static str, behavior: Behavior) -> Arc<dyn Collector> {
            Arc::new(Self {
                name,
                behavior,
                delay: Duration::ZERO,
            })
        }
    }

    #[async_trait]
    impl Collector for Scripted {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn collect(&self, goal: &str, _sources: &SourceSet) -> Result<Evidence, CollectorError> {
            tokio::time::sleep(self.delay).await;
            match self.behavior {
                Behavior::Succeed => Ok(Evidence::new(goal, true, None, self.name, "ok", 0.9)?),
                Behavior::Fail => Err(CollectorError::Extraction("boom".into())),
                Behavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    unreachable!()
                }
                Behavior::Panic => panic!("collector bug"),
                Behavior::WrongGoal => Ok(Evidence::new("other", true, None, self.name, "ok", 0.9)?),
            }
        }
    }

    fn sources() -> Arc<SourceSet> {
        Arc::new(SourceSet::default())
    }

    #[tokio::test]
    async fn timed_out_sibling_does_not_block_survivor() {
        let collectors = vec![
            Scripted::new("hang", Behavior::Hang),
            Scripted::new("ok", Behavior::Succeed),
        ];
        let out = run_detectives("g", &sources(), &collectors, Duration::from_millis(50)).await;
        assert_eq!(out.evidences.len(), 1);
        assert_eq!(out.evidences[0].location, "ok");
        assert_eq!(out.failures.len(), 1);
        assert_eq!(out.failures[0].collector, "hang");
        assert_eq!(out.failures[0].error.kind(), SkipReason::Timeout);
    }

    #[tokio::test]
    async fn failures_and_panics_are_isolated_and_named() {
        let collectors = vec![
            Scripted::new("fail", Behavior::Fail),
            Scripted::new("panic", Behavior::Panic),
            Scripted::new("ok", Behavior::Succeed),
            Scripted::new("stray", Behavior::WrongGoal),
        ];
        let out = run_detectives("g", &sources(), &collectors, Duration::from_secs(5)).await;
        assert_eq!(out.evidences.len(), 1);

        let mut skipped = out.skipped();
        skipped.sort_by(|a, b| a.collector.cmp(&b.collector));
        let summary: Vec<_> = skipped
            .iter()
            .map(|s| (s.collector.as_str(), s.reason))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("fail", SkipReason::Failed),
                ("panic", SkipReason::Panicked),
                ("stray", SkipReason::Failed),
            ]
        );
    }

    #[tokio::test]
    async fn all_failing_yields_empty_not_error() {
        let collectors = vec![
            Scripted::new("a", Behavior::Fail),
            Scripted::new("b", Behavior::Fail),
        ];
        let out = run_detectives("g", &sources(), &collectors, Duration::from_secs(1)).await;
        assert!(out.evidences.is_empty());
        assert_eq!(out.failures.len(), 2);

        let partial = out.into_partial("g");
        assert!(partial.contains_goal("g"));
        assert_eq!(partial.skipped.len(), 2);
    }

    #[tokio::test]
    async fn no_collectors_yields_empty_outcome() {
        let out = run_detectives("g", &sources(), &[], Duration::from_secs(1)).await;
        assert!(out.evidences.is_empty());
        assert!(out.failures.is_empty());
    }

    struct Gate {
        started: Arc<AtomicUsize>,
        expected: usize,
    }

    #[async_trait]
    impl Collector for Gate {
        fn name(&self) -> &'static str {
            "gate"
        }

        async fn collect(&self, goal: &str, _sources: &SourceSet) -> Result<Evidence, CollectorError> {
            self.started.fetch_add(1, Ordering::SeqCst);
            // Completes only once every sibling is running concurrently.
            while self.started.load(Ordering::SeqCst) < self.expected {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            Ok(Evidence::new(goal, true, None, "gate", "ok", 0.9)?)
        }
    }

    #[tokio::test]
    async fn collectors_run_concurrently() {
        let started = Arc::new(AtomicUsize::new(0));
        let collectors: Vec<Arc<dyn Collector>> = (0..2)
            .map(|_| {
                Arc::new(Gate {
                    started: Arc::clone(&started),
                    expected: 2,
                }) as Arc<dyn Collector>
            })
            .collect();
        let out = run_detectives("g", &sources(), &collectors, Duration::from_secs(5)).await;
        assert_eq!(out.evidences.len(), 2, "sequential execution would have timed out");
    }

    #[tokio::test]
    async fn runner_wraps_fixed_collector_set() {
        let runner = DetectiveRunner::new(
            vec![
                Arc::new(Scripted {
                    name: "slow",
                    behavior: Behavior::Succeed,
                    delay: Duration::from_millis(20),
                }) as Arc<dyn Collector>,
                Scripted::new("fast", Behavior::Succeed),
            ],
            Duration::from_secs(5),
        );
        let out = runner.run("g", &sources()).await;
        assert_eq!(out.evidences.len(), 2);
        assert!(out.evidences.iter().all(|e| e.goal == "g"));
    }
}
