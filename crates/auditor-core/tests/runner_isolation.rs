mod common;

use async_trait::async_trait;
use auditor_core::engine::run_detectives;
use auditor_core::errors::CollectorError;
use auditor_core::sources::{DocHandle, RepoHandle, SourceSet};
use auditor_core::Collector;
use auditor_evidence::{Evidence, SkipReason};
use common::scenario_collectors;
use std::sync::Arc;
use std::time::Duration;

struct Stalls;

#[async_trait]
impl Collector for Stalls {
    fn name(&self) -> &'static str {
        "Stalls"
    }

    async fn collect(&self, _goal: &str, _sources: &SourceSet) -> Result<Evidence, CollectorError> {
        tokio::time::sleep(Duration::from_secs(600)).await;
        Err(CollectorError::Extraction("woke up".into()))
    }
}

#[tokio::test]
async fn one_stalled_collector_leaves_the_other_result_intact() {
    let repo = tempfile::tempdir().unwrap();
    let doc_dir = tempfile::tempdir().unwrap();
    let doc = doc_dir.path().join("report.md");
    std::fs::write(&doc, "# Report\nsrc/nodes.py holds the nodes.\n").unwrap();

    let sources = Arc::new(SourceSet::new(
        Some(RepoHandle::local(repo.path())),
        Some(DocHandle::new(&doc)),
    ));
    let doc_analyst = Arc::clone(&scenario_collectors()[1]);
    let collectors: Vec<Arc<dyn Collector>> = vec![Arc::new(Stalls), doc_analyst];

    let started = std::time::Instant::now();
    let out = run_detectives("g", &sources, &collectors, Duration::from_millis(200)).await;

    assert!(started.elapsed() < Duration::from_secs(30));
    assert_eq!(out.evidences.len(), 1);
    assert_eq!(out.evidences[0].content.as_deref(), Some("src/nodes.py"));

    let skipped = out.skipped();
    assert_eq!(skipped.len(), 1);
    assert_eq!(skipped[0].collector, "Stalls");
    assert_eq!(skipped[0].reason, SkipReason::Timeout);
}
