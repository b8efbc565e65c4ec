use async_trait::async_trait;
use auditor_evidence::{Evidence, EvidenceError};
use regex::Regex;
use std::sync::Arc;

use super::Collector;
use crate::errors::{CollectorError, ConfigError};
use crate::sources::SourceSet;
use crate::tools::{extract_paths_like, DocumentIngestor};

pub const DOC_FOUND_CONFIDENCE: f64 = 0.8;
pub const DOC_NOT_FOUND_CONFIDENCE: f64 = 0.2;

/// Cross-references from the report: repository paths it cites.
pub struct DocAnalyst {
    ingestor: Arc<dyn DocumentIngestor>,
    pattern: Regex,
}

impl DocAnalyst {
    pub const NAME: &'static str = "DocAnalyst";

    pub fn new(ingestor: Arc<dyn DocumentIngestor>, pattern: &str) -> Result<Self, ConfigError> {
        let pattern = Regex::new(pattern)
            .map_err(|e| ConfigError::Invalid(format!("path_pattern: {e}")))?;
        Ok(Self { ingestor, pattern })
    }
}

#[async_trait]
impl Collector for DocAnalyst {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn collect(&self, goal: &str, sources: &SourceSet) -> Result<Evidence, CollectorError> {
        let doc = sources
            .document
            .as_ref()
            .ok_or(CollectorError::SourceUnavailable {
                source_kind: "document",
            })?;

        let chunks = self.ingestor.ingest(doc).await;
        let paths = if chunks.is_empty() {
            Vec::new()
        } else {
            extract_paths_like(&chunks.join("\n"), &self.pattern)
        };

        tracing::debug!(goal, chunks = chunks.len(), paths = paths.len(), "document scanned");

        Ok(doc_evidence(goal, &doc.path().display().to_string(), &paths)?)
    }
}

/// `found = paths non-empty`; content is the `;`-joined path list.
pub fn doc_evidence(goal: &str, location: &str, paths: &[String]) -> Result<Evidence, EvidenceError> {
    let found = !paths.is_empty();
    Evidence::new(
        goal,
        found,
        found.then(|| paths.join(";")),
        location,
        format!("Extracted {} file paths from document", paths.len()),
        if found {
            DOC_FOUND_CONFIDENCE
        } else {
            DOC_NOT_FOUND_CONFIDENCE
        },
    )
}
