//! Adapters around the primitive fact extractors: commit history,
//! structural scan, document text and path tokens.

pub mod document;
pub mod git;
pub mod paths;
pub mod structure;

pub use document::{chunk_text, ingest_document, DocumentIngestor, FileIngestor};
pub use git::{extract_commits, Commit, CommitHistory, GitHistory};
pub use paths::extract_paths_like;
pub use structure::{scan_for_marker, EdgeSite, MarkerScan, MarkerScanner, SourceTreeScanner};
