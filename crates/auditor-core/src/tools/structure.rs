//! Structural scan of a checked-out tree for orchestration-graph constructs.
//!
//! The walk is bounded (`max_files`, `max_file_bytes`, directory skip-list)
//! and each file is parsed in isolation: an unreadable or syntactically
//! broken file is counted and skipped without affecting its siblings.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use tree_sitter::{Node, Parser};
use walkdir::WalkDir;

use crate::config::ScanOptions;
use crate::errors::CollectorError;
use crate::sources::RepoHandle;

/// Identifier whose presence marks a state-graph construct.
pub const MARKER_IDENT: &str = "StateGraph";

/// Callee name of graph edge declarations.
pub const EDGE_CALL: &str = "add_edge";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EdgeSite {
    /// Path relative to the scanned root.
    pub file: String,
    /// 1-based line of the call.
    pub line: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MarkerScan {
    pub marker_found: bool,
    pub edge_sites: Vec<EdgeSite>,
    /// Source excerpt around each edge site, in the same order.
    pub snippets: Vec<String>,
    pub files_scanned: usize,
    pub files_skipped: usize,
}

#[async_trait]
pub trait MarkerScanner: Send + Sync {
    async fn scan(&self, repo: &RepoHandle) -> Result<MarkerScan, CollectorError>;
}

/// Tree-sitter backed scanner for Python sources.
#[derive(Debug, Clone, Default)]
pub struct SourceTreeScanner {
    options: ScanOptions,
}

impl SourceTreeScanner {
    pub fn new(options: ScanOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl MarkerScanner for SourceTreeScanner {
    async fn scan(&self, repo: &RepoHandle) -> Result<MarkerScan, CollectorError> {
        let root = repo.root().to_path_buf();
        let options = self.options.clone();
        tokio::task::spawn_blocking(move || scan_for_marker(&root, &options))
            .await
            .map_err(|e| CollectorError::Panicked(e.to_string()))
    }
}

/// Walk `root` and report marker presence, edge sites and snippets.
pub fn scan_for_marker(root: &Path, options: &ScanOptions) -> MarkerScan {
    let mut scan = MarkerScan::default();

    let mut parser = Parser::new();
    if let Err(e) = parser.set_language(&tree_sitter_python::LANGUAGE.into()) {
        tracing::warn!(error = %e, "python grammar unavailable; structural scan skipped");
        return scan;
    }

    let include: BTreeSet<String> = options
        .extensions
        .iter()
        .map(|e| e.to_ascii_lowercase())
        .collect();
    let exclude: BTreeSet<&str> = options.exclude_dirs.iter().map(String::as_str).collect();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            if entry.depth() == 0 || !entry.file_type().is_dir() {
                return true;
            }
            let name = entry.file_name().to_string_lossy();
            !exclude.contains(name.as_ref())
        });

    for entry in walker {
        let Ok(entry) = entry else { continue };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let ext = match path.extension().and_then(|e| e.to_str()) {
            Some(e) => e.to_ascii_lowercase(),
            None => continue,
        };
        if !include.contains(&ext) {
            continue;
        }

        if scan.files_scanned + scan.files_skipped >= options.max_files {
            tracing::debug!(max_files = options.max_files, "scan file cap reached");
            break;
        }

        let too_large = entry
            .metadata()
            .map(|m| m.len() > options.max_file_bytes)
            .unwrap_or(true);
        if too_large {
            scan.files_skipped += 1;
            continue;
        }

        let rel = path
            .strip_prefix(root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/");

        let Ok(src) = std::fs::read_to_string(path) else {
            tracing::debug!(file = %rel, "skipping unreadable file");
            scan.files_skipped += 1;
            continue;
        };

        match scan_source(&mut parser, &src) {
            Some(file_scan) => {
                scan.files_scanned += 1;
                scan.marker_found |= file_scan.marker_found;
                for line in file_scan.edge_lines {
                    scan.snippets
                        .push(extract_snippet(&src, line, options.snippet_context));
                    scan.edge_sites.push(EdgeSite {
                        file: rel.clone(),
                        line,
                    });
                }
            }
            None => {
                tracing::debug!(file = %rel, "skipping file with syntax errors");
                scan.files_skipped += 1;
            }
        }
    }

    scan
}

struct FileScan {
    marker_found: bool,
    edge_lines: Vec<usize>,
}

/// `None` when the source does not parse cleanly.
fn scan_source(parser: &mut Parser, src: &str) -> Option<FileScan> {
    let tree = parser.parse(src, None)?;
    let root = tree.root_node();
    if root.has_error() {
        return None;
    }

    let bytes = src.as_bytes();
    let mut result = FileScan {
        marker_found: false,
        edge_lines: Vec::new(),
    };

    let mut cursor = tree.walk();
    'walk: loop {
        inspect(cursor.node(), bytes, &mut result);

        if cursor.goto_first_child() {
            continue;
        }
        while !cursor.goto_next_sibling() {
            if !cursor.goto_parent() {
                break 'walk;
            }
        }
    }

    Some(result)
}

fn inspect(node: Node<'_>, src: &[u8], out: &mut FileScan) {
    match node.kind() {
        "identifier" => {
            if node.utf8_text(src) == Ok(MARKER_IDENT) {
                out.marker_found = true;
            }
        }
        "call" => {
            if callee_name(node, src) == Some(EDGE_CALL) {
                out.edge_lines.push(node.start_position().row + 1);
            }
        }
        _ => {}
    }
}

/// `f(...)` -> `f`, `obj.f(...)` -> `f`.
fn callee_name<'a>(call: Node<'_>, src: &'a [u8]) -> Option<&'a str> {
    let func = call.child_by_field_name("function")?;
    match func.kind() {
        "identifier" => func.utf8_text(src).ok(),
        "attribute" => func.child_by_field_name("attribute")?.utf8_text(src).ok(),
        _ => None,
    }
}

/// Lines `[line - context - 1, line + context)` of `src` (0-based, clamped).
pub fn extract_snippet(src: &str, line: usize, context: usize) -> String {
    let lines: Vec<&str> = src.lines().collect();
    let start = line.saturating_sub(context + 1);
    let end = (line + context).min(lines.len());
    if start >= end {
        return String::new();
    }
    lines[start..end].join("\n")
}
