//! Commit history of a checkout, via the `git` binary.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use crate::sources::RepoHandle;

const LOG_FORMAT: &str = "--pretty=format:%H|%cI|%s";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Commit {
    pub hash: String,
    /// Committer date, strict ISO 8601.
    pub timestamp: String,
    pub message: String,
}

/// Source of commit records for a repository handle.
#[async_trait]
pub trait CommitHistory: Send + Sync {
    /// Oldest-first commits; empty on any git-level failure.
    async fn commits(&self, repo: &RepoHandle) -> Vec<Commit>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct GitHistory;

#[async_trait]
impl CommitHistory for GitHistory {
    async fn commits(&self, repo: &RepoHandle) -> Vec<Commit> {
        extract_commits(repo.root()).await
    }
}

pub async fn extract_commits(root: &Path) -> Vec<Commit> {
    let output = Command::new("git")
        .args(["log", LOG_FORMAT, "--reverse"])
        .current_dir(root)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await;

    match output {
        Ok(out) if out.status.success() => parse_log(&String::from_utf8_lossy(&out.stdout)),
        Ok(out) => {
            tracing::debug!(
                root = %root.display(),
                status = ?out.status.code(),
                "git log returned non-zero; treating history as empty"
            );
            Vec::new()
        }
        Err(e) => {
            tracing::debug!(root = %root.display(), error = %e, "git log could not run");
            Vec::new()
        }
    }
}

/// Parse `hash|timestamp|subject` lines. The subject may itself contain `|`.
pub fn parse_log(stdout: &str) -> Vec<Commit> {
    stdout
        .lines()
        .filter_map(|line| {
            let mut parts = line.splitn(3, '|');
            match (parts.next(), parts.next(), parts.next()) {
                (Some(hash), Some(timestamp), Some(message)) if !hash.is_empty() => Some(Commit {
                    hash: hash.to_string(),
                    timestamp: timestamp.to_string(),
                    message: message.to_string(),
                }),
                _ => None,
            }
        })
        .collect()
}
