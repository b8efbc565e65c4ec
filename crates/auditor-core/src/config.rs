use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::ConfigError;

pub const DEFAULT_GOAL: &str = "git_forensic_analysis";

/// `src/<segments>.py`-shaped tokens.
pub const DEFAULT_PATH_PATTERN: &str = r"src/[\w/.\-]+\.py";

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct AuditConfig {
    /// Audit dimensions investigated in this run.
    pub goals: Vec<String>,

    /// Rubric file whose dimension ids replace `goals` when set.
    pub rubric: Option<PathBuf>,

    pub backend: BackendPreference,

    pub collector_timeout_secs: u64,
    pub clone_timeout_secs: u64,
    pub clone_depth: u32,

    /// Regex for path-like tokens extracted from the document.
    pub path_pattern: String,

    pub scan: ScanOptions,

    /// Maximum characters per ingested document chunk.
    pub document_chunk_chars: usize,

    /// Where the run artifact is written.
    pub output: PathBuf,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            goals: vec![DEFAULT_GOAL.to_string()],
            rubric: None,
            backend: BackendPreference::default(),
            collector_timeout_secs: 30,
            clone_timeout_secs: 60,
            clone_depth: 50,
            path_pattern: DEFAULT_PATH_PATTERN.to_string(),
            scan: ScanOptions::default(),
            document_chunk_chars: 1000,
            output: PathBuf::from("reports/interim_run.json"),
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BackendPreference {
    /// Graph engine when compiled in, Direct otherwise.
    #[default]
    Auto,
    Direct,
    Graph,
}

impl std::str::FromStr for BackendPreference {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "direct" => Ok(Self::Direct),
            "graph" | "graph_engine" | "graph-engine" => Ok(Self::Graph),
            other => Err(ConfigError::Invalid(format!(
                "unknown backend '{other}' (expected auto|direct|graph)"
            ))),
        }
    }
}

/// Bounds for the structural walk over a checked-out tree.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ScanOptions {
    pub max_files: usize,
    pub max_file_bytes: u64,
    /// Lowercase extensions, without the dot.
    pub extensions: Vec<String>,
    /// Directory names skipped wherever they appear.
    pub exclude_dirs: Vec<String>,
    /// Lines of context above and below an edge site.
    pub snippet_context: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            max_files: 50_000,
            max_file_bytes: 512 * 1024,
            extensions: vec!["py".to_string()],
            exclude_dirs: [
                ".git",
                "target",
                "node_modules",
                "__pycache__",
                ".venv",
                "venv",
                "build",
                "dist",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            snippet_context: 4,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Rubric {
    pub dimensions: Vec<RubricDimension>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct RubricDimension {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl Rubric {
    /// Parse a rubric from JSON or YAML (YAML is a superset, so one parser covers both).
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&raw).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })
    }

    /// Dimension ids, deduplicated in first-seen order.
    pub fn goal_ids(&self) -> Vec<String> {
        dedup_preserving_order(self.dimensions.iter().map(|d| d.id.clone()))
    }
}

impl AuditConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&raw).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })
    }

    /// Final goal list: rubric dimensions if a rubric is configured, else `goals`.
    pub fn resolve_goals(&self) -> Result<Vec<String>, ConfigError> {
        let goals = match &self.rubric {
            Some(path) => Rubric::load(path)?.goal_ids(),
            None => dedup_preserving_order(self.goals.iter().cloned()),
        };
        if goals.is_empty() {
            return Err(ConfigError::Invalid("no audit goals configured".into()));
        }
        if let Some(blank) = goals.iter().find(|g| g.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!("empty goal id: {blank:?}")));
        }
        Ok(goals)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validated_goals().map(drop)
    }

    /// Check every setting, then resolve the goal list. The rubric, if any,
    /// is read exactly once.
    pub fn validated_goals(&self) -> Result<Vec<String>, ConfigError> {
        self.validate_settings()?;
        self.resolve_goals()
    }

    /// Everything `validate` checks except the goal list.
    pub fn validate_settings(&self) -> Result<(), ConfigError> {
        if self.collector_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "collector_timeout_secs must be > 0".into(),
            ));
        }
        if self.clone_timeout_secs == 0 {
            return Err(ConfigError::Invalid("clone_timeout_secs must be > 0".into()));
        }
        if self.document_chunk_chars == 0 {
            return Err(ConfigError::Invalid(
                "document_chunk_chars must be > 0".into(),
            ));
        }
        regex::Regex::new(&self.path_pattern).map_err(|e| {
            ConfigError::Invalid(format!("path_pattern is not a valid regex: {e}"))
        })?;
        Ok(())
    }

    pub fn collector_timeout(&self) -> Duration {
        Duration::from_secs(self.collector_timeout_secs)
    }

    pub fn clone_timeout(&self) -> Duration {
        Duration::from_secs(self.clone_timeout_secs)
    }
}

pub(crate) fn dedup_preserving_order<I: IntoIterator<Item = String>>(items: I) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}
