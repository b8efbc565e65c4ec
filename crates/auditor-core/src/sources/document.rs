use std::path::{Path, PathBuf};

use crate::errors::AcquireError;

/// Handle to a readable report document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocHandle {
    path: PathBuf,
}

impl DocHandle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Check that `path` names a readable regular file.
pub async fn acquire_document(path: &Path) -> Result<DocHandle, AcquireError> {
    let unreadable = |detail: String| AcquireError::DocumentUnreadable {
        path: path.to_path_buf(),
        detail,
    };

    let meta = tokio::fs::metadata(path)
        .await
        .map_err(|e| unreadable(e.to_string()))?;
    if !meta.is_file() {
        return Err(unreadable("not a regular file".into()));
    }
    tokio::fs::File::open(path)
        .await
        .map_err(|e| unreadable(e.to_string()))?;

    Ok(DocHandle::new(path))
}
