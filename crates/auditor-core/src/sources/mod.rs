//! Source handles acquired once per run, before any goal fans out.

pub mod document;
pub mod repo;

pub use document::{acquire_document, DocHandle};
pub use repo::{acquire_repository, CloneOptions, RepoHandle};

/// Both data sources of a run. Either may be missing after a failed
/// acquisition; collectors reading a missing source fail individually.
#[derive(Debug, Default)]
pub struct SourceSet {
    pub repository: Option<RepoHandle>,
    pub document: Option<DocHandle>,
}

impl SourceSet {
    pub fn new(repository: Option<RepoHandle>, document: Option<DocHandle>) -> Self {
        Self {
            repository,
            document,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.repository.is_none() && self.document.is_none()
    }
}
