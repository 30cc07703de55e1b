//! Per-job workspace directories.
//!
//! Every job gets an exclusive, uniquely-named directory under the configured
//! output base. All per-job temporary files live inside it, so concurrent
//! jobs never collide and cleanup is a single recursive removal.

use std::path::{Path, PathBuf};

use crate::error::JobError;
use crate::models::ParseMethod;

/// An isolated directory owned by one job.
#[derive(Debug, Clone)]
pub struct JobWorkspace {
    id: String,
    root: PathBuf,
}

impl JobWorkspace {
    /// Create `base_dir/<uuid>` (and all parents).
    pub fn create(base_dir: &Path) -> Result<Self, JobError> {
        let id = uuid::Uuid::new_v4().to_string();
        let root = base_dir.join(&id);
        std::fs::create_dir_all(&root)?;
        Ok(Self { id, root })
    }

    /// Unique job identifier, also the directory name.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Per-document parse directory: `<root>/<doc_name>/<method>`.
    ///
    /// All artifacts for one document are written here; callers must pass a
    /// name that is safe as a path segment (see `utils::sanitize_filename`).
    pub fn doc_dir(&self, doc_name: &str, method: ParseMethod) -> PathBuf {
        self.root.join(doc_name).join(method.as_str())
    }

    /// Remove the workspace and everything in it.
    ///
    /// When `keep` is true (debugging), the directory is left in place.
    /// Removal failures are logged, not surfaced: by the time cleanup runs
    /// the job's result has already been produced or the job has already
    /// failed for another reason.
    pub fn dispose(&self, keep: bool) {
        if keep {
            return;
        }
        if let Err(e) = std::fs::remove_dir_all(&self.root) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(job_id = %self.id, error = %e, "failed to clean up workspace");
            }
        }
    }
}
