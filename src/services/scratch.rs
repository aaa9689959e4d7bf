use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;

/// Per-run scratch directory.
///
/// Every pipeline run stages its intermediate files inside a unique
/// directory, so concurrent invocations sharing a scratch root cannot
/// collide on derived file names. The orchestrator calls `cleanup` on
/// every exit path; each registered file is deleted exactly once.
pub struct ScratchSpace {
    dir: PathBuf,
    files: Vec<PathBuf>,
}

impl ScratchSpace {
    pub async fn create(root: &Path) -> std::io::Result<Self> {
        let dir = root.join(Uuid::new_v4().to_string());
        tokio::fs::create_dir_all(&dir).await?;
        debug!(dir = %dir.display(), "scratch directory created");

        Ok(Self {
            dir,
            files: Vec::new(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Reserve a path for a new scratch file and register it for cleanup.
    pub fn register(&mut self, file_name: &str) -> PathBuf {
        let path = self.dir.join(file_name);
        self.files.push(path.clone());
        path
    }

    /// Remove every registered file, then the run directory. Best-effort:
    /// failures are logged and swallowed.
    pub async fn cleanup(mut self) {
        for path in self.files.drain(..) {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => debug!(path = %path.display(), "scratch file removed"),
                // Registered but never created, nothing to do
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to remove scratch file"
                ),
            }
        }

        if let Err(e) = tokio::fs::remove_dir(&self.dir).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(
                    dir = %self.dir.display(),
                    error = %e,
                    "failed to remove scratch directory"
                );
            }
        }
    }
}
