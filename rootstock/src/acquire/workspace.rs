//! Per-attempt extraction scratch directories.
//!
//! Every extraction attempt gets its own uniquely-named directory under the
//! staging area, and the directory is removed on every exit path; dropping
//! the handle releases the directory whether the attempt succeeded, found
//! nothing, or returned early through `?`.

use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};

use super::error::{AcquireError, AcquireResult};

/// Monotonic sequence so concurrent attempts in one process never collide.
static WORKSPACE_SEQ: AtomicU64 = AtomicU64::new(0);

/// Scratch directory owned by a single extraction attempt.
#[derive(Debug)]
pub struct ExtractionWorkspace {
    root: PathBuf,
}

impl ExtractionWorkspace {
    /// Create a fresh workspace under `staging_dir`.
    pub fn create(staging_dir: &Path) -> AcquireResult<Self> {
        let seq = WORKSPACE_SEQ.fetch_add(1, Ordering::SeqCst);
        let root = staging_dir.join(format!("extract-{}-{}", process::id(), seq));

        fs::create_dir_all(&root).map_err(|e| AcquireError::CreateDirFailed {
            path: root.clone(),
            source: e,
        })?;

        Ok(Self { root })
    }

    /// Path of the workspace directory.
    pub fn path(&self) -> &Path {
        &self.root
    }
}

impl Drop for ExtractionWorkspace {
    fn drop(&mut self) {
        // Best effort; a leftover directory must never abort the pipeline.
        fs::remove_dir_all(&self.root).ok();
    }
}
