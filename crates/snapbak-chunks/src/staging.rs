//! Run-scoped staging directory with guaranteed removal

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use snapbak_core::{BackupError, BackupResult};

/// A working directory owned by exactly one run.
///
/// Created destructively: any directory already at the target path is
/// removed first, so a rerun never mixes its chunks with leftovers. The
/// directory and everything staged in it (plaintext snapshot, ciphertext
/// chunks) is removed again when the guard drops, on success and failure
/// alike; `retain()` keeps it for inspection.
#[derive(Debug)]
pub struct StagingDir {
    path: PathBuf,
    retain: bool,
}

impl StagingDir {
    pub fn create(root: &Path, name: &str) -> BackupResult<Self> {
        let path = root.join(name);
        if path.is_dir() {
            fs::remove_dir_all(&path).map_err(|e| {
                BackupError::LocalIo(format!("clearing staging {}: {e}", path.display()))
            })?;
        }
        fs::create_dir_all(&path).map_err(|e| {
            BackupError::LocalIo(format!("creating staging {}: {e}", path.display()))
        })?;
        debug!(path = %path.display(), "staging directory ready");
        Ok(Self {
            path,
            retain: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Give up ownership: the directory survives the guard.
    pub fn retain(mut self) -> PathBuf {
        self.retain = true;
        self.path.clone()
    }
}

impl Drop for StagingDir {
    fn drop(&mut self) {
        if self.retain {
            return;
        }
        if let Err(e) = fs::remove_dir_all(&self.path) {
            if self.path.exists() {
                warn!(path = %self.path.display(), error = %e, "failed to remove staging directory");
            }
        }
    }
}
