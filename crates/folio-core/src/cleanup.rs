use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::TempDir;
use tracing::{error, warn};

use crate::error::FolioError;

/// How hard to try when removing scratch files that another process
/// (virus scanner, indexer, a viewer) may still hold open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            backoff: Duration::from_millis(500),
        }
    }
}

/// Remove a directory tree, retrying with a fixed backoff.
///
/// A missing directory counts as removed. Returns `false` if every
/// attempt failed.
pub fn remove_dir_with_retry(path: &Path, policy: RetryPolicy) -> bool {
    retry(path, policy, |p| std::fs::remove_dir_all(p))
}

pub fn remove_file_with_retry(path: &Path, policy: RetryPolicy) -> bool {
    retry(path, policy, |p| std::fs::remove_file(p))
}

fn retry(path: &Path, policy: RetryPolicy, op: impl Fn(&Path) -> std::io::Result<()>) -> bool {
    let attempts = policy.attempts.max(1);
    for attempt in 1..=attempts {
        if !path.exists() {
            return true;
        }
        match op(path) {
            Ok(()) => return true,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return true,
            Err(e) => {
                warn!(path = %path.display(), attempt, "delete attempt failed: {e}");
                if attempt < attempts {
                    std::thread::sleep(policy.backoff);
                }
            }
        }
    }
    error!(path = %path.display(), "failed to delete after {attempts} attempts");
    false
}

/// A temporary directory removed with [`remove_dir_with_retry`] when dropped.
#[derive(Debug)]
pub struct ScratchDir {
    dir: TempDir,
    policy: RetryPolicy,
}

impl ScratchDir {
    pub fn new(prefix: &str, policy: RetryPolicy) -> Result<Self, FolioError> {
        let dir = tempfile::Builder::new().prefix(prefix).tempdir()?;
        Ok(Self { dir, policy })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn join(&self, name: impl AsRef<Path>) -> PathBuf {
        self.dir.path().join(name)
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        remove_dir_with_retry(self.dir.path(), self.policy);
    }
}
