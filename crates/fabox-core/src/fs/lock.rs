//! Per-product exclusive lock around slot mutations.
//!
//! Deploy and rollback both rename directories in the slot triple of a
//! product. The lock file `<deploy_root>/.<product>.lock` is held with
//! `flock(LOCK_EX)` for the whole mutation and released on drop.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use anyhow::Context;
use fs2::FileExt;
use tracing::debug;

#[derive(Debug)]
pub struct SlotLock {
    /// Kept open to hold the lock.
    file: File,
    path: PathBuf,
}

impl SlotLock {
    /// Take the lock without blocking; fails if another run holds it.
    pub fn acquire(path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)
            .with_context(|| format!("Failed to open lock file: {}", path.display()))?;

        file.try_lock_exclusive().with_context(|| {
            format!(
                "Another deploy or rollback holds the lock {}",
                path.display()
            )
        })?;

        debug!(lock = %path.display(), "acquired slot lock");
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for SlotLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
        debug!(lock = %self.path.display(), "released slot lock");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_fails_while_held() {
        let tmp = tempfile::TempDir::new().expect("tempdir should succeed");
        let path = tmp.path().join(".site.lock");

        let held = SlotLock::acquire(&path).expect("first acquire should succeed");
        let err = SlotLock::acquire(&path).expect_err("second acquire should fail");
        assert!(err.to_string().contains("holds the lock"));

        drop(held);
        SlotLock::acquire(&path).expect("acquire after release should succeed");
    }
}
