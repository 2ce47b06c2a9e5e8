//! Filesystem operations used by the deploy and rollback engines.
//!
//! Engines never touch the slot directories directly; they go through a
//! [`FileOps`] so each step reports success or failure on its own and the
//! step-failure policy can be exercised with injected failures.

use std::fmt::Debug;
use std::path::Path;

use anyhow::Context;

use super::{PermissionSpec, remove_path_if_exists};
use crate::archive;
use crate::types::ArchiveFormat;

pub trait FileOps: Debug {
    /// Copy a single file, overwriting the destination.
    fn copy_file(&self, from: &Path, to: &Path) -> anyhow::Result<()>;

    /// Extract a bundle archive into a directory that must not exist yet.
    fn unpack(&self, format: ArchiveFormat, archive: &Path, dest: &Path) -> anyhow::Result<()>;

    /// Rename a file or directory within one filesystem.
    fn rename(&self, from: &Path, to: &Path) -> anyhow::Result<()>;

    /// Remove a file or directory tree; `Ok(false)` if it did not exist.
    fn remove(&self, path: &Path) -> anyhow::Result<bool>;

    /// Recursively apply ownership and mode.
    fn normalize(&self, path: &Path, spec: &PermissionSpec) -> anyhow::Result<()>;
}

/// [`FileOps`] against the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileOps;

impl FileOps for LocalFileOps {
    fn copy_file(&self, from: &Path, to: &Path) -> anyhow::Result<()> {
        std::fs::copy(from, to).with_context(|| {
            format!("Failed to copy {} to {}", from.display(), to.display())
        })?;
        Ok(())
    }

    fn unpack(&self, format: ArchiveFormat, archive: &Path, dest: &Path) -> anyhow::Result<()> {
        archive::unpack(format, archive, dest)
            .with_context(|| format!("Failed to extract {}", archive.display()))
    }

    fn rename(&self, from: &Path, to: &Path) -> anyhow::Result<()> {
        std::fs::rename(from, to).with_context(|| {
            format!("Failed to rename {} to {}", from.display(), to.display())
        })
    }

    fn remove(&self, path: &Path) -> anyhow::Result<bool> {
        remove_path_if_exists(path)
    }

    fn normalize(&self, path: &Path, spec: &PermissionSpec) -> anyhow::Result<()> {
        spec.apply_recursive(path)
            .with_context(|| format!("Failed to normalize {}", path.display()))
    }
}
