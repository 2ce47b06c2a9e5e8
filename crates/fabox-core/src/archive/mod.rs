//! Bundle archive packing and extraction.
//!
//! Every bundle holds a single top-level directory, [`BUNDLE_ROOT`], with
//! the staged tree and its `version.txt` inside. Extraction strips that
//! directory so the contents land directly in the chosen staging path.

mod tar_gz;
mod zip_format;

use std::fs;
use std::path::{Component, Path, PathBuf};

use anyhow::Context;

use crate::types::ArchiveFormat;

/// Name of the top-level directory inside every bundle archive.
pub const BUNDLE_ROOT: &str = "new";

/// Pack `src_dir` into `dest` as `BUNDLE_ROOT/...`.
pub fn pack(format: ArchiveFormat, src_dir: &Path, dest: &Path) -> anyhow::Result<()> {
    match format {
        ArchiveFormat::TarGz => tar_gz::pack(src_dir, dest),
        ArchiveFormat::Zip => zip_format::pack(src_dir, dest),
    }
}

/// Extract `archive` into `dest`, stripping the bundle root directory.
///
/// `dest` must not exist yet.
pub fn unpack(format: ArchiveFormat, archive: &Path, dest: &Path) -> anyhow::Result<()> {
    if dest.exists() {
        anyhow::bail!("Extraction target already exists: {}", dest.display());
    }
    fs::create_dir_all(dest)
        .with_context(|| format!("Failed to create {}", dest.display()))?;
    match format {
        ArchiveFormat::TarGz => tar_gz::unpack(archive, dest),
        ArchiveFormat::Zip => zip_format::unpack(archive, dest),
    }
}

/// Map an archive entry path to its location below `dest`.
///
/// Returns `Ok(None)` for the bundle root itself. Entries outside the
/// bundle root, or escaping it, are rejected.
fn entry_target(dest: &Path, entry: &Path) -> anyhow::Result<Option<PathBuf>> {
    let mut components = entry
        .components()
        .filter(|c| !matches!(c, Component::CurDir));

    match components.next() {
        Some(Component::Normal(root)) if root == BUNDLE_ROOT => {}
        _ => anyhow::bail!(
            "Archive entry outside bundle root '{}': {}",
            BUNDLE_ROOT,
            entry.display()
        ),
    }

    let mut relative = PathBuf::new();
    for component in components {
        match component {
            Component::Normal(part) => relative.push(part),
            _ => anyhow::bail!("Unsafe archive entry path: {}", entry.display()),
        }
    }

    if relative.as_os_str().is_empty() {
        Ok(None)
    } else {
        Ok(Some(dest.join(relative)))
    }
}

/// Check that a symlink created at `target` points inside `dest`.
///
/// Absolute targets and targets that climb above `dest` are rejected. The
/// check is lexical; [`ensure_parent`] refuses to write through links.
fn check_link_target(dest: &Path, target: &Path, link: &Path) -> anyhow::Result<()> {
    let relative = target
        .strip_prefix(dest)
        .with_context(|| format!("Link outside extraction root: {}", target.display()))?;
    let mut depth = relative.components().count().saturating_sub(1);

    for component in link.components() {
        match component {
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
            Component::ParentDir if depth > 0 => depth -= 1,
            _ => anyhow::bail!(
                "Symlink {} escapes the bundle: {}",
                relative.display(),
                link.display()
            ),
        }
    }
    Ok(())
}

/// Create the parent directories of `target` below `dest`.
///
/// Fails if any existing path between `dest` and `target` (inclusive) is a
/// symlink, or if the parent resolves outside `dest`.
fn ensure_parent(dest: &Path, target: &Path) -> anyhow::Result<()> {
    let relative = target
        .strip_prefix(dest)
        .with_context(|| format!("Entry outside extraction root: {}", target.display()))?;

    let mut current = dest.to_path_buf();
    for component in relative.components() {
        current.push(component);
        match fs::symlink_metadata(&current) {
            Ok(metadata) if metadata.file_type().is_symlink() => anyhow::bail!(
                "Archive entry {} passes through a symlink",
                relative.display()
            ),
            Ok(_) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => break,
            Err(err) => {
                return Err(anyhow::Error::new(err)
                    .context(format!("Failed to read metadata: {}", current.display())));
            }
        }
    }

    let Some(parent) = target.parent() else {
        return Ok(());
    };
    fs::create_dir_all(parent)
        .with_context(|| format!("Failed to create parent directory {}", parent.display()))?;

    let root = dest
        .canonicalize()
        .with_context(|| format!("Failed to resolve {}", dest.display()))?;
    let resolved = parent
        .canonicalize()
        .with_context(|| format!("Failed to resolve {}", parent.display()))?;
    if !resolved.starts_with(&root) {
        anyhow::bail!("Archive entry {} escapes {}", relative.display(), dest.display());
    }
    Ok(())
}
