//! Recursive ownership and mode normalization for deployed slots.

use std::path::Path;

use anyhow::Context;
use serde::Serialize;

/// Owner, group and mode applied to every entry of a deployed tree.
///
/// `owner`/`group` of `None` leave ownership untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionSpec {
    pub owner: Option<String>,
    pub group: Option<String>,
    pub mode: u32,
}

impl PermissionSpec {
    pub const DEFAULT_MODE: u32 = 0o775;

    pub fn new(owner: Option<String>, group: Option<String>, mode: u32) -> Self {
        Self { owner, group, mode }
    }

    /// Mode only, ownership untouched.
    pub fn mode_only(mode: u32) -> Self {
        Self::new(None, None, mode)
    }

    /// Parse an octal mode string such as `"775"` or `"0755"`.
    pub fn parse_mode(mode: &str) -> anyhow::Result<u32> {
        let digits = mode.trim();
        let digits = digits.strip_prefix("0o").unwrap_or(digits);
        let value = u32::from_str_radix(digits, 8)
            .with_context(|| format!("Invalid mode string: {mode}"))?;
        if value > 0o7777 {
            anyhow::bail!("Mode out of range: {mode}");
        }
        Ok(value)
    }

    /// Apply ownership and mode to `root` and everything below it.
    pub fn apply_recursive(&self, root: &Path) -> anyhow::Result<()> {
        let ids = self.resolve_ids()?;
        apply_tree(root, self.mode, ids)
    }

    #[cfg(unix)]
    fn resolve_ids(&self) -> anyhow::Result<(Option<u32>, Option<u32>)> {
        let uid = match &self.owner {
            Some(owner) => Some(
                nix::unistd::User::from_name(owner)
                    .with_context(|| format!("Failed to look up user: {owner}"))?
                    .ok_or_else(|| anyhow::anyhow!("Unknown user: {owner}"))?
                    .uid
                    .as_raw(),
            ),
            None => None,
        };
        let gid = match &self.group {
            Some(group) => Some(
                nix::unistd::Group::from_name(group)
                    .with_context(|| format!("Failed to look up group: {group}"))?
                    .ok_or_else(|| anyhow::anyhow!("Unknown group: {group}"))?
                    .gid
                    .as_raw(),
            ),
            None => None,
        };
        Ok((uid, gid))
    }

    #[cfg(not(unix))]
    fn resolve_ids(&self) -> anyhow::Result<(Option<u32>, Option<u32>)> {
        if self.owner.is_some() || self.group.is_some() {
            anyhow::bail!("Ownership changes are only supported on unix");
        }
        Ok((None, None))
    }
}

impl Default for PermissionSpec {
    fn default() -> Self {
        Self::mode_only(Self::DEFAULT_MODE)
    }
}

fn apply_tree(path: &Path, mode: u32, ids: (Option<u32>, Option<u32>)) -> anyhow::Result<()> {
    let metadata = std::fs::symlink_metadata(path)
        .with_context(|| format!("Failed to read metadata: {}", path.display()))?;

    apply_entry(path, metadata.file_type().is_symlink(), mode, ids)?;

    if metadata.is_dir() {
        for entry in std::fs::read_dir(path)
            .with_context(|| format!("Failed to read dir: {}", path.display()))?
        {
            let entry =
                entry.with_context(|| format!("Failed to read dir entry: {}", path.display()))?;
            apply_tree(&entry.path(), mode, ids)?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn apply_entry(
    path: &Path,
    is_symlink: bool,
    mode: u32,
    (uid, gid): (Option<u32>, Option<u32>),
) -> anyhow::Result<()> {
    use std::os::unix::fs::{PermissionsExt, chown, lchown};

    if uid.is_some() || gid.is_some() {
        let result = if is_symlink {
            lchown(path, uid, gid)
        } else {
            chown(path, uid, gid)
        };
        result.with_context(|| format!("Failed to set ownership on {}", path.display()))?;
    }

    // Symlink modes are not meaningful; chmod would follow the link.
    if !is_symlink {
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
            .with_context(|| format!("Failed to set permissions on {}", path.display()))?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn apply_entry(
    _path: &Path,
    _is_symlink: bool,
    _mode: u32,
    _ids: (Option<u32>, Option<u32>),
) -> anyhow::Result<()> {
    Ok(())
}
