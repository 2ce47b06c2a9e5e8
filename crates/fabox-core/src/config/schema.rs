//! Configuration schema for fabox.toml
//!
//! Every field has a default, so an empty file (or no file at all) is a
//! valid configuration.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::fs::PermissionSpec;
use crate::types::{ArchiveFormat, StepFailurePolicy};

/// Root configuration structure for fabox.toml
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FaboxConfig {
    /// Bundle store directory
    pub archive_root: PathBuf,

    /// Directory whose subdirectories are the products
    pub source_root: PathBuf,

    /// Directory holding the live/previous/rollback slots
    pub deploy_root: PathBuf,

    /// Owner of deployed files; omit to leave ownership untouched
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    /// Group of deployed files; omit to leave ownership untouched
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,

    /// Octal mode applied to deployed files and directories
    pub mode: String,

    /// Archive format written by new builds
    pub format: ArchiveFormat,

    /// What a failing slot mutation step does to the rest of a deploy
    pub on_step_failure: StepFailurePolicy,
}

impl Default for FaboxConfig {
    fn default() -> Self {
        Self {
            archive_root: PathBuf::from("Dropbox/tag"),
            source_root: PathBuf::from("Dropbox/web"),
            deploy_root: PathBuf::from("/var/www"),
            owner: Some("www-data".to_string()),
            group: Some("www-data".to_string()),
            mode: "775".to_string(),
            format: ArchiveFormat::default(),
            on_step_failure: StepFailurePolicy::default(),
        }
    }
}

impl FaboxConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, path) in [
            ("archive_root", &self.archive_root),
            ("source_root", &self.source_root),
            ("deploy_root", &self.deploy_root),
        ] {
            if path.as_os_str().is_empty() {
                anyhow::bail!("'{name}' must not be empty");
            }
        }
        if self.archive_root == self.deploy_root {
            anyhow::bail!("'archive_root' and 'deploy_root' must differ");
        }
        for (name, value) in [("owner", &self.owner), ("group", &self.group)] {
            if let Some(value) = value
                && value.trim().is_empty()
            {
                anyhow::bail!("'{name}' must not be blank; omit it to skip ownership changes");
            }
        }
        PermissionSpec::parse_mode(&self.mode).context("Invalid 'mode'")?;
        Ok(())
    }

    /// Ownership and mode applied after each deploy.
    pub fn permission_spec(&self) -> anyhow::Result<PermissionSpec> {
        Ok(PermissionSpec::new(
            self.owner.clone(),
            self.group.clone(),
            PermissionSpec::parse_mode(&self.mode)?,
        ))
    }

    /// Resolve relative roots against `base`.
    pub fn resolved(mut self, base: &Path) -> Self {
        for path in [
            &mut self.archive_root,
            &mut self.source_root,
            &mut self.deploy_root,
        ] {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = FaboxConfig::new();
        config.validate().expect("defaults should validate");
        assert_eq!(
            config.permission_spec().expect("mode"),
            PermissionSpec::new(Some("www-data".into()), Some("www-data".into()), 0o775)
        );
    }

    #[test]
    fn rejects_bad_mode_and_blank_owner() {
        let mut config = FaboxConfig::new();
        config.mode = "999".to_string();
        assert!(config.validate().is_err());

        let mut config = FaboxConfig::new();
        config.owner = Some(" ".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn resolves_relative_roots_only() {
        let config = FaboxConfig::new().resolved(Path::new("/home/deploy"));
        assert_eq!(config.archive_root, Path::new("/home/deploy/Dropbox/tag"));
        assert_eq!(config.source_root, Path::new("/home/deploy/Dropbox/web"));
        assert_eq!(config.deploy_root, Path::new("/var/www"));
    }
}
