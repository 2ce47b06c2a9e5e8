//! Config store for loading and saving fabox.toml.

use std::path::{Path, PathBuf};

use anyhow::Context;

use super::{FaboxConfig, parser, paths::resolve_config_path};

#[derive(Debug, Clone)]
pub struct ConfigStore {
    config_path: PathBuf,
}

impl ConfigStore {
    /// Resolve the config path from the process environment.
    pub fn resolve(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let user_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        let working_dir = std::env::current_dir()?;

        Ok(Self::from_paths(explicit, &working_dir, &user_dir))
    }

    pub fn from_paths(explicit: Option<&Path>, working_dir: &Path, user_config_dir: &Path) -> Self {
        Self::from_path(resolve_config_path(explicit, working_dir, user_config_dir))
    }

    pub fn from_path(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn exists(&self) -> bool {
        self.config_path.exists()
    }

    pub fn load(&self) -> anyhow::Result<FaboxConfig> {
        if !self.config_path.exists() {
            return Ok(FaboxConfig::new());
        }
        parser::parse_fabox_toml(&self.config_path)
    }

    pub fn save(&self, config: &FaboxConfig) -> anyhow::Result<()> {
        let content = parser::to_toml(config)?;
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        std::fs::write(&self.config_path, content).with_context(|| {
            format!(
                "Failed to write config file: {}",
                self.config_path.display()
            )
        })?;
        Ok(())
    }
}
