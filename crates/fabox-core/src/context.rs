//! Application context for unified dependency injection.

use std::path::Path;

use crate::build::BundleBuilder;
use crate::bundle::BundleStore;
use crate::catalog::ProductCatalog;
use crate::config::FaboxConfig;
use crate::deploy::{DeployEngine, DeployedVersions, RollbackEngine, SlotLayout};
use crate::error::{FaboxError, Result};

/// Every component, wired from one validated configuration.
///
/// Frontends create this once and pass it to commands.
#[derive(Debug, Clone)]
pub struct AppContext {
    config: FaboxConfig,
}

impl AppContext {
    /// Validate `config` and resolve its relative roots against `base_dir`.
    pub fn new(config: FaboxConfig, base_dir: &Path) -> Result<Self> {
        config
            .validate()
            .map_err(|err| FaboxError::Config(format!("{err:#}")))?;
        Ok(Self {
            config: config.resolved(base_dir),
        })
    }

    pub fn config(&self) -> &FaboxConfig {
        &self.config
    }

    pub fn catalog(&self) -> ProductCatalog {
        ProductCatalog::new(self.config.source_root.clone())
    }

    pub fn bundle_store(&self) -> BundleStore {
        BundleStore::new(self.config.archive_root.clone())
    }

    pub fn slot_layout(&self) -> SlotLayout {
        SlotLayout::new(self.config.deploy_root.clone())
    }

    pub fn builder(&self) -> BundleBuilder {
        BundleBuilder::new(self.catalog(), self.bundle_store(), self.config.format)
    }

    pub fn deploy_engine(&self) -> Result<DeployEngine> {
        let permissions = self
            .config
            .permission_spec()
            .map_err(|err| FaboxError::Config(format!("{err:#}")))?;
        Ok(DeployEngine::new(
            self.bundle_store(),
            self.slot_layout(),
            permissions,
            self.config.on_step_failure,
        ))
    }

    pub fn rollback_engine(&self) -> RollbackEngine {
        RollbackEngine::new(self.slot_layout())
    }

    pub fn deployed_versions(&self) -> DeployedVersions {
        DeployedVersions::new(self.slot_layout())
    }
}
