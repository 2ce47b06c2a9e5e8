//! Bundle assembly: stage a product's source tree, stamp it, archive it.

pub mod stamp;

use std::path::PathBuf;

use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::{info, warn};

use crate::archive;
use crate::bundle::{Bundle, BundleStore, BundleTag};
use crate::catalog::ProductCatalog;
use crate::error::{BuildPhase, FaboxError, Result};
use crate::fs::{copy_tree, strip_named_dirs};
use crate::types::ArchiveFormat;

pub use stamp::{VERSION_FILE, VersionStamp};

/// Version-control and editor directories never shipped in a bundle.
pub const STRIPPED_DIRS: [&str; 2] = [".git", ".idea"];

#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub bundle: Bundle,
    pub archive: PathBuf,
    pub stamp: VersionStamp,
    /// Metadata directories removed from the staged tree.
    pub stripped: usize,
}

#[derive(Debug, Clone)]
pub struct BundleBuilder {
    catalog: ProductCatalog,
    store: BundleStore,
    format: ArchiveFormat,
    work_dir: Option<PathBuf>,
}

impl BundleBuilder {
    pub fn new(catalog: ProductCatalog, store: BundleStore, format: ArchiveFormat) -> Self {
        Self {
            catalog,
            store,
            format,
            work_dir: None,
        }
    }

    /// Stage under `dir` instead of the system temp directory.
    pub fn with_work_dir(mut self, dir: PathBuf) -> Self {
        self.work_dir = Some(dir);
        self
    }

    pub fn build(&self, product: &str, tag_name: &str) -> Result<BuildReport> {
        self.build_at(product, tag_name, Local::now())
    }

    /// Build with an explicit timestamp for the version stamp.
    pub fn build_at(
        &self,
        product: &str,
        tag_name: &str,
        built_at: DateTime<Local>,
    ) -> Result<BuildReport> {
        let tag = BundleTag::new(product, tag_name).map_err(|err| FaboxError::BuildFailure {
            phase: BuildPhase::Validate,
            message: err.to_string(),
        })?;
        let source = self.catalog.source_dir(product)?;
        info!(tag = %tag, source = %source.display(), "building bundle");

        // Dropped on every exit path, removing the staging area.
        let staging = self
            .staging_dir()
            .map_err(|err| FaboxError::build(BuildPhase::Stage, err))?;
        let stage_root = staging.path().join(archive::BUNDLE_ROOT);

        copy_tree(&source, &stage_root).map_err(|err| FaboxError::build(BuildPhase::Stage, err))?;

        let stripped = strip_named_dirs(&stage_root, &STRIPPED_DIRS)
            .map_err(|err| FaboxError::build(BuildPhase::Strip, err))?;

        let build = self.store.next_build(&tag).map_err(|err| match err {
            FaboxError::BuildFailure { .. } => err,
            other => FaboxError::BuildFailure {
                phase: BuildPhase::Number,
                message: other.to_string(),
            },
        })?;
        let bundle = Bundle::new(tag, build, self.format);

        let stamp = VersionStamp::new(&bundle.tag, bundle.build, &built_at);
        stamp
            .write_to_dir(&stage_root)
            .map_err(|err| FaboxError::build(BuildPhase::Stamp, err))?;

        let packed = staging.path().join(bundle.filename());
        archive::pack(self.format, &stage_root, &packed)
            .map_err(|err| FaboxError::build(BuildPhase::Archive, err))?;

        let archive = self
            .store
            .admit(&packed, &bundle)
            .map_err(|err| FaboxError::build(BuildPhase::Store, err))?;

        if let Err(err) = staging.close() {
            warn!("Failed to remove build staging area: {err}");
        }

        info!(bundle = %bundle, archive = %archive.display(), "bundle built");
        Ok(BuildReport {
            bundle,
            archive,
            stamp,
            stripped,
        })
    }

    fn staging_dir(&self) -> anyhow::Result<tempfile::TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(".fabox-build-");
        let dir = match &self.work_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir)?;
                builder.tempdir_in(dir)?
            }
            None => builder.tempdir()?,
        };
        Ok(dir)
    }
}
