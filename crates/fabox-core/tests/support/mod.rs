//! Shared fixtures: a temp directory holding a source root, an archive
//! store and a deploy root, wired through an `AppContext`.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use fabox_core::config::FaboxConfig;
use fabox_core::context::AppContext;
use fabox_core::types::StepFailurePolicy;

pub fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create_dir_all should succeed in test temp dirs");
    }
    fs::write(path, content).expect("write should succeed in test temp dirs");
}

pub fn read_file(path: &Path) -> String {
    fs::read_to_string(path).expect("read should succeed in test temp dirs")
}

pub struct Workspace {
    pub temp: TempDir,
    pub ctx: AppContext,
}

impl Workspace {
    pub fn new() -> Self {
        Self::with_policy(StepFailurePolicy::Abort)
    }

    pub fn with_policy(policy: StepFailurePolicy) -> Self {
        let temp = TempDir::new().expect("tempdir should succeed");
        let config = FaboxConfig {
            archive_root: PathBuf::from("tag"),
            source_root: PathBuf::from("web"),
            deploy_root: PathBuf::from("www"),
            owner: None,
            group: None,
            mode: "775".to_string(),
            on_step_failure: policy,
            ..FaboxConfig::default()
        };
        let ctx = AppContext::new(config, temp.path()).expect("test config should validate");
        Self { temp, ctx }
    }

    pub fn source_dir(&self, product: &str) -> PathBuf {
        self.ctx.config().source_root.join(product)
    }

    pub fn archive_root(&self) -> &Path {
        &self.ctx.config().archive_root
    }

    pub fn deploy_root(&self) -> &Path {
        &self.ctx.config().deploy_root
    }

    /// Write `files` (relative path, content) into a product's source tree.
    pub fn add_product(&self, product: &str, files: &[(&str, &str)]) {
        let root = self.source_dir(product);
        fs::create_dir_all(&root).expect("create product dir should succeed");
        for (relative, content) in files {
            write_file(&root.join(relative), content);
        }
    }

    /// Rewrite one source file and build a bundle from the result.
    pub fn build(&self, product: &str, tag_name: &str, index: &str) -> fabox_core::bundle::Bundle {
        self.add_product(product, &[("index.html", index)]);
        self.ctx
            .builder()
            .build(product, tag_name)
            .expect("build should succeed")
            .bundle
    }

    pub fn live(&self, product: &str) -> PathBuf {
        self.deploy_root().join(product)
    }

    pub fn previous(&self, product: &str) -> PathBuf {
        self.deploy_root().join(format!("{product}_previous"))
    }

    pub fn rollback(&self, product: &str) -> PathBuf {
        self.deploy_root().join(format!("{product}_rollback"))
    }
}
