//! Swap a bundle into a product's live slot.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use super::layout::SlotLayout;
use crate::bundle::{Bundle, BundleStore};
use crate::error::{DeployPhase, FaboxError, NotFoundKind, Result};
use crate::fs::{FileOps, LocalFileOps, PermissionSpec};
use crate::types::{Slot, StepFailurePolicy};

#[derive(Debug, Clone, Serialize)]
pub struct DeployReport {
    pub bundle: Bundle,
    pub product: String,
    pub live: PathBuf,
    /// False when promotion failed under [`StepFailurePolicy::Warn`]; `live`
    /// then still holds the old slot, or nothing.
    pub promoted: bool,
    /// Where the replaced live slot went, if there was one.
    pub previous: Option<PathBuf>,
    /// Steps that failed under [`StepFailurePolicy::Warn`].
    pub warnings: Vec<String>,
}

#[derive(Debug)]
pub struct DeployEngine {
    store: BundleStore,
    layout: SlotLayout,
    permissions: PermissionSpec,
    policy: StepFailurePolicy,
    ops: Box<dyn FileOps>,
}

impl DeployEngine {
    pub fn new(
        store: BundleStore,
        layout: SlotLayout,
        permissions: PermissionSpec,
        policy: StepFailurePolicy,
    ) -> Self {
        Self {
            store,
            layout,
            permissions,
            policy,
            ops: Box::new(LocalFileOps),
        }
    }

    /// Replace the filesystem collaborator.
    pub fn with_ops(mut self, ops: Box<dyn FileOps>) -> Self {
        self.ops = ops;
        self
    }

    /// Deploy `bundle` to `<deploy_root>/<product>`.
    ///
    /// Copy and extraction happen before any slot is touched and always
    /// fail fast. The slot mutations that follow obey the step policy:
    /// `Abort` stops at the first failure, `Warn` records it and carries on,
    /// which can leave the slot triple half migrated.
    pub fn deploy(&self, bundle: &Bundle) -> Result<DeployReport> {
        let product = bundle.product();
        let source = self.store.archive_path(bundle);
        if !source.is_file() {
            return Err(FaboxError::DeployFailure {
                phase: DeployPhase::Copy,
                message: FaboxError::not_found(NotFoundKind::Bundle, bundle.filename())
                    .to_string(),
            });
        }

        std::fs::create_dir_all(self.layout.root()).map_err(|err| {
            FaboxError::deploy(
                DeployPhase::Copy,
                anyhow::Error::new(err).context(format!(
                    "Failed to create deploy root {}",
                    self.layout.root().display()
                )),
            )
        })?;

        let _lock = self
            .layout
            .lock(product)
            .map_err(|err| FaboxError::deploy(DeployPhase::Lock, err))?;

        info!(bundle = %bundle, product, root = %self.layout.root().display(), "deploying");

        let copied = self.layout.archive_copy(bundle);
        let staging = self.layout.staging(product);
        self.stage(bundle, &source, &copied, &staging)?;

        let live = self.layout.slot(product, Slot::Live);
        let previous = self.layout.slot(product, Slot::Previous);
        let mut steps = StepRunner::new(self.policy);

        let (demoted, promoted) =
            match self.swap(&mut steps, product, &staging, &live, &previous) {
                Ok(outcome) => outcome,
                Err(err) => {
                    self.discard(&staging);
                    self.discard(&copied);
                    return Err(err);
                }
            };

        steps.run(DeployPhase::Cleanup, || self.ops.remove(&copied).map(|_| ()))?;
        if promoted {
            steps.run(DeployPhase::Permissions, || {
                self.ops.normalize(&live, &self.permissions)
            })?;
        }

        if promoted {
            info!(bundle = %bundle, live = %live.display(), "deploy complete");
        } else {
            warn!(bundle = %bundle, staging = %staging.display(), "bundle staged but not promoted");
        }
        Ok(DeployReport {
            bundle: bundle.clone(),
            product: product.to_string(),
            live,
            promoted,
            previous: demoted.then_some(previous),
            warnings: steps.into_warnings(),
        })
    }

    /// Discard `previous`, demote `live` and promote `staging`. Returns
    /// whether a live slot was demoted and whether staging was promoted.
    fn swap(
        &self,
        steps: &mut StepRunner,
        product: &str,
        staging: &Path,
        live: &Path,
        previous: &Path,
    ) -> Result<(bool, bool)> {
        steps.run(DeployPhase::DiscardPrevious, || {
            self.ops.remove(previous).map(|_| ())
        })?;

        let demoted = if live.exists() {
            steps.run(DeployPhase::DemoteLive, || self.ops.rename(live, previous))?
        } else {
            info!(product, "first deploy, no live slot to demote");
            false
        };

        match steps.run(DeployPhase::Promote, || self.ops.rename(staging, live)) {
            Ok(promoted) => Ok((demoted, promoted)),
            Err(err) => {
                if demoted && !live.exists() {
                    match self.ops.rename(previous, live) {
                        Ok(()) => warn!(product, "promotion failed, restored the demoted slot"),
                        Err(restore) => {
                            warn!(product, "failed to restore demoted slot: {restore:#}")
                        }
                    }
                }
                Err(err)
            }
        }
    }

    /// Copy the archive next to the slots and extract it to `staging`.
    fn stage(
        &self,
        bundle: &Bundle,
        source: &Path,
        copied: &Path,
        staging: &Path,
    ) -> Result<()> {
        if self
            .ops
            .remove(staging)
            .map_err(|err| FaboxError::deploy(DeployPhase::Extract, err))?
        {
            warn!(staging = %staging.display(), "removed stale staging directory");
        }

        self.ops
            .copy_file(source, copied)
            .map_err(|err| FaboxError::deploy(DeployPhase::Copy, err))?;

        if let Err(err) = self.ops.unpack(bundle.format, copied, staging) {
            self.discard(staging);
            self.discard(copied);
            return Err(FaboxError::deploy(DeployPhase::Extract, err));
        }
        Ok(())
    }

    fn discard(&self, path: &Path) {
        if let Err(err) = self.ops.remove(path) {
            warn!(path = %path.display(), "cleanup failed: {err:#}");
        }
    }
}

/// Runs slot mutation steps under a [`StepFailurePolicy`].
struct StepRunner {
    policy: StepFailurePolicy,
    warnings: Vec<String>,
}

impl StepRunner {
    fn new(policy: StepFailurePolicy) -> Self {
        Self {
            policy,
            warnings: Vec::new(),
        }
    }

    /// `Ok(true)` when the step ran, `Ok(false)` when it failed and was
    /// tolerated.
    fn run(
        &mut self,
        phase: DeployPhase,
        step: impl FnOnce() -> anyhow::Result<()>,
    ) -> Result<bool> {
        match step() {
            Ok(()) => Ok(true),
            Err(err) => match self.policy {
                StepFailurePolicy::Abort => Err(FaboxError::deploy(phase, err)),
                StepFailurePolicy::Warn => {
                    warn!(%phase, "deploy step failed, continuing: {err:#}");
                    self.warnings.push(format!("{phase}: {err:#}"));
                    Ok(false)
                }
            },
        }
    }

    fn into_warnings(self) -> Vec<String> {
        self.warnings
    }
}
