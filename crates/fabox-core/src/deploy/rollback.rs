//! Restore a product's previous slot to live.

use std::path::PathBuf;

use serde::Serialize;
use tracing::{info, warn};

use super::layout::SlotLayout;
use crate::error::{FaboxError, Result};
use crate::fs::{FileOps, LocalFileOps};
use crate::types::Slot;

#[derive(Debug, Clone, Serialize)]
pub struct RollbackReport {
    pub product: String,
    pub live: PathBuf,
    /// Where the replaced live slot went, if there was one.
    pub rollback: Option<PathBuf>,
}

#[derive(Debug)]
pub struct RollbackEngine {
    layout: SlotLayout,
    ops: Box<dyn FileOps>,
}

impl RollbackEngine {
    pub fn new(layout: SlotLayout) -> Self {
        Self {
            layout,
            ops: Box::new(LocalFileOps),
        }
    }

    pub fn with_ops(mut self, ops: Box<dyn FileOps>) -> Self {
        self.ops = ops;
        self
    }

    /// Move `live` aside to `rollback` and `previous` into `live`.
    ///
    /// Nothing is touched unless a previous slot exists. Afterwards the
    /// product has no previous slot, so a second rollback in a row fails.
    pub fn rollback(&self, product: &str) -> Result<RollbackReport> {
        let live = self.layout.slot(product, Slot::Live);
        let previous = self.layout.slot(product, Slot::Previous);
        let rollback = self.layout.slot(product, Slot::Rollback);

        if !previous.is_dir() {
            return Err(no_previous(product, &previous));
        }

        let _lock = self
            .layout
            .lock(product)
            .map_err(|err| FaboxError::rollback(product, format!("{err:#}")))?;

        // Another deploy or rollback may have finished while we waited.
        if !previous.is_dir() {
            return Err(no_previous(product, &previous));
        }

        info!(product, root = %self.layout.root().display(), "rolling back");

        if self
            .ops
            .remove(&rollback)
            .map_err(|err| FaboxError::rollback(product, format!("{err:#}")))?
        {
            info!(path = %rollback.display(), "discarded stale rollback slot");
        }

        let demoted = if live.exists() {
            self.ops
                .rename(&live, &rollback)
                .map_err(|err| FaboxError::rollback(product, format!("{err:#}")))?;
            true
        } else {
            warn!(product, "no live slot, restoring previous slot only");
            false
        };

        if let Err(err) = self.ops.rename(&previous, &live) {
            if demoted {
                match self.ops.rename(&rollback, &live) {
                    Ok(()) => warn!(product, "restore failed, put the live slot back"),
                    Err(undo) => warn!(product, "failed to put the live slot back: {undo:#}"),
                }
            }
            return Err(FaboxError::rollback(product, format!("{err:#}")));
        }

        info!(product, live = %live.display(), "rollback complete");
        Ok(RollbackReport {
            product: product.to_string(),
            live,
            rollback: demoted.then_some(rollback),
        })
    }
}

fn no_previous(product: &str, previous: &std::path::Path) -> FaboxError {
    FaboxError::rollback(
        product,
        format!("no previous version at {}", previous.display()),
    )
}
