//! What is deployed where, read back from each slot's version stamp.

use std::path::PathBuf;

use anyhow::Context;
use serde::Serialize;
use tracing::{debug, warn};

use super::layout::SlotLayout;
use crate::build::VersionStamp;
use crate::fs::hash_tree;
use crate::types::Slot;

/// Which slots a listing includes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlotFilter {
    /// Live slots only.
    #[default]
    Live,
    /// `_previous` slots only.
    Previous,
    All,
}

impl SlotFilter {
    fn admits(self, slot: Slot) -> bool {
        match self {
            SlotFilter::Live => slot == Slot::Live,
            SlotFilter::Previous => slot == Slot::Previous,
            SlotFilter::All => true,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DeployedVersion {
    pub product: String,
    pub slot: Slot,
    pub path: PathBuf,
    pub stamp: VersionStamp,
}

/// One position of a product's slot triple.
#[derive(Debug, Clone, Serialize)]
pub struct SlotState {
    pub slot: Slot,
    pub path: PathBuf,
    pub present: bool,
    pub stamp: Option<VersionStamp>,
    /// blake3 digest of the slot tree, when verification was requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DeployedVersions {
    layout: SlotLayout,
}

impl DeployedVersions {
    pub fn new(layout: SlotLayout) -> Self {
        Self { layout }
    }

    /// Stamps of every slot directory directly under the deploy root,
    /// sorted by their rendered line. Directories without a stamp are
    /// skipped.
    pub fn list(&self, filter: SlotFilter) -> anyhow::Result<Vec<DeployedVersion>> {
        let root = self.layout.root();
        let entries = match std::fs::read_dir(root) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(anyhow::Error::new(err)
                    .context(format!("Failed to read deploy root {}", root.display())));
            }
        };

        let mut versions = Vec::new();
        for entry in entries {
            let entry = entry
                .with_context(|| format!("Failed to read entry in {}", root.display()))?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }

            let (product, slot) = Slot::classify(&name);
            if !filter.admits(slot) {
                continue;
            }
            match VersionStamp::read_from_dir(&path) {
                Ok(Some(stamp)) => versions.push(DeployedVersion {
                    product: product.to_string(),
                    slot,
                    path,
                    stamp,
                }),
                Ok(None) => debug!(dir = %path.display(), "no version stamp"),
                Err(err) => warn!("Skipping {}: {err:#}", path.display()),
            }
        }

        versions.sort_by_key(|version| version.stamp.render());
        Ok(versions)
    }

    /// State of each slot of `product`, hashing present slots when `verify`
    /// is set.
    pub fn slots(&self, product: &str, verify: bool) -> anyhow::Result<Vec<SlotState>> {
        Slot::ALL
            .into_iter()
            .map(|slot| {
                let path = self.layout.slot(product, slot);
                let present = path.is_dir();
                let stamp = if present {
                    VersionStamp::read_from_dir(&path)?
                } else {
                    None
                };
                let hash = if present && verify {
                    Some(hash_tree(&path)?)
                } else {
                    None
                };
                Ok(SlotState {
                    slot,
                    path,
                    present,
                    stamp,
                    hash,
                })
            })
            .collect()
    }
}
