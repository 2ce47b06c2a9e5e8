//! Paths of the per-product slot triple under the deploy root.

use std::path::{Path, PathBuf};

use crate::bundle::Bundle;
use crate::fs::SlotLock;
use crate::types::Slot;

#[derive(Debug, Clone)]
pub struct SlotLayout {
    root: PathBuf,
}

impl SlotLayout {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/<product>`, `<root>/<product>_previous`, `<root>/<product>_rollback`.
    pub fn slot(&self, product: &str, slot: Slot) -> PathBuf {
        self.root.join(format!("{product}{}", slot.suffix()))
    }

    /// Hidden extraction target for a bundle on its way to `live`.
    pub fn staging(&self, product: &str) -> PathBuf {
        self.root.join(format!(".{product}_new"))
    }

    /// Copy of the bundle archive while it is being extracted.
    pub fn archive_copy(&self, bundle: &Bundle) -> PathBuf {
        self.root.join(bundle.filename())
    }

    pub fn lock_path(&self, product: &str) -> PathBuf {
        self.root.join(format!(".{product}.lock"))
    }

    pub fn lock(&self, product: &str) -> anyhow::Result<SlotLock> {
        SlotLock::acquire(&self.lock_path(product))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_paths_follow_layout_contract() {
        let layout = SlotLayout::new(PathBuf::from("/var/www"));
        assert_eq!(layout.slot("site", Slot::Live), Path::new("/var/www/site"));
        assert_eq!(
            layout.slot("site", Slot::Previous),
            Path::new("/var/www/site_previous")
        );
        assert_eq!(
            layout.slot("site", Slot::Rollback),
            Path::new("/var/www/site_rollback")
        );
        assert_eq!(layout.staging("site"), Path::new("/var/www/.site_new"));
        assert_eq!(layout.lock_path("site"), Path::new("/var/www/.site.lock"));
    }
}
