//! Shared core types used across configuration, store and deploy layers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Compression format of a bundle archive. The file extension carries it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ArchiveFormat {
    #[default]
    #[serde(rename = "tar.gz")]
    TarGz,
    #[serde(rename = "zip")]
    Zip,
}

impl ArchiveFormat {
    pub const ALL: [ArchiveFormat; 2] = [ArchiveFormat::TarGz, ArchiveFormat::Zip];

    /// Extension including the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            ArchiveFormat::TarGz => ".tar.gz",
            ArchiveFormat::Zip => ".zip",
        }
    }

    /// Detect the format of an archive file name from its extension.
    pub fn from_file_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|format| name.ends_with(format.extension()))
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension().trim_start_matches('.'))
    }
}

impl FromStr for ArchiveFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim_start_matches('.').to_lowercase().as_str() {
            "tar.gz" | "tgz" => Ok(ArchiveFormat::TarGz),
            "zip" => Ok(ArchiveFormat::Zip),
            other => Err(format!("unknown archive format '{other}' (use tar.gz or zip)")),
        }
    }
}

/// One of the three retained deployment positions of a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Slot {
    Live,
    Previous,
    Rollback,
}

impl Slot {
    pub const ALL: [Slot; 3] = [Slot::Live, Slot::Previous, Slot::Rollback];

    /// Directory name suffix appended to the product name.
    pub fn suffix(self) -> &'static str {
        match self {
            Slot::Live => "",
            Slot::Previous => "_previous",
            Slot::Rollback => "_rollback",
        }
    }

    /// Split a deploy-root directory name into `(product, slot)`.
    pub fn classify(dir_name: &str) -> (&str, Slot) {
        for slot in [Slot::Previous, Slot::Rollback] {
            if let Some(product) = dir_name.strip_suffix(slot.suffix())
                && !product.is_empty()
            {
                return (product, slot);
            }
        }
        (dir_name, Slot::Live)
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Slot::Live => "live",
            Slot::Previous => "previous",
            Slot::Rollback => "rollback",
        })
    }
}

/// What to do when a slot mutation step fails after the new bundle has
/// been extracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepFailurePolicy {
    /// Stop at the first failed step and report it.
    #[default]
    Abort,
    /// Log the failure, record a warning and run the remaining steps.
    Warn,
}
