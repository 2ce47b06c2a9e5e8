//! Flat on-disk archive store holding every bundle of every product.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Serialize;
use tracing::{debug, warn};

use super::{Bundle, BundleTag, BuildNumber};
use crate::error::{BuildPhase, FaboxError, NotFoundKind, Result};
use crate::fs::move_file;
use crate::types::ArchiveFormat;

/// One tag with the number of builds archived for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagSummary {
    pub tag: BundleTag,
    pub builds: usize,
    pub latest: BuildNumber,
}

#[derive(Debug, Clone)]
pub struct BundleStore {
    root: PathBuf,
}

impl BundleStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn archive_path(&self, bundle: &Bundle) -> PathBuf {
        self.root.join(bundle.filename())
    }

    /// List archived bundles, optionally only those of one tag.
    ///
    /// Sorted ascending by tag string, then build number. A missing store
    /// directory is an empty store.
    pub fn list_bundles(&self, tag: Option<&BundleTag>) -> Result<Vec<Bundle>> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(root = %self.root.display(), "archive store does not exist yet");
                return Ok(Vec::new());
            }
            Err(err) => {
                return Err(FaboxError::io(
                    format!("Failed to read archive store {}", self.root.display()),
                    err,
                ));
            }
        };

        let mut bundles = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| {
                FaboxError::io(
                    format!("Failed to read archive store entry in {}", self.root.display()),
                    err,
                )
            })?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if ArchiveFormat::from_file_name(name).is_none() {
                continue;
            }
            if entry.file_type().map(|ty| ty.is_dir()).unwrap_or(false) {
                continue;
            }
            match Bundle::parse_filename(name) {
                Ok(bundle) => {
                    if tag.is_none_or(|wanted| *wanted == bundle.tag) {
                        bundles.push(bundle);
                    }
                }
                Err(err) => warn!(file = name, "skipping archive: {err}"),
            }
        }

        bundles.sort_by_cached_key(|b| (b.tag.to_string(), b.build, b.format.extension()));
        Ok(bundles)
    }

    /// Distinct tags with their build counts, in listing order.
    pub fn tags(&self) -> Result<Vec<TagSummary>> {
        let mut summaries: Vec<TagSummary> = Vec::new();
        for bundle in self.list_bundles(None)? {
            match summaries.last_mut() {
                Some(last) if last.tag == bundle.tag => {
                    last.builds += 1;
                    last.latest = last.latest.max(bundle.build);
                }
                _ => summaries.push(TagSummary {
                    tag: bundle.tag,
                    builds: 1,
                    latest: bundle.build,
                }),
            }
        }
        Ok(summaries)
    }

    /// Newest build of a tag.
    pub fn latest(&self, tag: &BundleTag) -> Result<Option<Bundle>> {
        Ok(self.list_bundles(Some(tag))?.pop())
    }

    /// Number the next build of a tag: one past the highest, or `001`.
    pub fn next_build(&self, tag: &BundleTag) -> Result<BuildNumber> {
        let highest = self.list_bundles(Some(tag))?.iter().map(|b| b.build).max();
        match highest {
            None => Ok(BuildNumber::FIRST),
            Some(build) => build.next().ok_or_else(|| FaboxError::BuildFailure {
                phase: BuildPhase::Number,
                message: format!("no build numbers left for {tag} after {build}"),
            }),
        }
    }

    /// Resolve an archive file name, or a tag meaning its latest build.
    pub fn resolve(&self, spec: &str) -> Result<Bundle> {
        if let Ok(bundle) = Bundle::parse_filename(spec) {
            if self.archive_path(&bundle).is_file() {
                return Ok(bundle);
            }
            return Err(FaboxError::not_found(NotFoundKind::Bundle, spec));
        }

        let tag = BundleTag::parse(spec)
            .map_err(|_| FaboxError::not_found(NotFoundKind::Tag, spec))?;
        self.latest(&tag)?
            .ok_or_else(|| FaboxError::not_found(NotFoundKind::Tag, spec))
    }

    /// Move a freshly built archive into the store. Never overwrites.
    pub fn admit(&self, archive: &Path, bundle: &Bundle) -> anyhow::Result<PathBuf> {
        std::fs::create_dir_all(&self.root).with_context(|| {
            format!("Failed to create archive store: {}", self.root.display())
        })?;

        let dest = self.archive_path(bundle);
        if dest.exists() {
            anyhow::bail!("Archive already exists: {}", dest.display());
        }
        move_file(archive, &dest)?;
        Ok(dest)
    }
}
