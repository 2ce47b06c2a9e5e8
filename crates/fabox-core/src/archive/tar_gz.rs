//! Gzip-compressed tar bundles.

use std::fs::File;
use std::path::Path;

use anyhow::Context;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use tar::{Archive, Builder, EntryType};

use super::{BUNDLE_ROOT, check_link_target, ensure_parent, entry_target};

pub(super) fn pack(src_dir: &Path, dest: &Path) -> anyhow::Result<()> {
    let output = File::create(dest)
        .with_context(|| format!("Failed to create archive: {}", dest.display()))?;
    let encoder = GzEncoder::new(output, Compression::default());
    let mut builder = Builder::new(encoder);
    builder.follow_symlinks(false);

    builder
        .append_dir_all(BUNDLE_ROOT, src_dir)
        .with_context(|| format!("Failed to add {} to archive", src_dir.display()))?;

    let encoder = builder
        .into_inner()
        .context("Failed to finish tar stream")?;
    encoder.finish().context("Failed to finish gzip stream")?;
    Ok(())
}

pub(super) fn unpack(archive: &Path, dest: &Path) -> anyhow::Result<()> {
    let input = File::open(archive)
        .with_context(|| format!("Failed to open archive: {}", archive.display()))?;
    let mut archive_reader = Archive::new(GzDecoder::new(input));

    let entries = archive_reader
        .entries()
        .with_context(|| format!("Failed to read archive: {}", archive.display()))?;

    for entry in entries {
        let mut entry =
            entry.with_context(|| format!("Failed to read entry in {}", archive.display()))?;
        let entry_path = entry
            .path()
            .context("Archive entry has an invalid path")?
            .into_owned();

        let kind = entry.header().entry_type();
        match kind {
            EntryType::Regular
            | EntryType::Continuous
            | EntryType::Directory
            | EntryType::Symlink => {}
            EntryType::XGlobalHeader | EntryType::XHeader => continue,
            EntryType::Link => {
                anyhow::bail!("Hard links are not allowed in bundles: {}", entry_path.display())
            }
            other => anyhow::bail!(
                "Unsupported archive entry type {other:?}: {}",
                entry_path.display()
            ),
        }

        let Some(target) = entry_target(dest, &entry_path)? else {
            continue;
        };
        ensure_parent(dest, &target)?;
        if kind == EntryType::Symlink {
            let link = entry
                .link_name()
                .context("Symlink entry has an invalid target")?
                .ok_or_else(|| {
                    anyhow::anyhow!("Symlink without target: {}", entry_path.display())
                })?;
            check_link_target(dest, &target, &link)?;
        }
        entry
            .unpack(&target)
            .with_context(|| format!("Failed to extract {}", entry_path.display()))?;
    }
    Ok(())
}
