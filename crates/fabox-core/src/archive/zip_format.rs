//! Zip bundles.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

use anyhow::Context;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::{BUNDLE_ROOT, ensure_parent, entry_target};

pub(super) fn pack(src_dir: &Path, dest: &Path) -> anyhow::Result<()> {
    let output = File::create(dest)
        .with_context(|| format!("Failed to create archive: {}", dest.display()))?;
    let mut writer = ZipWriter::new(output);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    writer
        .add_directory(format!("{BUNDLE_ROOT}/"), options)
        .context("Failed to add bundle root to zip")?;
    add_dir(&mut writer, src_dir, BUNDLE_ROOT, options)?;

    writer.finish().context("Failed to finish zip archive")?;
    Ok(())
}

fn add_dir(
    writer: &mut ZipWriter<File>,
    dir: &Path,
    prefix: &str,
    options: SimpleFileOptions,
) -> anyhow::Result<()> {
    let mut entries: Vec<_> = fs::read_dir(dir)
        .with_context(|| format!("Failed to read dir: {}", dir.display()))?
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("Failed to read dir entries: {}", dir.display()))?;
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let path = entry.path();
        let name = entry.file_name();
        let name = name
            .to_str()
            .ok_or_else(|| anyhow::anyhow!("Non UTF-8 file name: {}", path.display()))?;
        let archive_name = format!("{prefix}/{name}");
        let ty = entry
            .file_type()
            .with_context(|| format!("Failed to stat: {}", path.display()))?;
        let entry_options = options.unix_permissions(unix_mode(&path)?);

        if ty.is_dir() {
            writer
                .add_directory(format!("{archive_name}/"), entry_options)
                .with_context(|| format!("Failed to add directory {archive_name}"))?;
            add_dir(writer, &path, &archive_name, options)?;
        } else if ty.is_file() {
            writer
                .start_file(archive_name.as_str(), entry_options)
                .with_context(|| format!("Failed to start zip entry {archive_name}"))?;
            let mut input = File::open(&path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            io::copy(&mut input, writer)
                .with_context(|| format!("Failed to write zip entry {archive_name}"))?;
        } else {
            anyhow::bail!(
                "Zip bundles only hold files and directories (use tar.gz): {}",
                path.display()
            );
        }
    }
    Ok(())
}

#[cfg(unix)]
fn unix_mode(path: &Path) -> anyhow::Result<u32> {
    use std::os::unix::fs::PermissionsExt;
    let metadata =
        fs::metadata(path).with_context(|| format!("Failed to stat: {}", path.display()))?;
    Ok(metadata.permissions().mode() & 0o7777)
}

#[cfg(not(unix))]
fn unix_mode(path: &Path) -> anyhow::Result<u32> {
    Ok(if path.is_dir() { 0o755 } else { 0o644 })
}

pub(super) fn unpack(archive: &Path, dest: &Path) -> anyhow::Result<()> {
    let input = File::open(archive)
        .with_context(|| format!("Failed to open archive: {}", archive.display()))?;
    let mut zip = ZipArchive::new(input)
        .with_context(|| format!("Failed to read zip archive: {}", archive.display()))?;

    for i in 0..zip.len() {
        let mut file = zip
            .by_index(i)
            .with_context(|| format!("Failed to read zip entry {i}"))?;

        let entry_path = file
            .enclosed_name()
            .ok_or_else(|| anyhow::anyhow!("Unsafe archive entry path: {}", file.name()))?;
        let Some(target) = entry_target(dest, &entry_path)? else {
            continue;
        };

        ensure_parent(dest, &target)?;
        if file.is_dir() {
            fs::create_dir_all(&target)
                .with_context(|| format!("Failed to create directory: {}", target.display()))?;
        } else {
            let mut output = File::create(&target)
                .with_context(|| format!("Failed to create file: {}", target.display()))?;
            io::copy(&mut file, &mut output)
                .with_context(|| format!("Failed to extract {}", file.name()))?;
            output
                .flush()
                .with_context(|| format!("Failed to write {}", target.display()))?;
        }

        #[cfg(unix)]
        if let Some(mode) = file.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&target, fs::Permissions::from_mode(mode & 0o7777))
                .with_context(|| format!("Failed to set mode on {}", target.display()))?;
        }
    }
    Ok(())
}
