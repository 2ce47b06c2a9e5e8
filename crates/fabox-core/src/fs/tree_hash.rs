//! Content fingerprint of a directory tree.
//!
//! Used to tell whether `live`, `previous` and `rollback` hold the same
//! content. Only names, file bytes and symlink targets take part; mtimes,
//! modes and ownership do not, so a normalized slot hashes like the bundle
//! it came from.

use std::fs;
use std::path::Path;

use anyhow::Context;

const DIR_MARKER: u8 = 0xFF;
const FILE_MARKER: u8 = 0x00;
const LINK_MARKER: u8 = 0xFE;

/// Hash `root` into a 64-character blake3 hex digest.
///
/// ```no_run
/// use fabox_core::fs::hash_tree;
/// use std::path::Path;
///
/// let digest = hash_tree(Path::new("/var/www/site"))?;
/// assert_eq!(digest.len(), 64);
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn hash_tree(root: &Path) -> anyhow::Result<String> {
    let mut hasher = blake3::Hasher::new();
    walk(&mut hasher, root, "")?;
    Ok(hasher.finalize().to_hex().to_string())
}

fn walk(hasher: &mut blake3::Hasher, dir: &Path, prefix: &str) -> anyhow::Result<()> {
    let mut entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory: {}", dir.display()))?
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("Failed to read directory entries: {}", dir.display()))?;
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let path = entry.path();
        let rel = match prefix {
            "" => entry.file_name().to_string_lossy().into_owned(),
            _ => format!("{prefix}/{}", entry.file_name().to_string_lossy()),
        };
        let ty = entry
            .file_type()
            .with_context(|| format!("Failed to stat file: {}", path.display()))?;

        hasher.update(rel.as_bytes());
        if ty.is_dir() {
            hasher.update(&[DIR_MARKER]);
            walk(hasher, &path, &rel)?;
        } else if ty.is_file() {
            hasher.update(&[FILE_MARKER]);
            let mut file = fs::File::open(&path)
                .with_context(|| format!("Failed to open file: {}", path.display()))?;
            std::io::copy(&mut file, hasher)
                .with_context(|| format!("Failed to read file: {}", path.display()))?;
        } else if ty.is_symlink() {
            hasher.update(&[LINK_MARKER]);
            let target = fs::read_link(&path)
                .with_context(|| format!("Failed to read symlink: {}", path.display()))?;
            hasher.update(target.to_string_lossy().as_bytes());
        } else {
            anyhow::bail!("Unsupported filesystem entry type: {}", path.display());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_file(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create_dir_all should succeed in test temp dirs");
        }
        fs::write(path, content).expect("write should succeed in test temp dirs");
    }

    #[test]
    fn copies_of_a_slot_hash_equal() {
        let tmp = TempDir::new().expect("tempdir should succeed");
        let live = tmp.path().join("site");
        write_file(&live.join("index.html"), "<h1>v1</h1>");
        write_file(&live.join("css").join("site.css"), "body {}");

        let previous = tmp.path().join("site_previous");
        crate::fs::copy_tree(&live, &previous).expect("copy_tree should succeed");

        let digest = hash_tree(&live).expect("hash_tree should succeed");
        assert_eq!(digest.len(), 64);
        assert_eq!(digest, hash_tree(&previous).expect("hash_tree should succeed"));
    }

    #[test]
    fn content_and_names_change_the_digest() {
        let tmp = TempDir::new().expect("tempdir should succeed");
        write_file(&tmp.path().join("a.txt"), "one");
        let first = hash_tree(tmp.path()).expect("hash_tree should succeed");

        write_file(&tmp.path().join("a.txt"), "two");
        let second = hash_tree(tmp.path()).expect("hash_tree should succeed");
        assert_ne!(first, second);

        fs::rename(tmp.path().join("a.txt"), tmp.path().join("b.txt")).expect("rename");
        let third = hash_tree(tmp.path()).expect("hash_tree should succeed");
        assert_ne!(second, third);
    }

    #[test]
    fn empty_directories_count() {
        let tmp = TempDir::new().expect("tempdir should succeed");
        let bare = hash_tree(tmp.path()).expect("hash_tree should succeed");
        fs::create_dir(tmp.path().join("uploads")).expect("create_dir");
        assert_ne!(bare, hash_tree(tmp.path()).expect("hash_tree should succeed"));
    }

    #[test]
    fn missing_path_fails() {
        assert!(hash_tree(Path::new("/nonexistent/fabox/slot")).is_err());
    }
}
