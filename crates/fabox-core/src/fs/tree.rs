//! Recursive copy, removal and move helpers.

use std::fs;
use std::path::Path;

use anyhow::Context;
use tracing::debug;

/// Recursively copy the contents of `src` into `dst`, creating `dst`.
///
/// Symlinks are recreated, not followed.
pub fn copy_tree(src: &Path, dst: &Path) -> anyhow::Result<()> {
    fs::create_dir_all(dst)
        .with_context(|| format!("Failed to create directory: {}", dst.display()))?;

    for entry in
        fs::read_dir(src).with_context(|| format!("Failed to read dir: {}", src.display()))?
    {
        let entry =
            entry.with_context(|| format!("Failed to read dir entry: {}", src.display()))?;
        let ty = entry
            .file_type()
            .with_context(|| format!("Failed to stat dir entry: {}", entry.path().display()))?;
        let from = entry.path();
        let to = dst.join(entry.file_name());

        if ty.is_dir() {
            copy_tree(&from, &to)?;
        } else if ty.is_file() {
            fs::copy(&from, &to).with_context(|| {
                format!(
                    "Failed to copy file from {} to {}",
                    from.display(),
                    to.display()
                )
            })?;
        } else if ty.is_symlink() {
            copy_symlink(&from, &to)?;
        } else {
            anyhow::bail!("Unsupported filesystem entry type at {}", from.display());
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(from: &Path, to: &Path) -> anyhow::Result<()> {
    let target = fs::read_link(from)
        .with_context(|| format!("Failed to read symlink: {}", from.display()))?;
    std::os::unix::fs::symlink(&target, to)
        .with_context(|| format!("Failed to create symlink: {}", to.display()))
}

#[cfg(not(unix))]
fn copy_symlink(from: &Path, _to: &Path) -> anyhow::Result<()> {
    anyhow::bail!("Symlinks are not supported: {}", from.display())
}

/// Remove a file or directory tree. Returns whether anything was removed.
pub fn remove_path_if_exists(path: &Path) -> anyhow::Result<bool> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(err) => {
            return Err(anyhow::Error::new(err)
                .context(format!("Failed to read metadata: {}", path.display())));
        }
    };
    if metadata.is_dir() {
        fs::remove_dir_all(path)
            .with_context(|| format!("Failed to remove directory: {}", path.display()))?;
    } else {
        fs::remove_file(path)
            .with_context(|| format!("Failed to remove file: {}", path.display()))?;
    }
    Ok(true)
}

/// Delete every directory whose name is in `names`, anywhere below `root`.
///
/// Returns the number of directories removed.
pub fn strip_named_dirs(root: &Path, names: &[&str]) -> anyhow::Result<usize> {
    let mut removed = 0;
    for entry in
        fs::read_dir(root).with_context(|| format!("Failed to read dir: {}", root.display()))?
    {
        let entry =
            entry.with_context(|| format!("Failed to read dir entry: {}", root.display()))?;
        let ty = entry
            .file_type()
            .with_context(|| format!("Failed to stat dir entry: {}", entry.path().display()))?;
        if !ty.is_dir() {
            continue;
        }

        let path = entry.path();
        let matches = entry
            .file_name()
            .to_str()
            .is_some_and(|name| names.contains(&name));
        if matches {
            debug!(path = %path.display(), "stripping metadata directory");
            fs::remove_dir_all(&path)
                .with_context(|| format!("Failed to remove directory: {}", path.display()))?;
            removed += 1;
        } else {
            removed += strip_named_dirs(&path, names)?;
        }
    }
    Ok(removed)
}

/// Move a file, falling back to copy + remove across filesystems.
pub fn move_file(from: &Path, to: &Path) -> anyhow::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(err) if is_cross_device_os_error(&err) => {
            debug!(
                from = %from.display(),
                to = %to.display(),
                "rename crosses filesystems, copying instead"
            );
            fs::copy(from, to).with_context(|| {
                format!("Failed to copy {} to {}", from.display(), to.display())
            })?;
            fs::remove_file(from)
                .with_context(|| format!("Failed to remove {}", from.display()))?;
            Ok(())
        }
        Err(err) => Err(anyhow::Error::new(err)
            .context(format!("Failed to move {} to {}", from.display(), to.display()))),
    }
}

fn is_cross_device_os_error(err: &std::io::Error) -> bool {
    let Some(code) = err.raw_os_error() else {
        return false;
    };

    #[cfg(unix)]
    {
        const EXDEV: i32 = 18;
        code == EXDEV
    }

    #[cfg(windows)]
    {
        const ERROR_NOT_SAME_DEVICE: i32 = 17;
        code == ERROR_NOT_SAME_DEVICE
    }

    #[cfg(not(any(unix, windows)))]
    {
        let _ = code;
        false
    }
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
    fn copy_tree_copies_nested_files() {
        let tmp = TempDir::new().expect("tempdir should succeed");
        let src = tmp.path().join("src");
        write_file(&src.join("index.html"), "<html>");
        write_file(&src.join("css").join("site.css"), "body {}");
        fs::create_dir_all(src.join("empty")).expect("create_dir_all should succeed");

        let dst = tmp.path().join("dst");
        copy_tree(&src, &dst).expect("copy_tree should succeed");

        assert_eq!(
            fs::read_to_string(dst.join("css").join("site.css")).expect("read"),
            "body {}"
        );
        assert!(dst.join("index.html").is_file());
        assert!(dst.join("empty").is_dir());
    }

    #[test]
    fn strip_named_dirs_removes_at_any_depth() {
        let tmp = TempDir::new().expect("tempdir should succeed");
        let root = tmp.path();
        write_file(&root.join(".git").join("HEAD"), "ref");
        write_file(&root.join("lib").join(".idea").join("workspace.xml"), "<x/>");
        write_file(&root.join("lib").join("deep").join(".git").join("config"), "");
        write_file(&root.join("lib").join("keep.txt"), "keep");
        write_file(&root.join(".gitignore"), "*.log");

        let removed = strip_named_dirs(root, &[".git", ".idea"]).expect("strip should succeed");

        assert_eq!(removed, 3);
        assert!(!root.join(".git").exists());
        assert!(!root.join("lib").join(".idea").exists());
        assert!(!root.join("lib").join("deep").join(".git").exists());
        assert!(root.join("lib").join("keep.txt").exists());
        assert!(root.join(".gitignore").exists());
    }

    #[test]
    fn remove_path_if_exists_reports_absence() {
        let tmp = TempDir::new().expect("tempdir should succeed");
        let dir = tmp.path().join("dir");
        write_file(&dir.join("file"), "x");

        assert!(remove_path_if_exists(&dir).expect("remove should succeed"));
        assert!(!dir.exists());
        assert!(!remove_path_if_exists(&dir).expect("remove should succeed"));
    }

    #[test]
    fn move_file_moves_within_filesystem() {
        let tmp = TempDir::new().expect("tempdir should succeed");
        let from = tmp.path().join("a.tar.gz");
        let to = tmp.path().join("store").join("a.tar.gz");
        write_file(&from, "data");
        fs::create_dir_all(to.parent().expect("parent")).expect("create_dir_all");

        move_file(&from, &to).expect("move should succeed");

        assert!(!from.exists());
        assert_eq!(fs::read_to_string(&to).expect("read"), "data");
    }
}
