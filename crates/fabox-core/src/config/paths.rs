//! Config path resolution helpers.

use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "fabox.toml";

/// Pick the config file: an explicit path wins, then `fabox.toml` in the
/// working directory if it exists, then the user config directory.
pub fn resolve_config_path(
    explicit: Option<&Path>,
    working_dir: &Path,
    user_config_dir: &Path,
) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    let local = working_dir.join(CONFIG_FILE_NAME);
    if local.is_file() {
        return local;
    }
    user_config_dir.join("fabox").join(CONFIG_FILE_NAME)
}
