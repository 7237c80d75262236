//! Where Vitae stores its own data (config, persisted index).
//!
//! The resume itself stays wherever the user keeps it. We only store app state here.

use std::path::PathBuf;

/// Name of the persisted vector index directory inside the app data directory.
pub const INDEX_DIRNAME: &str = "index";

/// Returns the directory where Vitae stores config and the persisted index.
/// On Linux: `~/.local/share/vitae/`.
/// Creates the directory if it doesn't exist; returns `None` if we can't determine the path.
pub fn app_data_dir() -> Option<PathBuf> {
    let dir = directories::ProjectDirs::from("app", "Vitae", "Vitae")?.data_local_dir().to_path_buf();
    std::fs::create_dir_all(&dir).ok()?;
    Some(dir)
}

/// Default location of the persisted vector index.
pub fn default_index_dir() -> PathBuf {
    app_data_dir()
        .map(|d| d.join(INDEX_DIRNAME))
        .unwrap_or_else(|| PathBuf::from(".vitae-index"))
}
