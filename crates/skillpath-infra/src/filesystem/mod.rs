//! Filesystem layout helpers for Skillpath.

use std::path::PathBuf;

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "SKILLPATH_DATA_DIR";

/// Resolve the data directory from environment or platform defaults.
///
/// Priority:
/// 1. `SKILLPATH_DATA_DIR` environment variable
/// 2. `~/.skillpath`
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".skillpath");
    }

    // Last resort: current directory
    PathBuf::from(".skillpath")
}

/// Create the data directory if it does not exist yet.
pub async fn ensure_data_dir(data_dir: &std::path::Path) -> Result<(), std::io::Error> {
    tokio::fs::create_dir_all(data_dir).await
}
