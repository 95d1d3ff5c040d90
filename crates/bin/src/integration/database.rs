//! Default location of the destination database.

use std::path::PathBuf;

/// Get the default data directory path.
///
/// Uses platform-specific data directories:
/// - Linux: `~/.local/share/regstat/`
/// - macOS: `~/Library/Application Support/regstat/`
/// - Windows: `%APPDATA%\regstat\`
pub(crate) fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("regstat")
}

/// Get the default database path.
pub(crate) fn default_database_path() -> PathBuf {
    default_data_dir().join("regstat.db")
}

/// Database path from the command line or environment, else the default.
pub(crate) fn resolve_database_path(explicit: Option<PathBuf>) -> PathBuf {
    explicit.unwrap_or_else(default_database_path)
}
