//! Location of the download cache.
//!
//! The SQLite cache lives in a platform-specific directory:
//! - Linux: `~/.cache/pfd/`
//! - macOS: `~/Library/Caches/pfd/`
//! - Windows: `%LOCALAPPDATA%\pfd\`

use pfd_data::{DataError, DownloadCache};
use std::path::PathBuf;

/// Default cache directory.
pub(crate) fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pfd")
}

/// Path of the cache database.
pub(crate) fn cache_path() -> PathBuf {
    default_cache_dir().join("downloads.db")
}

/// Open the cache, creating the directory if needed.
pub(crate) fn open_cache() -> Result<DownloadCache, DataError> {
    let path = cache_path();

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    DownloadCache::new(&path)
}

/// Print where the cache lives and what it holds.
pub(crate) fn print_cache_info() {
    println!("  Cache location: {}", cache_path().display());
    if let Ok(stats) = open_cache().and_then(|cache| cache.stats()) {
        println!(
            "  Cached downloads: {} ({:.1} MB)",
            stats.entries,
            stats.total_bytes as f64 / 1_048_576.0
        );
    }
}
