//! Caching layer for downloaded survey files.

pub mod sqlite;

pub use sqlite::{CacheStats, DownloadCache};
