//! SQLite cache for raw downloads.

use crate::error::{DataError, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use tracing::debug;

/// SQLite cache holding raw downloaded bytes keyed by URL.
#[derive(Debug)]
pub struct DownloadCache {
    conn: Connection,
}

impl DownloadCache {
    /// Create a new SQLite cache.
    ///
    /// # Arguments
    /// * `path` - Path to the SQLite database file
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let cache = Self { conn };
        cache.initialize_schema()?;
        Ok(cache)
    }

    /// Create an in-memory cache (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let cache = Self { conn };
        cache.initialize_schema()?;
        Ok(cache)
    }

    /// Initialize the database schema.
    fn initialize_schema(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS downloads (
                url TEXT PRIMARY KEY,
                bytes BLOB NOT NULL,
                size INTEGER NOT NULL,
                cached_at TEXT NOT NULL
            )",
            [],
        )?;

        Ok(())
    }

    /// Check whether a download is cached.
    pub fn has(&self, url: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM downloads WHERE url = ?1",
            params![url],
            |row| row.get(0),
        )?;

        Ok(count > 0)
    }

    /// Get cached bytes for a URL.
    pub fn get(&self, url: &str) -> Result<Option<Vec<u8>>> {
        let bytes = self
            .conn
            .query_row(
                "SELECT bytes FROM downloads WHERE url = ?1",
                params![url],
                |row| row.get::<_, Vec<u8>>(0),
            )
            .optional()?;

        if bytes.is_some() {
            debug!(url = %url, "download cache hit");
        }
        Ok(bytes)
    }

    /// When a URL was cached, if it is.
    pub fn cached_at(&self, url: &str) -> Result<Option<DateTime<Utc>>> {
        let stamp: Option<String> = self
            .conn
            .query_row(
                "SELECT cached_at FROM downloads WHERE url = ?1",
                params![url],
                |row| row.get(0),
            )
            .optional()?;

        stamp
            .map(|s| {
                DateTime::parse_from_rfc3339(&s)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|e| DataError::Cache(format!("Invalid cached_at '{}': {}", s, e)))
            })
            .transpose()
    }

    /// Store bytes for a URL, replacing any previous entry.
    pub fn put(&self, url: &str, bytes: &[u8]) -> Result<()> {
        let cached_at = Utc::now().to_rfc3339();

        self.conn.execute(
            "INSERT OR REPLACE INTO downloads (url, bytes, size, cached_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![url, bytes, bytes.len() as i64, cached_at],
        )?;

        debug!(url = %url, bytes = bytes.len(), "stored download in cache");
        Ok(())
    }

    /// Remove the entry for a URL.
    pub fn remove(&self, url: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM downloads WHERE url = ?1", params![url])?;
        Ok(())
    }

    /// Clear all cached data.
    pub fn clear_all(&self) -> Result<()> {
        self.conn.execute("DELETE FROM downloads", [])?;
        Ok(())
    }

    /// Get cache statistics.
    pub fn stats(&self) -> Result<CacheStats> {
        let (entries, total_bytes): (i64, i64) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(size), 0) FROM downloads",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        Ok(CacheStats {
            entries: entries as usize,
            total_bytes: total_bytes as u64,
        })
    }
}

/// Cache statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cached downloads
    pub entries: usize,
    /// Total size of cached downloads in bytes
    pub total_bytes: u64,
}
