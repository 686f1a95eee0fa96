//! Data sources and the HTTP fetcher.

use crate::cache::DownloadCache;
use crate::error::{DataError, Result};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Published SPM/CPS microdata used by the Permanent Fund Dividend case study.
pub const DEFAULT_SOURCE_URL: &str =
    "https://github.com/UBICenter/pfd_spm/raw/master/data/spm_state.csv.gz";

/// User agent sent with every download.
const USER_AGENT: &str = "pfd/0.1 (survey microdata loader)";

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Progress callback: `(bytes_received, total_bytes_if_known)`.
pub type ProgressFn = dyn Fn(u64, Option<u64>) + Sync;

/// Where survey data comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DataSource {
    /// Remote file fetched over HTTP(S).
    Url(String),
    /// File on the local filesystem.
    Path(PathBuf),
}

impl DataSource {
    /// Whether this source requires a network fetch.
    pub const fn is_remote(&self) -> bool {
        matches!(self, Self::Url(_))
    }
}

impl Default for DataSource {
    fn default() -> Self {
        Self::Url(DEFAULT_SOURCE_URL.to_string())
    }
}

impl FromStr for DataSource {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(DataError::InvalidSource("empty source".to_string()));
        }
        let lower = trimmed.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Ok(Self::Url(trimmed.to_string()))
        } else {
            Ok(Self::Path(PathBuf::from(trimmed)))
        }
    }
}

impl TryFrom<String> for DataSource {
    type Error = DataError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<DataSource> for String {
    fn from(source: DataSource) -> Self {
        source.to_string()
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(url) => write!(f, "{}", url),
            Self::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Configuration for data fetching.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Whether to use the download cache.
    pub use_cache: bool,
    /// Whether to force a refresh (ignore cached bytes, re-download).
    pub force_refresh: bool,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            use_cache: true,
            force_refresh: false,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Downloads raw survey files. A failed request is reported, never retried.
#[derive(Debug)]
pub struct Fetcher {
    client: reqwest::Client,
    config: FetchConfig,
}

impl Fetcher {
    /// Create a fetcher with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(DataError::Network)?;

        Ok(Self { client, config })
    }

    /// The active configuration.
    pub const fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Fetch the raw bytes of `source`.
    ///
    /// Remote sources go through `cache` when one is supplied and caching is
    /// enabled. Cache read and write failures are logged and treated as a miss.
    pub async fn fetch(
        &self,
        source: &DataSource,
        cache: Option<&DownloadCache>,
        progress: Option<&ProgressFn>,
    ) -> Result<Vec<u8>> {
        match source {
            DataSource::Path(path) => {
                debug!(path = %path.display(), "reading local survey file");
                Ok(tokio::fs::read(path).await?)
            }
            DataSource::Url(url) => {
                let cache = cache.filter(|_| self.config.use_cache);

                if let Some(cache) = cache
                    && !self.config.force_refresh
                {
                    match cache.get(url) {
                        Ok(Some(bytes)) => {
                            info!(url = %url, bytes = bytes.len(), "using cached download");
                            return Ok(bytes);
                        }
                        Ok(None) => {}
                        Err(e) => warn!(url = %url, error = %e, "failed to read cached download"),
                    }
                }

                let bytes = self.download(url, progress).await?;

                if let Some(cache) = cache
                    && let Err(e) = cache.put(url, &bytes)
                {
                    warn!(url = %url, error = %e, "failed to cache download");
                }

                Ok(bytes)
            }
        }
    }

    async fn download(&self, url: &str, progress: Option<&ProgressFn>) -> Result<Vec<u8>> {
        info!(url = %url, "downloading survey file");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(DataError::Network)?;

        let status = response.status();
        if !status.is_success() {
            return Err(DataError::Http {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let total = response.content_length();
        let mut buffer = Vec::with_capacity(total.unwrap_or(0) as usize);
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(DataError::Network)?;
            buffer.extend_from_slice(&chunk);
            if let Some(report) = progress {
                report(buffer.len() as u64, total);
            }
        }

        debug!(url = %url, bytes = buffer.len(), "download complete");
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("https://example.com/data.csv.gz", true)]
    #[case("HTTP://example.com/data.csv", true)]
    #[case("data/spm_state.csv.gz", false)]
    #[case("/tmp/spm.csv", false)]
    fn test_source_parsing(#[case] input: &str, #[case] remote: bool) {
        let source: DataSource = input.parse().unwrap();
        assert_eq!(source.is_remote(), remote);
        assert_eq!(source.to_string(), input);
    }

    #[test]
    fn test_serde_as_plain_string() {
        let local: DataSource = serde_json::from_str("\"data/spm.csv\"").unwrap();
        assert_eq!(local, DataSource::Path(PathBuf::from("data/spm.csv")));

        let json = serde_json::to_string(&DataSource::default()).unwrap();
        assert_eq!(json, format!("\"{}\"", DEFAULT_SOURCE_URL));
    }

    #[test]
    fn test_empty_source_rejected() {
        assert!(matches!(
            "   ".parse::<DataSource>(),
            Err(DataError::InvalidSource(_))
        ));
    }

    #[test]
    fn test_default_source_is_published_file() {
        assert_eq!(
            DataSource::default(),
            DataSource::Url(DEFAULT_SOURCE_URL.to_string())
        );
    }

    #[tokio::test]
    async fn test_fetch_local_file() {
        let dir = std::env::temp_dir().join("pfd-data-source-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("tiny.csv");
        std::fs::write(&path, b"year,w\n1981,1.0\n").unwrap();

        let fetcher = Fetcher::new(FetchConfig::default()).unwrap();
        let bytes = fetcher
            .fetch(&DataSource::Path(path), None, None)
            .await
            .unwrap();
        assert_eq!(bytes, b"year,w\n1981,1.0\n");
    }

    #[tokio::test]
    async fn test_cached_url_skips_network() {
        let cache = DownloadCache::in_memory().unwrap();
        let url = "https://invalid.example/never-fetched.csv";
        cache.put(url, b"cached").unwrap();

        let fetcher = Fetcher::new(FetchConfig::default()).unwrap();
        let bytes = fetcher
            .fetch(&DataSource::Url(url.to_string()), Some(&cache), None)
            .await
            .unwrap();
        assert_eq!(bytes, b"cached");
    }

    #[tokio::test]
    async fn test_unreadable_cache_falls_through_to_download() {
        let dir = std::env::temp_dir().join("pfd-data-source-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("broken-cache.db");
        std::fs::remove_file(&path).ok();

        let cache = DownloadCache::new(&path).unwrap();
        rusqlite::Connection::open(&path)
            .unwrap()
            .execute("DROP TABLE downloads", [])
            .unwrap();
        assert!(cache.get("http://127.0.0.1:9/spm.csv").is_err());

        // Nothing listens on the discard port, so the download itself fails.
        let fetcher = Fetcher::new(FetchConfig::default()).unwrap();
        let result = fetcher
            .fetch(
                &DataSource::Url("http://127.0.0.1:9/spm.csv".to_string()),
                Some(&cache),
                None,
            )
            .await;
        assert!(matches!(result, Err(DataError::Network(_))));

        drop(cache);
        std::fs::remove_file(&path).ok();
    }
}
