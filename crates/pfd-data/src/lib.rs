#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/pfd/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod cache;
pub mod codec;
pub mod describe;
pub mod error;
pub mod source;
pub mod survey;

pub use cache::{CacheStats, DownloadCache};
pub use codec::{decompress, is_gzip, parse_csv};
pub use describe::ColumnSummary;
pub use error::{DataError, Result};
pub use source::{DEFAULT_SOURCE_URL, DataSource, FetchConfig, Fetcher, ProgressFn};
pub use survey::{
    DesignSpec, SurveyFrame, add_constant, columns, describe_frame, numeric_values,
};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
