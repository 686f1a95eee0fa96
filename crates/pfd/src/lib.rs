#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/pfd/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod primer;
pub mod study;

// Re-export main types from sub-crates
pub use pfd_data as data;
pub use pfd_output as output;
pub use pfd_regress as regress;

pub use error::{Result, StudyError};
pub use study::{DiffInDiff, Specification, StudyConfig, StudyResults};

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
