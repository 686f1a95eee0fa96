#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/pfd/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod covariance;
pub mod design;
pub mod error;
pub mod inference;
pub mod linalg;
pub mod wls;

pub use covariance::CovarianceType;
pub use design::DesignMatrix;
pub use error::{RegressionError, Result};
pub use wls::{Term, Wls, WlsResults};
