#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/pfd/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod describe;
pub mod export;
pub mod report;
pub mod summary;
pub mod table;

pub use describe::DescribeTable;
pub use export::{CoefficientRow, ExportError, ExportFormat, Exporter, ModelStatistics};
pub use report::{Report, ReportBuilder, ReportError};
pub use summary::{ModelSummary, SummaryRow};
pub use table::{DEFAULT_CUTOFFS, DEFAULT_DIGITS, RegressionTable, StatRow, latex_escape};
