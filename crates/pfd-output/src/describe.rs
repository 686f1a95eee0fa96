//! Rendering of per-column summary statistics.

use pfd_data::ColumnSummary;
use std::fmt;

const STAT_LABELS: [&str; 8] = ["count", "mean", "std", "min", "25%", "50%", "75%", "max"];

/// Table of `describe()` output: one column per variable, one row per
/// statistic.
#[derive(Debug, Clone, PartialEq)]
pub struct DescribeTable {
    summaries: Vec<ColumnSummary>,
    digits: usize,
}

impl DescribeTable {
    /// Wrap column summaries. Values print with six decimals.
    pub const fn new(summaries: Vec<ColumnSummary>) -> Self {
        Self {
            summaries,
            digits: 6,
        }
    }

    /// Set decimal places.
    pub const fn digits(mut self, digits: usize) -> Self {
        self.digits = digits;
        self
    }

    /// Underlying summaries.
    pub fn summaries(&self) -> &[ColumnSummary] {
        &self.summaries
    }

    fn cells(&self, summary: &ColumnSummary) -> [String; 8] {
        let d = self.digits;
        let fmt = |v: f64| {
            if v.is_nan() {
                "NaN".to_string()
            } else {
                format!("{:.*}", d, v)
            }
        };
        [
            format!("{:.*}", d, summary.count as f64),
            fmt(summary.mean),
            fmt(summary.std),
            fmt(summary.min),
            fmt(summary.q25),
            fmt(summary.median),
            fmt(summary.q75),
            fmt(summary.max),
        ]
    }

    /// Format as ASCII table for terminal display.
    pub fn to_ascii_table(&self) -> String {
        let columns: Vec<[String; 8]> = self.summaries.iter().map(|s| self.cells(s)).collect();
        let widths: Vec<usize> = self
            .summaries
            .iter()
            .zip(&columns)
            .map(|(s, cells)| {
                cells
                    .iter()
                    .map(String::len)
                    .chain(std::iter::once(s.name.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let mut output = format!("{:<6}", "");
        for (summary, w) in self.summaries.iter().zip(&widths) {
            output.push_str(&format!("  {:>w$}", summary.name, w = w));
        }
        output.push('\n');

        for (i, label) in STAT_LABELS.iter().enumerate() {
            output.push_str(&format!("{:<6}", label));
            for (cells, w) in columns.iter().zip(&widths) {
                output.push_str(&format!("  {:>w$}", cells[i], w = w));
            }
            output.push('\n');
        }

        output
    }

    /// Format as Markdown.
    pub fn to_markdown(&self) -> String {
        let mut output = String::from("| |");
        for summary in &self.summaries {
            output.push_str(&format!(" {} |", summary.name));
        }
        output.push_str("\n|:---|");
        output.push_str(&"---:|".repeat(self.summaries.len()));
        output.push('\n');

        let columns: Vec<[String; 8]> = self.summaries.iter().map(|s| self.cells(s)).collect();
        for (i, label) in STAT_LABELS.iter().enumerate() {
            output.push_str(&format!("| {} |", label));
            for cells in &columns {
                output.push_str(&format!(" {} |", cells[i]));
            }
            output.push('\n');
        }

        output
    }
}

impl fmt::Display for DescribeTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_ascii_table())
    }
}
