//! Side-by-side regression tables in the stargazer layout.
//!
//! Each fitted model is a column; each covariate takes two rows, the
//! coefficient with significance stars and its standard error in
//! parentheses underneath. Model statistics follow below a rule.

use pfd_regress::WlsResults;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Default p-value cut-offs for one, two and three stars.
pub const DEFAULT_CUTOFFS: [f64; 3] = [0.1, 0.05, 0.01];

/// Default number of decimal places.
pub const DEFAULT_DIGITS: usize = 3;

/// Model statistic rows shown below the coefficients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatRow {
    /// Number of observations
    Observations,
    /// R²
    RSquared,
    /// Adjusted R²
    AdjustedRSquared,
    /// √scale with residual degrees of freedom
    ResidualStdError,
    /// F statistic with stars and degrees of freedom
    FStatistic,
}

impl StatRow {
    /// All rows in display order.
    pub const ALL: [Self; 5] = [
        Self::Observations,
        Self::RSquared,
        Self::AdjustedRSquared,
        Self::ResidualStdError,
        Self::FStatistic,
    ];

    const fn label(&self, markup: Markup) -> &'static str {
        match (self, markup) {
            (Self::Observations, _) => "Observations",
            (Self::RSquared, Markup::Latex) => "R$^{2}$",
            (Self::RSquared, _) => "R²",
            (Self::AdjustedRSquared, Markup::Latex) => "Adjusted R$^{2}$",
            (Self::AdjustedRSquared, _) => "Adjusted R²",
            (Self::ResidualStdError, _) => "Residual Std. Error",
            (Self::FStatistic, _) => "F Statistic",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Markup {
    Text,
    Latex,
    Markdown,
}

impl Markup {
    fn stars(self, count: usize) -> String {
        if count == 0 {
            return String::new();
        }
        let stars = "*".repeat(count);
        match self {
            Self::Text => stars,
            Self::Latex => format!("$^{{{}}}$", stars),
            Self::Markdown => stars.replace('*', "\\*"),
        }
    }

    fn escape(self, s: &str) -> String {
        match self {
            Self::Text => s.to_string(),
            Self::Latex => latex_escape(s),
            Self::Markdown => s.replace('|', "\\|").replace('*', "\\*"),
        }
    }
}

/// Escape LaTeX special characters in an identifier.
pub fn latex_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '_' | '&' | '%' | '$' | '#' | '{' | '}' => {
                out.push('\\');
                out.push(c);
            }
            '~' => out.push_str("\\textasciitilde{}"),
            '^' => out.push_str("\\textasciicircum{}"),
            '\\' => out.push_str("\\textbackslash{}"),
            _ => out.push(c),
        }
    }
    out
}

/// Publication-style table of one or more fitted models.
///
/// # Examples
///
/// ```ignore
/// let table = RegressionTable::new([&baseline, &with_controls])
///     .title("Effect of the dividend on SPM poverty")
///     .rename("alaska_post", "Alaska x post");
/// println!("{}", table);
/// println!("{}", table.render_latex());
/// ```
#[derive(Debug, Clone)]
pub struct RegressionTable<'a> {
    models: Vec<&'a WlsResults>,
    title: Option<String>,
    column_labels: Vec<String>,
    covariate_order: Option<Vec<String>>,
    rename: HashMap<String, String>,
    cutoffs: [f64; 3],
    digits: usize,
    stats: Vec<StatRow>,
    show_dependent: bool,
}

impl<'a> RegressionTable<'a> {
    /// Create a table with one column per model.
    pub fn new(models: impl IntoIterator<Item = &'a WlsResults>) -> Self {
        Self {
            models: models.into_iter().collect(),
            title: None,
            column_labels: Vec::new(),
            covariate_order: None,
            rename: HashMap::new(),
            cutoffs: DEFAULT_CUTOFFS,
            digits: DEFAULT_DIGITS,
            stats: StatRow::ALL.to_vec(),
            show_dependent: true,
        }
    }

    /// Set a caption.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Custom column labels. Missing labels fall back to `(1)`, `(2)`, ...
    pub fn column_labels(mut self, labels: Vec<String>) -> Self {
        self.column_labels = labels;
        self
    }

    /// Restrict and order the covariate rows.
    pub fn covariate_order(mut self, order: Vec<String>) -> Self {
        self.covariate_order = Some(order);
        self
    }

    /// Display `from` as `to`.
    pub fn rename(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.rename.insert(from.into(), to.into());
        self
    }

    /// Significance cut-offs for one, two and three stars.
    pub const fn significance_levels(mut self, cutoffs: [f64; 3]) -> Self {
        self.cutoffs = cutoffs;
        self
    }

    /// Decimal places for estimates and statistics.
    pub const fn digits(mut self, digits: usize) -> Self {
        self.digits = digits;
        self
    }

    /// Statistic rows to show, in order.
    pub fn stats(mut self, stats: Vec<StatRow>) -> Self {
        self.stats = stats;
        self
    }

    /// Whether to print the dependent variable header.
    pub const fn show_dependent_variable(mut self, show: bool) -> Self {
        self.show_dependent = show;
        self
    }

    /// Number of model columns.
    pub fn num_models(&self) -> usize {
        self.models.len()
    }

    /// Covariate rows in display order.
    ///
    /// Without an explicit order: first appearance across models, with
    /// constants moved to the end.
    pub fn covariates(&self) -> Vec<String> {
        if let Some(order) = &self.covariate_order {
            return order
                .iter()
                .filter(|name| self.models.iter().any(|m| m.index_of(name).is_some()))
                .cloned()
                .collect();
        }

        let mut regular = Vec::new();
        let mut constants = Vec::new();
        for model in &self.models {
            for name in &model.names {
                if regular.contains(name) || constants.contains(name) {
                    continue;
                }
                if model.constant.as_ref() == Some(name) {
                    constants.push(name.clone());
                } else {
                    regular.push(name.clone());
                }
            }
        }
        regular.extend(constants);
        regular
    }

    fn display_name(&self, name: &str) -> String {
        self.rename
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }

    fn column_label(&self, i: usize) -> String {
        self.column_labels
            .get(i)
            .cloned()
            .unwrap_or_else(|| format!("({})", i + 1))
    }

    fn star_count(&self, p: f64) -> usize {
        if p.is_nan() {
            return 0;
        }
        self.cutoffs.iter().filter(|&&cut| p < cut).count()
    }

    fn outcomes(&self) -> Vec<String> {
        self.models.iter().map(|m| m.outcome.clone()).collect()
    }

    fn same_outcome(&self) -> bool {
        let outcomes = self.outcomes();
        outcomes.windows(2).all(|w| w[0] == w[1])
    }

    /// Coefficient and standard-error rows: `(label, estimates, std errors)`.
    fn coefficient_rows(&self, markup: Markup) -> Vec<(String, Vec<String>, Vec<String>)> {
        let d = self.digits;
        self.covariates()
            .into_iter()
            .map(|name| {
                let mut estimates = Vec::with_capacity(self.models.len());
                let mut errors = Vec::with_capacity(self.models.len());
                for model in &self.models {
                    match model.term(&name) {
                        Some(term) => {
                            estimates.push(format!(
                                "{:.*}{}",
                                d,
                                term.estimate,
                                markup.stars(self.star_count(term.p_value))
                            ));
                            errors.push(format!("({:.*})", d, term.std_error));
                        }
                        None => {
                            estimates.push(String::new());
                            errors.push(String::new());
                        }
                    }
                }
                (markup.escape(&self.display_name(&name)), estimates, errors)
            })
            .collect()
    }

    fn stat_rows(&self, markup: Markup) -> Vec<(String, Vec<String>)> {
        let d = self.digits;
        self.stats
            .iter()
            .map(|stat| {
                let cells = self
                    .models
                    .iter()
                    .map(|m| match stat {
                        StatRow::Observations => m.nobs.to_string(),
                        StatRow::RSquared => format!("{:.*}", d, m.rsquared),
                        StatRow::AdjustedRSquared => format!("{:.*}", d, m.rsquared_adj),
                        StatRow::ResidualStdError => {
                            format!("{:.*} (df={:.0})", d, m.resid_std_err, m.df_resid)
                        }
                        StatRow::FStatistic => format!(
                            "{:.*}{} (df={:.0}; {:.0})",
                            d,
                            m.fvalue,
                            markup.stars(self.star_count(m.f_pvalue)),
                            m.df_model,
                            m.df_resid
                        ),
                    })
                    .collect();
                (stat.label(markup).to_string(), cells)
            })
            .collect()
    }

    fn note(&self, markup: Markup) -> String {
        let [one, two, three] = self.cutoffs;
        match markup {
            Markup::Latex => format!(
                "$^{{*}}$p$<${}; $^{{**}}$p$<${}; $^{{***}}$p$<${}",
                one, two, three
            ),
            Markup::Markdown => format!("\\*p<{}; \\*\\*p<{}; \\*\\*\\*p<{}", one, two, three),
            Markup::Text => format!("*p<{}; **p<{}; ***p<{}", one, two, three),
        }
    }

    /// Plain-text table.
    pub fn render_text(&self) -> String {
        let markup = Markup::Text;
        let coefficients = self.coefficient_rows(markup);
        let stats = self.stat_rows(markup);
        let labels: Vec<String> = (0..self.models.len()).map(|i| self.column_label(i)).collect();
        let note = self.note(markup);

        let label_width = coefficients
            .iter()
            .map(|(label, _, _)| label)
            .chain(stats.iter().map(|(label, _)| label))
            .map(|s| width(s))
            .chain(std::iter::once(width("Note:")))
            .max()
            .unwrap_or(0)
            + 2;

        let cell_width = coefficients
            .iter()
            .flat_map(|(_, est, se)| est.iter().chain(se.iter()))
            .chain(stats.iter().flat_map(|(_, cells)| cells.iter()))
            .chain(labels.iter())
            .chain(self.outcomes().iter())
            .map(|s| width(s))
            .max()
            .unwrap_or(0)
            .max(8)
            + 2;

        let body_width = cell_width * self.models.len();
        let dependent = if self.same_outcome() && !self.models.is_empty() {
            format!("Dependent variable: {}", self.models[0].outcome)
        } else {
            "Dependent variable:".to_string()
        };
        let body_width = body_width.max(width(&dependent)).max(width(&note));
        let total = label_width + body_width;

        let row = |label: &str, cells: &[String]| -> String {
            let mut line = pad_right(label, label_width);
            for cell in cells {
                line.push_str(&center(cell, cell_width));
            }
            line.trim_end().to_string()
        };

        let mut out = Vec::new();
        if let Some(title) = &self.title {
            out.push(center(title, total).trim_end().to_string());
        }
        out.push("=".repeat(total));

        if self.show_dependent {
            out.push(format!(
                "{}{}",
                " ".repeat(label_width),
                center(&dependent, body_width).trim_end()
            ));
            if !self.same_outcome() {
                out.push(row("", &self.outcomes()));
            }
            out.push(format!("{}{}", " ".repeat(label_width), "-".repeat(body_width)));
        }
        out.push(row("", &labels));
        out.push("-".repeat(total));

        for (label, estimates, errors) in &coefficients {
            out.push(row(label, estimates));
            out.push(row("", errors));
        }

        if !stats.is_empty() {
            out.push("-".repeat(total));
            for (label, cells) in &stats {
                out.push(row(label, cells));
            }
        }

        out.push("=".repeat(total));
        out.push(format!("{}{}", pad_right("Note:", label_width), note));
        out.join("\n")
    }

    /// LaTeX `table` environment. Empty when the table holds no models.
    pub fn render_latex(&self) -> String {
        let markup = Markup::Latex;
        let n = self.models.len();
        if n == 0 {
            return String::new();
        }
        let mut out = String::new();

        out.push_str("\\begin{table}[!htbp] \\centering\n");
        if let Some(title) = &self.title {
            out.push_str(&format!("  \\caption{{{}}}\n", latex_escape(title)));
        }
        out.push_str(&format!(
            "\\begin{{tabular}}{{@{{\\extracolsep{{5pt}}}}l{}}}\n",
            "c".repeat(n)
        ));
        out.push_str("\\\\[-1.8ex]\\hline\n\\hline \\\\[-1.8ex]\n");

        if self.show_dependent {
            out.push_str(&format!(
                "& \\multicolumn{{{}}}{{c}}{{\\textit{{Dependent variable:}}}} \\\\\n",
                n
            ));
            out.push_str(&format!("\\cline{{2-{}}}\n", n + 1));
            if self.same_outcome() && n > 0 {
                out.push_str(&format!(
                    "\\\\[-1.8ex] & \\multicolumn{{{}}}{{c}}{{{}}} \\\\\n",
                    n,
                    latex_escape(&self.models[0].outcome)
                ));
            } else {
                let outcomes: Vec<String> =
                    self.outcomes().iter().map(|o| latex_escape(o)).collect();
                out.push_str(&format!("\\\\[-1.8ex] & {} \\\\\n", outcomes.join(" & ")));
            }
        }

        let labels: Vec<String> = (0..n).map(|i| latex_escape(&self.column_label(i))).collect();
        out.push_str(&format!("\\\\[-1.8ex] & {} \\\\\n", labels.join(" & ")));
        out.push_str("\\hline \\\\[-1.8ex]\n");

        for (label, estimates, errors) in self.coefficient_rows(markup) {
            out.push_str(&format!(" {} & {} \\\\\n", label, estimates.join(" & ")));
            out.push_str(&format!("  & {} \\\\\n", errors.join(" & ")));
        }

        let stats = self.stat_rows(markup);
        if !stats.is_empty() {
            out.push_str("\\hline \\\\[-1.8ex]\n");
            for (label, cells) in stats {
                out.push_str(&format!(" {} & {} \\\\\n", label, cells.join(" & ")));
            }
        }

        out.push_str("\\hline\n\\hline \\\\[-1.8ex]\n");
        out.push_str(&format!(
            "\\textit{{Note:}} & \\multicolumn{{{}}}{{r}}{{{}}} \\\\\n",
            n,
            self.note(markup)
        ));
        out.push_str("\\end{tabular}\n\\end{table}");
        out
    }

    /// GitHub-flavoured Markdown table.
    pub fn render_markdown(&self) -> String {
        let markup = Markup::Markdown;
        let n = self.models.len();
        let mut out = String::new();

        if let Some(title) = &self.title {
            out.push_str(&format!("**{}**\n\n", markup.escape(title)));
        }

        let labels: Vec<String> = (0..n).map(|i| markup.escape(&self.column_label(i))).collect();
        out.push_str(&format!("| | {} |\n", labels.join(" | ")));
        out.push_str(&format!("|:---|{}\n", ":---:|".repeat(n)));

        if self.show_dependent {
            let outcomes: Vec<String> = self.outcomes().iter().map(|o| markup.escape(o)).collect();
            out.push_str(&format!(
                "| *Dependent variable:* | {} |\n",
                outcomes.join(" | ")
            ));
        }

        for (label, estimates, errors) in self.coefficient_rows(markup) {
            out.push_str(&format!("| {} | {} |\n", label, estimates.join(" | ")));
            out.push_str(&format!("| | {} |\n", errors.join(" | ")));
        }

        for (label, cells) in self.stat_rows(markup) {
            out.push_str(&format!("| {} | {} |\n", label, cells.join(" | ")));
        }

        out.push_str(&format!("\n*Note:* {}\n", self.note(markup)));
        out
    }
}

impl fmt::Display for RegressionTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render_text())
    }
}

fn width(s: &str) -> usize {
    s.chars().count()
}

fn pad_right(s: &str, w: usize) -> String {
    format!("{}{}", s, " ".repeat(w.saturating_sub(width(s))))
}

fn center(s: &str, w: usize) -> String {
    let total = w.saturating_sub(width(s));
    let left = total / 2;
    format!("{}{}{}", " ".repeat(left), s, " ".repeat(total - left))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use pfd_regress::{DesignMatrix, Wls};

    fn fitted(names: &[&str], x: ndarray::Array2<f64>) -> WlsResults {
        let design = DesignMatrix::new(
            "y",
            array![1.0, 3.0, 2.0, 5.0, 4.0, 6.0],
            names.iter().map(|s| s.to_string()).collect(),
            x,
            array![1.0, 1.0, 1.0, 1.0, 1.0, 1.0],
        )
        .unwrap();
        Wls::new(design).fit().unwrap()
    }

    fn models() -> (WlsResults, WlsResults) {
        let small = fitted(
            &["x_1", "const"],
            array![[1.0, 1.0], [2.0, 1.0], [3.0, 1.0], [4.0, 1.0], [5.0, 1.0], [6.0, 1.0]],
        );
        let large = fitted(
            &["x_1", "z", "const"],
            array![
                [1.0, 0.0, 1.0],
                [2.0, 1.0, 1.0],
                [3.0, 0.0, 1.0],
                [4.0, 1.0, 1.0],
                [5.0, 1.0, 1.0],
                [6.0, 0.0, 1.0]
            ],
        );
        (small, large)
    }

    #[test]
    fn test_covariate_order_constant_last() {
        let (small, large) = models();
        let table = RegressionTable::new([&small, &large]);
        assert_eq!(table.covariates(), vec!["x_1", "z", "const"]);
    }

    #[test]
    fn test_explicit_order_filters_unknown() {
        let (small, large) = models();
        let table = RegressionTable::new([&small, &large]).covariate_order(vec![
            "const".to_string(),
            "missing".to_string(),
            "x_1".to_string(),
        ]);
        assert_eq!(table.covariates(), vec!["const", "x_1"]);
    }

    #[test]
    fn test_star_counts() {
        let (small, _) = models();
        let table = RegressionTable::new([&small]);
        assert_eq!(table.star_count(0.2), 0);
        assert_eq!(table.star_count(0.07), 1);
        assert_eq!(table.star_count(0.03), 2);
        assert_eq!(table.star_count(0.001), 3);
        assert_eq!(table.star_count(f64::NAN), 0);
    }

    #[test]
    fn test_text_render() {
        let (small, large) = models();
        let text = RegressionTable::new([&small, &large])
            .rename("x_1", "slope")
            .to_string();

        assert!(text.contains("Dependent variable: y"));
        assert!(text.contains("(1)"));
        assert!(text.contains("(2)"));
        assert!(text.contains("slope"));
        assert!(!text.contains("x_1"));
        assert!(text.contains("Observations"));
        assert!(text.contains("F Statistic"));
        assert!(text.contains("*p<0.1; **p<0.05; ***p<0.01"));

        // z is absent from the first model
        let z_line = text.lines().find(|l| l.starts_with("z ")).unwrap();
        assert_eq!(z_line.split_whitespace().count(), 2);
    }

    #[test]
    fn test_latex_render_escapes_identifiers() {
        let (small, large) = models();
        let latex = RegressionTable::new([&small, &large])
            .title("Poverty & dividends")
            .render_latex();

        assert!(latex.starts_with("\\begin{table}[!htbp] \\centering"));
        assert!(latex.contains("\\caption{Poverty \\& dividends}"));
        assert!(latex.contains("@{\\extracolsep{5pt}}lcc"));
        assert!(latex.contains("x\\_1"));
        assert!(latex.contains("\\\\[-1.8ex]"));
        assert!(latex.contains("\\textit{Note:}"));
        assert!(latex.contains("R$^{2}$"));
        assert!(latex.ends_with("\\end{table}"));
    }

    #[test]
    fn test_markdown_render() {
        let (small, large) = models();
        let md = RegressionTable::new([&small, &large])
            .column_labels(vec!["Baseline".to_string()])
            .stats(vec![StatRow::Observations])
            .render_markdown();

        assert!(md.starts_with("| | Baseline | (2) |"));
        assert!(md.contains("| Observations | 6 | 6 |"));
        assert!(!md.contains("F Statistic"));
    }

    #[test]
    fn test_different_outcomes_listed() {
        let (small, _) = models();
        let mut other = small.clone();
        other.outcome = "poor".to_string();
        let text = RegressionTable::new([&small, &other]).render_text();
        assert!(text.contains("Dependent variable:"));
        assert!(text.lines().any(|l| l.contains('y') && l.contains("poor")));
    }

    #[test]
    fn test_latex_without_models_is_empty() {
        let table = RegressionTable::new(Vec::<&WlsResults>::new());
        assert_eq!(table.num_models(), 0);
        assert!(table.render_latex().is_empty());
    }

    #[test]
    fn test_latex_escape() {
        assert_eq!(latex_escape("alaska_post"), "alaska\\_post");
        assert_eq!(latex_escape("50%"), "50\\%");
    }
}
