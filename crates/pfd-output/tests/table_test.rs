//! End-to-end rendering of two nested survey-weighted models.

use ndarray::{Array1, Array2};
use pfd_output::{CoefficientRow, Exporter, ExportFormat, ModelSummary, RegressionTable, StatRow};
use pfd_regress::{DesignMatrix, Wls, WlsResults};

// treated, post, treated_post, age, const; outcome; weight
const ROWS: [[f64; 7]; 10] = [
    [1.0, 0.0, 0.0, 25.0, 1.0, 1.0, 2.0],
    [1.0, 0.0, 0.0, 40.0, 1.0, 0.0, 1.0],
    [1.0, 1.0, 1.0, 33.0, 1.0, 0.0, 3.0],
    [1.0, 1.0, 1.0, 61.0, 1.0, 0.0, 1.0],
    [0.0, 0.0, 0.0, 19.0, 1.0, 1.0, 4.0],
    [0.0, 0.0, 0.0, 52.0, 1.0, 0.0, 2.0],
    [0.0, 1.0, 0.0, 47.0, 1.0, 1.0, 1.0],
    [0.0, 1.0, 0.0, 28.0, 1.0, 1.0, 2.0],
    [0.0, 0.0, 0.0, 70.0, 1.0, 0.0, 1.0],
    [1.0, 1.0, 1.0, 36.0, 1.0, 1.0, 1.0],
];

const NAMES: [&str; 5] = ["treated", "post", "treated_post", "age", "const"];

fn fit(columns: &[usize]) -> WlsResults {
    let x = Array2::from_shape_fn((ROWS.len(), columns.len()), |(i, j)| ROWS[i][columns[j]]);
    let y = Array1::from_iter(ROWS.iter().map(|r| r[5]));
    let w = Array1::from_iter(ROWS.iter().map(|r| r[6]));
    let names = columns.iter().map(|&j| NAMES[j].to_string()).collect();
    Wls::new(DesignMatrix::new("poor", y, names, x, w).unwrap())
        .fit()
        .unwrap()
}

#[test]
fn test_two_model_table() {
    let baseline = fit(&[2, 0, 1, 4]);
    let controls = fit(&[2, 0, 1, 3, 4]);
    let table = RegressionTable::new([&baseline, &controls]);

    assert_eq!(
        table.covariates(),
        vec!["treated_post", "treated", "post", "age", "const"]
    );

    let text = table.render_text();
    let lines: Vec<&str> = text.lines().collect();
    let first_coef = lines
        .iter()
        .position(|l| l.starts_with("treated_post"))
        .unwrap();
    let const_row = lines.iter().position(|l| l.starts_with("const")).unwrap();
    let obs_row = lines
        .iter()
        .position(|l| l.starts_with("Observations"))
        .unwrap();
    assert!(first_coef < const_row && const_row < obs_row);
    assert!(lines[obs_row].contains("10"));

    let latex = table.render_latex();
    assert!(latex.contains("treated\\_post"));
    assert_eq!(latex.matches("\\hline").count(), 6);
}

#[test]
fn test_summary_and_export_agree() {
    let model = fit(&[2, 0, 1, 3, 4]);
    let summary = ModelSummary::new(&model).unwrap();
    let rows = CoefficientRow::from_results("(2)", &model, 0.05).unwrap();

    assert_eq!(summary.rows.len(), rows.len());
    for (s, r) in summary.rows.iter().zip(&rows) {
        assert_eq!(s.term, r.term);
        assert_eq!(s.lower, r.ci_lower);
        assert_eq!(s.upper, r.ci_upper);
    }

    let json = rows.export_to_string(ExportFormat::Json).unwrap();
    assert!(json.contains("\"treated_post\""));
}

#[test]
fn test_stat_rows_can_be_trimmed() {
    let model = fit(&[2, 0, 1, 4]);
    let text = RegressionTable::new([&model])
        .stats(vec![StatRow::Observations, StatRow::RSquared])
        .render_text();

    assert!(text.contains("R²"));
    assert!(!text.contains("Adjusted"));
    assert!(!text.contains("F Statistic"));
}
