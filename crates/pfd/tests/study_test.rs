//! Case-study pipeline on a small synthetic survey.

use approx::assert_relative_eq;
use pfd::data::{DataSource, DesignSpec, DownloadCache, FetchConfig, Fetcher, SurveyFrame};
use pfd::regress::{CovarianceType, DesignMatrix, RegressionError};
use pfd::{DiffInDiff, StudyConfig, StudyError};

const CSV: &str = "\
year,statefip,age,female,poor,w
1980,2,40,1,1,10
1981,2,30,1,1,10
1981,2,45,0,0,20
1981,2,60,1,1,5
1981,2,25,0,0,15
1982,2,35,1,0,10
1982,2,50,0,0,30
1982,2,22,1,1,10
1982,2,41,0,0,10
1981,6,33,1,1,40
1981,6,52,0,0,60
1981,36,28,1,0,50
1981,36,71,0,1,50
1982,6,38,0,1,30
1982,6,44,1,0,70
1982,36,29,0,0,50
1982,36,63,1,1,50
1983,6,30,0,0,10
";

fn survey() -> SurveyFrame {
    SurveyFrame::from_bytes(CSV.as_bytes()).unwrap()
}

#[test]
fn test_dd_equals_difference_of_weighted_means() {
    let results = DiffInDiff::new(StudyConfig::default())
        .run(&survey())
        .unwrap();

    // Alaska: 0.3 -> 1/6; elsewhere: 0.45 -> 0.4
    let expected = (1.0 / 6.0 - 0.3) - (0.4 - 0.45);
    assert_eq!(results.rows, 16);
    assert_relative_eq!(results.dd_estimate, expected, epsilon = 1e-10);
    assert_relative_eq!(
        results.baseline.param("const").unwrap(),
        0.45,
        epsilon = 1e-10
    );
    assert_relative_eq!(
        results.baseline.param("alaska").unwrap(),
        0.3 - 0.45,
        epsilon = 1e-10
    );
    assert_relative_eq!(results.baseline.param("post").unwrap(), -0.05, epsilon = 1e-10);

    assert_eq!(results.with_controls.names.len(), 7);
    assert!(results.dd_estimate_with_controls().is_some());
    assert_eq!(results.baseline.nobs, 16);
    assert_eq!(results.baseline.df_resid, 12.0);
    assert_eq!(results.with_controls.df_resid, 9.0);
}

#[test]
fn test_robust_errors_keep_estimates() {
    let classical = DiffInDiff::new(StudyConfig::default())
        .run(&survey())
        .unwrap();
    let robust = DiffInDiff::new(StudyConfig {
        cov_type: CovarianceType::HC1,
        ..StudyConfig::default()
    })
    .run(&survey())
    .unwrap();

    assert_relative_eq!(classical.dd_estimate, robust.dd_estimate, epsilon = 1e-12);
    assert_eq!(robust.baseline.cov_type, CovarianceType::HC1);
    assert!(
        (classical.baseline.bse[0] - robust.baseline.bse[0]).abs() > 1e-12,
        "robust standard errors should differ"
    );
}

#[test]
fn test_table_and_report() {
    let results = DiffInDiff::new(StudyConfig::default())
        .run(&survey())
        .unwrap();

    let text = results.table().render_text();
    assert!(text.contains("Dependent variable: poor"));
    assert!(text.contains("alaska_post"));
    assert!(text.contains("female"));

    let latex = results.table().render_latex();
    assert!(latex.contains("alaska\\_post"));

    let report = results.report(&DataSource::default(), 18).unwrap();
    assert_eq!(report.rows_loaded, 18);
    assert_eq!(report.rows_analyzed, 16);
    assert_eq!(report.models.len(), 2);
    assert_eq!(report.coefficients.len(), 4 + 7);
    assert!(report.to_json().unwrap().contains("dd_estimate"));
}

#[test]
fn test_years_without_data() {
    let config = StudyConfig {
        years: vec![1999],
        ..StudyConfig::default()
    };
    assert!(matches!(
        DiffInDiff::new(config).run(&survey()),
        Err(StudyError::NoObservations(years)) if years == vec![1999]
    ));
}

#[test]
fn test_boolean_regressors_need_numeric_cast() {
    let sample = survey()
        .derive(&DesignSpec::default())
        .unwrap()
        .filter_years(&[1981, 1982])
        .unwrap();

    let err = DesignMatrix::from_frame(
        sample.frame(),
        "poor",
        &["alaska", "post", "alaska_post"],
        "w",
    )
    .unwrap_err();
    assert!(matches!(err, RegressionError::NonNumericRegressor { .. }));

    let numeric = sample.to_numeric().unwrap();
    assert!(
        DesignMatrix::from_frame(&numeric, "poor", &["alaska", "post", "alaska_post"], "w")
            .is_ok()
    );
}

#[tokio::test]
async fn test_load_through_cache() {
    let url = "https://invalid.example/spm_state.csv";
    let cache = DownloadCache::in_memory().unwrap();
    cache.put(url, CSV.as_bytes()).unwrap();

    let fetcher = Fetcher::new(FetchConfig::default()).unwrap();
    let survey = SurveyFrame::load(&fetcher, &DataSource::Url(url.to_string()), Some(&cache), None)
        .await
        .unwrap();

    let results = DiffInDiff::new(StudyConfig::default()).run(&survey).unwrap();
    assert_eq!(results.rows, 16);
}
