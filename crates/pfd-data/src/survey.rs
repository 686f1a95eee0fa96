//! Validated survey tables and the column operations used by the case study.

use crate::cache::DownloadCache;
use crate::codec::{decompress, parse_csv};
use crate::describe::{ColumnSummary, summarize};
use crate::error::{DataError, Result};
use crate::source::{DataSource, Fetcher, ProgressFn};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

/// Column names used throughout the survey table.
pub mod columns {
    /// Reporting year.
    pub const YEAR: &str = "year";
    /// FIPS code of the respondent's state.
    pub const STATEFIP: &str = "statefip";
    /// Respondent age.
    pub const AGE: &str = "age";
    /// Respondent is female.
    pub const FEMALE: &str = "female";
    /// SPM unit resources fall below the SPM threshold.
    pub const POOR: &str = "poor";
    /// Survey weight.
    pub const WEIGHT: &str = "w";
    /// Derived: age squared.
    pub const AGE2: &str = "age2";
    /// Derived: year falls in the post-policy period.
    pub const POST: &str = "post";
    /// Intercept column added before fitting.
    pub const CONSTANT: &str = "const";

    /// Columns every survey file must carry.
    pub const REQUIRED: [&str; 6] = [YEAR, STATEFIP, AGE, FEMALE, POOR, WEIGHT];
}

/// Parameters of the difference-in-differences design columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DesignSpec {
    /// FIPS code of the treated state (Alaska is 2).
    pub treated_fips: i64,
    /// Name of the treatment flag column.
    pub treated_name: String,
    /// First year of the policy (the dividend started paying in 1982).
    pub policy_year: i64,
}

impl DesignSpec {
    /// Name of the treatment × post interaction column, e.g. `alaska_post`.
    pub fn interaction_name(&self) -> String {
        format!("{}_{}", self.treated_name, columns::POST)
    }
}

impl Default for DesignSpec {
    fn default() -> Self {
        Self {
            treated_fips: 2,
            treated_name: "alaska".to_string(),
            policy_year: 1982,
        }
    }
}

/// A table of survey observations, one row per respondent-year.
///
/// Construction guarantees the [`columns::REQUIRED`] columns exist with
/// normalised types (`year`/`statefip` as i64, `age`/`w` as f64,
/// `female`/`poor` as bool) and that every weight is non-null and `>= 0`.
#[derive(Debug, Clone)]
pub struct SurveyFrame {
    df: DataFrame,
}

impl SurveyFrame {
    /// Validate and normalise a raw DataFrame.
    pub fn from_frame(mut df: DataFrame) -> Result<Self> {
        for name in columns::REQUIRED {
            if df.column(name).is_err() {
                return Err(DataError::MissingColumn(name.to_string()));
            }
        }

        for (name, dtype) in [
            (columns::YEAR, DataType::Int64),
            (columns::STATEFIP, DataType::Int64),
            (columns::AGE, DataType::Float64),
            (columns::WEIGHT, DataType::Float64),
        ] {
            let cast = cast_numeric(df.column(name)?, &dtype)?;
            df.with_column(cast)?;
        }

        for name in [columns::FEMALE, columns::POOR] {
            let flag = to_flag(df.column(name)?)?;
            df.with_column(flag)?;
        }

        check_weights(&df)?;

        debug!(rows = df.height(), "validated survey frame");
        Ok(Self { df })
    }

    /// Decompress (if gzipped), parse and validate raw file bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let csv = decompress(bytes)?;
        let frame = Self::from_frame(parse_csv(&csv)?)?;
        info!(
            rows = frame.height(),
            columns = frame.df.width(),
            "loaded survey data"
        );
        Ok(frame)
    }

    /// Fetch `source` (through `cache` for remote files) and load it.
    pub async fn load(
        fetcher: &Fetcher,
        source: &DataSource,
        cache: Option<&DownloadCache>,
        progress: Option<&ProgressFn>,
    ) -> Result<Self> {
        let bytes = fetcher.fetch(source, cache, progress).await?;
        Self::from_bytes(&bytes)
    }

    /// Underlying DataFrame.
    pub const fn frame(&self) -> &DataFrame {
        &self.df
    }

    /// Consume into the underlying DataFrame.
    pub fn into_frame(self) -> DataFrame {
        self.df
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.df.height()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.df.height() == 0
    }

    /// Column names in table order.
    pub fn column_names(&self) -> Vec<String> {
        self.df
            .get_column_names()
            .into_iter()
            .map(|name| name.to_string())
            .collect()
    }

    /// First `n` rows.
    pub fn head(&self, n: usize) -> DataFrame {
        self.df.head(Some(n))
    }

    /// Append the design columns: `age2`, `post`, the treatment flag and the
    /// treatment × post interaction. Existing columns of the same name are
    /// replaced.
    pub fn derive(&self, spec: &DesignSpec) -> Result<Self> {
        let treated = spec.treated_name.as_str();
        let interaction = spec.interaction_name();

        let df = self
            .df
            .clone()
            .lazy()
            .with_columns([
                (col(columns::AGE) * col(columns::AGE)).alias(columns::AGE2),
                col(columns::YEAR)
                    .gt_eq(lit(spec.policy_year))
                    .alias(columns::POST),
                col(columns::STATEFIP)
                    .eq(lit(spec.treated_fips))
                    .alias(treated),
            ])
            .with_column(
                col(columns::POST)
                    .and(col(treated))
                    .alias(interaction.as_str()),
            )
            .collect()?;

        debug!(treated, interaction = %interaction, "derived design columns");
        Ok(Self { df })
    }

    /// Keep rows whose year is one of `years`. An empty slice keeps nothing.
    pub fn filter_years(&self, years: &[i64]) -> Result<Self> {
        let predicate = years
            .iter()
            .map(|&year| col(columns::YEAR).eq(lit(year)))
            .reduce(|acc, next| acc.or(next))
            .unwrap_or_else(|| lit(false));

        let df = self.df.clone().lazy().filter(predicate).collect()?;
        debug!(?years, rows = df.height(), "filtered by year");
        Ok(Self { df })
    }

    /// Keep rows where the boolean column `name` is true.
    pub fn filter_flag(&self, name: &str) -> Result<Self> {
        let column = self.column(name)?;
        if column.dtype() != &DataType::Boolean {
            return Err(DataError::NotBoolean {
                column: name.to_string(),
                dtype: column.dtype().to_string(),
            });
        }

        let df = self.df.clone().lazy().filter(col(name)).collect()?;
        Ok(Self { df })
    }

    /// Project onto the named columns.
    pub fn select(&self, names: &[&str]) -> Result<DataFrame> {
        for name in names {
            self.column(name)?;
        }
        Ok(self.df.select(names.iter().copied())?)
    }

    /// Copy of the table with every boolean column cast to 0.0 / 1.0.
    pub fn to_numeric(&self) -> Result<DataFrame> {
        let bool_columns: Vec<Expr> = self
            .df
            .get_columns()
            .iter()
            .filter(|c| c.dtype() == &DataType::Boolean)
            .map(|c| col(c.name().as_str()).cast(DataType::Float64))
            .collect();

        if bool_columns.is_empty() {
            return Ok(self.df.clone());
        }

        Ok(self.df.clone().lazy().with_columns(bool_columns).collect()?)
    }

    /// Summary statistics for every numeric or boolean column.
    pub fn describe(&self) -> Result<Vec<ColumnSummary>> {
        describe_frame(&self.df)
    }

    /// Unweighted mean of `value` per distinct `by`, sorted by `by`.
    pub fn group_mean(&self, by: &str, value: &str) -> Result<DataFrame> {
        self.column(by)?;
        self.column(value)?;

        Ok(self
            .df
            .clone()
            .lazy()
            .group_by([col(by)])
            .agg([col(value).cast(DataType::Float64).mean().alias(value)])
            .sort([by], SortMultipleOptions::default())
            .collect()?)
    }

    /// Weighted mean of `value` per distinct `by`, sorted by `by`.
    pub fn group_weighted_mean(&self, by: &str, value: &str, weight: &str) -> Result<DataFrame> {
        self.column(by)?;
        self.column(value)?;
        self.column(weight)?;

        Ok(self
            .df
            .clone()
            .lazy()
            .group_by([col(by)])
            .agg([((col(value).cast(DataType::Float64) * col(weight)).sum()
                / col(weight).sum())
            .alias(value)])
            .sort([by], SortMultipleOptions::default())
            .collect()?)
    }

    /// Sorted distinct values of `value` per distinct `by`.
    pub fn group_unique(&self, by: &str, value: &str) -> Result<DataFrame> {
        self.column(by)?;
        self.column(value)?;

        Ok(self
            .df
            .clone()
            .lazy()
            .group_by([col(by)])
            .agg([col(value).unique().sort(SortOptions::default()).alias(value)])
            .sort([by], SortMultipleOptions::default())
            .collect()?)
    }

    /// Unweighted mean of a column (the share of records).
    pub fn mean(&self, name: &str) -> Result<Option<f64>> {
        let values: Vec<f64> = numeric_values(&self.df, name)?.into_iter().flatten().collect();
        if values.is_empty() {
            return Ok(None);
        }
        Ok(Some(values.iter().sum::<f64>() / values.len() as f64))
    }

    /// Weighted mean of a column (the population rate). Rows where either
    /// value is null are skipped; `None` when the total weight is zero.
    pub fn weighted_mean(&self, name: &str, weight: &str) -> Result<Option<f64>> {
        let values = numeric_values(&self.df, name)?;
        let weights = numeric_values(&self.df, weight)?;

        let (num, den) = values
            .iter()
            .zip(&weights)
            .filter_map(|(v, w)| Some(((*v)?, (*w)?)))
            .fold((0.0, 0.0), |(num, den), (v, w)| (num + v * w, den + w));

        if den <= 0.0 {
            return Ok(None);
        }
        Ok(Some(num / den))
    }

    /// Numeric values of a column; flags read as 0.0 / 1.0.
    pub fn column_f64(&self, name: &str) -> Result<Vec<Option<f64>>> {
        numeric_values(&self.df, name)
    }

    fn column(&self, name: &str) -> Result<&Column> {
        self.df
            .column(name)
            .map_err(|_| DataError::MissingColumn(name.to_string()))
    }
}

impl fmt::Display for SurveyFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.df)
    }
}

/// Append a `const` column of ones (no-op when one already exists).
pub fn add_constant(df: &DataFrame) -> Result<DataFrame> {
    if df.column(columns::CONSTANT).is_ok() {
        return Ok(df.clone());
    }

    Ok(df
        .clone()
        .lazy()
        .with_column(lit(1.0).alias(columns::CONSTANT))
        .collect()?)
}

/// Summary statistics for every numeric or boolean column of `df`.
pub fn describe_frame(df: &DataFrame) -> Result<Vec<ColumnSummary>> {
    let mut summaries = Vec::new();

    for column in df.get_columns() {
        let name = column.name().as_str();
        let values: Vec<f64> = match numeric_values(df, name) {
            Ok(values) => values.into_iter().flatten().collect(),
            Err(DataError::NonNumeric { .. }) => continue,
            Err(e) => return Err(e),
        };
        summaries.push(summarize(name, &values));
    }

    Ok(summaries)
}

/// Read a column as `f64`. Booleans read as 0.0 / 1.0; strings are rejected.
pub fn numeric_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let column = df
        .column(name)
        .map_err(|_| DataError::MissingColumn(name.to_string()))?;

    match column.dtype() {
        DataType::String => Err(DataError::NonNumeric {
            column: name.to_string(),
            dtype: column.dtype().to_string(),
        }),
        DataType::Boolean => Ok(column
            .bool()?
            .into_iter()
            .map(|v| v.map(|b| if b { 1.0 } else { 0.0 }))
            .collect()),
        _ => {
            let cast = column.cast(&DataType::Float64)?;
            Ok(cast.f64()?.into_iter().collect())
        }
    }
}

/// Cast a column to a numeric dtype, failing if any value could not be read.
fn cast_numeric(column: &Column, dtype: &DataType) -> Result<Column> {
    let cast = column.cast(dtype)?;
    if cast.null_count() > column.null_count() {
        return Err(DataError::NonNumeric {
            column: column.name().to_string(),
            dtype: column.dtype().to_string(),
        });
    }
    Ok(cast)
}

/// Normalise an indicator column stored as bool, 0/1 numbers or
/// `true`/`false` strings.
fn to_flag(column: &Column) -> Result<Series> {
    let name = column.name().clone();

    let values: Vec<Option<bool>> = match column.dtype() {
        DataType::Boolean => return Ok(column.as_materialized_series().clone()),
        DataType::String => column
            .str()?
            .into_iter()
            .map(|v| v.map(|s| parse_flag(name.as_str(), s)).transpose())
            .collect::<Result<_>>()?,
        _ => {
            let cast = cast_numeric(column, &DataType::Float64)?;
            cast.f64()?
                .into_iter()
                .map(|v| v.map(|x| x != 0.0))
                .collect()
        }
    };

    Ok(Series::new(name, values))
}

fn parse_flag(column: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "1" | "1.0" | "yes" => Ok(true),
        "false" | "f" | "0" | "0.0" | "no" => Ok(false),
        other => Err(DataError::Parse(format!(
            "Column {} has non-boolean value '{}'",
            column, other
        ))),
    }
}

fn check_weights(df: &DataFrame) -> Result<()> {
    let weights = df.column(columns::WEIGHT)?.f64()?;
    for (row, value) in weights.into_iter().enumerate() {
        match value {
            Some(w) if w >= 0.0 => {}
            other => return Err(DataError::InvalidWeight { row, value: other }),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const CSV: &str = "\
year,statefip,age,female,poor,w
1981,2,30,True,False,10.0
1981,6,40,False,True,30.0
1982,2,50,False,True,20.0
1982,6,60,True,False,40.0
1983,2,20,True,False,5.0
";

    fn survey() -> SurveyFrame {
        SurveyFrame::from_bytes(CSV.as_bytes()).unwrap()
    }

    #[test]
    fn test_types_are_normalised() {
        let frame = survey();
        let df = frame.frame();
        assert_eq!(df.column("year").unwrap().dtype(), &DataType::Int64);
        assert_eq!(df.column("age").unwrap().dtype(), &DataType::Float64);
        assert_eq!(df.column("female").unwrap().dtype(), &DataType::Boolean);
        assert_eq!(df.column("poor").unwrap().dtype(), &DataType::Boolean);
    }

    #[test]
    fn test_integer_flags_become_bool() {
        let csv = "year,statefip,age,female,poor,w\n1981,2,30,1,0,1.0\n";
        let frame = SurveyFrame::from_bytes(csv.as_bytes()).unwrap();
        let female = frame.frame().column("female").unwrap().bool().unwrap();
        assert_eq!(female.get(0), Some(true));
    }

    #[test]
    fn test_missing_column() {
        let csv = "year,statefip,age,female,poor\n1981,2,30,1,0\n";
        let err = SurveyFrame::from_bytes(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, DataError::MissingColumn(c) if c == "w"));
    }

    #[test]
    fn test_negative_weight_rejected() {
        let csv = "year,statefip,age,female,poor,w\n1981,2,30,1,0,1.0\n1981,2,30,1,0,-2.0\n";
        let err = SurveyFrame::from_bytes(csv.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            DataError::InvalidWeight {
                row: 1,
                value: Some(v)
            } if v == -2.0
        ));
    }

    #[test]
    fn test_derive_columns() {
        let frame = survey().derive(&DesignSpec::default()).unwrap();
        let df = frame.frame();

        let age2 = df.column("age2").unwrap().f64().unwrap();
        assert_eq!(age2.get(0), Some(900.0));

        let post: Vec<Option<bool>> = df.column("post").unwrap().bool().unwrap().into_iter().collect();
        assert_eq!(
            post,
            vec![Some(false), Some(false), Some(true), Some(true), Some(true)]
        );

        let alaska: Vec<Option<bool>> = df.column("alaska").unwrap().bool().unwrap().into_iter().collect();
        assert_eq!(
            alaska,
            vec![Some(true), Some(false), Some(true), Some(false), Some(true)]
        );

        let dd: Vec<Option<bool>> = df
            .column("alaska_post")
            .unwrap()
            .bool()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(
            dd,
            vec![Some(false), Some(false), Some(true), Some(false), Some(true)]
        );
    }

    #[test]
    fn test_derive_twice_replaces() {
        let spec = DesignSpec::default();
        let once = survey().derive(&spec).unwrap();
        let twice = once.derive(&spec).unwrap();
        assert_eq!(once.column_names(), twice.column_names());
    }

    #[test]
    fn test_filter_years() {
        let frame = survey().filter_years(&[1981, 1982]).unwrap();
        assert_eq!(frame.height(), 4);

        let none = survey().filter_years(&[]).unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_filter_flag() {
        let frame = survey().derive(&DesignSpec::default()).unwrap();
        let alaska = frame.filter_flag("alaska").unwrap();
        assert_eq!(alaska.height(), 3);

        assert!(matches!(
            frame.filter_flag("age"),
            Err(DataError::NotBoolean { .. })
        ));
    }

    #[test]
    fn test_to_numeric_casts_flags() {
        let df = survey().to_numeric().unwrap();
        assert_eq!(df.column("poor").unwrap().dtype(), &DataType::Float64);
        assert_eq!(df.column("year").unwrap().dtype(), &DataType::Int64);
    }

    #[test]
    fn test_add_constant_is_idempotent() {
        let df = add_constant(survey().frame()).unwrap();
        let again = add_constant(&df).unwrap();
        assert_eq!(df.width(), again.width());
        assert_eq!(df.column("const").unwrap().f64().unwrap().get(3), Some(1.0));
    }

    #[test]
    fn test_record_share_differs_from_weighted_rate() {
        let frame = survey();
        assert_relative_eq!(frame.mean("age").unwrap().unwrap(), 40.0);
        // 2 of 5 records are poor, but they carry 50 of 105 weight.
        assert_relative_eq!(frame.mean("poor").unwrap().unwrap(), 0.4);
        assert_relative_eq!(
            frame.weighted_mean("poor", "w").unwrap().unwrap(),
            50.0 / 105.0
        );
    }

    #[test]
    fn test_weighted_mean_of_empty_table() {
        let empty = survey().filter_years(&[2020]).unwrap();
        assert!(empty.weighted_mean("poor", "w").unwrap().is_none());
        assert!(empty.mean("poor").unwrap().is_none());
    }

    #[test]
    fn test_group_mean_sorted_by_key() {
        let grouped = survey().group_mean("year", "poor").unwrap();
        assert_eq!(grouped.height(), 3);

        let years: Vec<Option<i64>> = grouped
            .column("year")
            .unwrap()
            .i64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(years, vec![Some(1981), Some(1982), Some(1983)]);

        let means = grouped.column("poor").unwrap().f64().unwrap();
        assert_relative_eq!(means.get(0).unwrap(), 0.5);
        assert_relative_eq!(means.get(2).unwrap(), 0.0);
    }

    #[test]
    fn test_group_weighted_mean() {
        let grouped = survey().group_weighted_mean("year", "poor", "w").unwrap();
        let rates = grouped.column("poor").unwrap().f64().unwrap();
        assert_relative_eq!(rates.get(0).unwrap(), 0.75);
        assert_relative_eq!(rates.get(1).unwrap(), 20.0 / 60.0);
    }

    #[test]
    fn test_group_unique() {
        let frame = survey().derive(&DesignSpec::default()).unwrap();
        let grouped = frame.group_unique("alaska", "statefip").unwrap();
        assert_eq!(grouped.height(), 2);
    }

    #[test]
    fn test_select_unknown_column() {
        assert!(matches!(
            survey().select(&["statefip", "nope"]),
            Err(DataError::MissingColumn(c)) if c == "nope"
        ));
    }
}
