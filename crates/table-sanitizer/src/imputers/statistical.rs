//! Statistical imputation methods.
//!
//! Provides the median, mode and constant strategies and the type-dependent
//! `default` strategy. Fill values are computed from the column as it enters
//! imputation, then applied to every missing cell of that column at once.

use crate::config::{FillValue, ImputeStrategy, TableConfig, UNKNOWN_FILL};
use crate::error::{CleaningError, Result};
use crate::utils::{
    as_whole_number, fill_boolean_nulls, fill_float_nulls, fill_integer_nulls, fill_string_nulls,
    fill_temporal_nulls, is_datetime_dtype, is_integer_dtype, is_numeric_dtype,
};
use polars::prelude::*;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Statistical imputation methods for filling missing values.
pub struct StatisticalImputer;

impl StatisticalImputer {
    /// Fill the missing values of every column according to its strategy.
    ///
    /// Columns not declared in the configuration use `default`. Returns the
    /// number of cells filled per column.
    ///
    /// # Errors
    ///
    /// Returns [`CleaningError::ImputationFailed`] when `median` is configured
    /// for a column that is neither numeric nor temporal.
    pub fn impute_missing(
        &self,
        df: DataFrame,
        table_config: &TableConfig,
        processing_steps: &mut Vec<String>,
    ) -> Result<(DataFrame, BTreeMap<String, usize>)> {
        let mut df = df;
        let mut imputed = BTreeMap::new();
        let column_names: Vec<String> = df
            .get_column_names()
            .into_iter()
            .map(|s| s.to_string())
            .collect();

        for col_name in &column_names {
            let before = df.column(col_name)?.null_count();
            if before == 0 {
                continue;
            }

            match table_config.impute_strategy(col_name) {
                ImputeStrategy::Skip => {
                    debug!("Leaving {} missing values in '{}' (skip)", before, col_name);
                    continue;
                }
                ImputeStrategy::Median => Self::apply_median(&mut df, col_name, processing_steps)?,
                ImputeStrategy::Mode => Self::apply_mode(&mut df, col_name, processing_steps)?,
                ImputeStrategy::Constant => {
                    let value = table_config.column(col_name).and_then(|c| c.value.as_ref());
                    Self::apply_constant(&mut df, col_name, value, processing_steps)?
                }
                ImputeStrategy::Default => {
                    Self::apply_default(&mut df, col_name, processing_steps)?
                }
            }

            let after = df.column(col_name)?.null_count();
            imputed.insert(col_name.clone(), before.saturating_sub(after));
        }

        if !imputed.is_empty() {
            info!(
                "Imputed {} missing values across {} columns",
                imputed.values().sum::<usize>(),
                imputed.len()
            );
        }

        Ok((df, imputed))
    }

    /// Fill with the median of the non-missing values, or 0 when there are none.
    ///
    /// Integer columns stay `Int64`; a fractional median is rounded half away
    /// from zero. Temporal columns use the median instant.
    pub fn apply_median(
        df: &mut DataFrame,
        col_name: &str,
        processing_steps: &mut Vec<String>,
    ) -> Result<()> {
        let series = column_series(df, col_name)?;
        let dtype = series.dtype().clone();

        let (filled, shown) = if is_numeric_dtype(&dtype) {
            let median = series.median().unwrap_or(0.0);
            if is_integer_dtype(&dtype) {
                let whole = as_whole_number(median.round()).ok_or_else(|| {
                    CleaningError::ImputationFailed {
                        column: col_name.to_string(),
                        reason: format!("median {} does not fit an integer", median),
                    }
                })?;
                (fill_integer_nulls(&series, whole)?, whole.to_string())
            } else {
                (fill_float_nulls(&series, median)?, median.to_string())
            }
        } else if is_datetime_dtype(&dtype) {
            let physical = series.to_physical_repr().into_owned();
            let median = physical.median().unwrap_or(0.0).round() as i64;
            (fill_temporal_nulls(&series, median)?, median.to_string())
        } else {
            return Err(CleaningError::ImputationFailed {
                column: col_name.to_string(),
                reason: format!("median requires a numeric column, found {}", dtype),
            });
        };

        df.replace(col_name, filled)?;
        info!("Filled '{}' with median: {}", col_name, shown);
        processing_steps.push(format!("Filled '{}' with median: {}", col_name, shown));
        Ok(())
    }

    /// Fill with the most frequent value; ties go to the smallest value.
    ///
    /// A column with no values at all becomes text filled with `"Unknown"`.
    pub fn apply_mode(
        df: &mut DataFrame,
        col_name: &str,
        processing_steps: &mut Vec<String>,
    ) -> Result<()> {
        let series = column_series(df, col_name)?;

        let (filled, shown) = match fill_with_mode(&series)? {
            Some(found) => found,
            None => (
                fill_string_nulls(&series, UNKNOWN_FILL)?,
                UNKNOWN_FILL.to_string(),
            ),
        };

        df.replace(col_name, filled)?;
        info!("Filled '{}' with mode: '{}'", col_name, shown);
        processing_steps.push(format!("Filled '{}' with mode: '{}'", col_name, shown));
        Ok(())
    }

    /// Fill with the configured constant, `"Unknown"` when none is configured.
    ///
    /// A numeric constant keeps a numeric column numeric, and an integer
    /// column integral when the constant is whole; any other combination turns
    /// the column into text.
    pub fn apply_constant(
        df: &mut DataFrame,
        col_name: &str,
        value: Option<&FillValue>,
        processing_steps: &mut Vec<String>,
    ) -> Result<()> {
        let series = column_series(df, col_name)?;
        let dtype = series.dtype().clone();

        let number = value
            .and_then(FillValue::as_f64)
            .filter(|_| is_numeric_dtype(&dtype));

        let filled = match (value, number) {
            (_, Some(number)) => match as_whole_number(number) {
                Some(whole) if is_integer_dtype(&dtype) => fill_integer_nulls(&series, whole)?,
                _ => fill_float_nulls(&series, number)?,
            },
            (Some(FillValue::Bool(v)), None) if dtype == DataType::Boolean => {
                fill_boolean_nulls(&series, *v)?
            }
            (Some(other), None) => fill_string_nulls(&series, &other.to_string())?,
            (None, None) => fill_string_nulls(&series, UNKNOWN_FILL)?,
        };
        let shown = value.map_or_else(|| UNKNOWN_FILL.to_string(), |v| v.to_string());

        df.replace(col_name, filled)?;
        info!("Filled '{}' with constant value: '{}'", col_name, shown);
        processing_steps.push(format!(
            "Filled '{}' with constant value: '{}'",
            col_name, shown
        ));
        Ok(())
    }

    /// Median for numeric columns, mode for everything else.
    pub fn apply_default(
        df: &mut DataFrame,
        col_name: &str,
        processing_steps: &mut Vec<String>,
    ) -> Result<()> {
        let numeric = is_numeric_dtype(column_series(df, col_name)?.dtype());
        if numeric {
            Self::apply_median(df, col_name, processing_steps)
        } else {
            Self::apply_mode(df, col_name, processing_steps)
        }
    }
}

fn column_series(df: &DataFrame, col_name: &str) -> Result<Series> {
    df.column(col_name)
        .map(|c| c.as_materialized_series().clone())
        .map_err(|_| CleaningError::ColumnNotFound(col_name.to_string()))
}

/// Filled series and display form of the mode, or `None` for an all-null column.
fn fill_with_mode(series: &Series) -> PolarsResult<Option<(Series, String)>> {
    let dtype = series.dtype();

    if is_integer_dtype(dtype) {
        let ints = series.cast(&DataType::Int64)?;
        let Some(mode) = most_frequent(ints.i64()?.into_iter().flatten().collect()) else {
            return Ok(None);
        };
        return Ok(Some((fill_integer_nulls(series, mode)?, mode.to_string())));
    }

    if is_numeric_dtype(dtype) {
        let floats = series.cast(&DataType::Float64)?;
        let Some(mode) = most_frequent(floats.f64()?.into_iter().flatten().collect()) else {
            return Ok(None);
        };
        return Ok(Some((fill_float_nulls(series, mode)?, mode.to_string())));
    }

    if is_datetime_dtype(dtype) {
        let physical = series.to_physical_repr().cast(&DataType::Int64)?;
        let Some(mode) = most_frequent(physical.i64()?.into_iter().flatten().collect()) else {
            return Ok(None);
        };
        let filled = fill_temporal_nulls(series, mode)?;
        let shown = filled
            .get(0)
            .map(|v| v.to_string())
            .unwrap_or_else(|_| mode.to_string());
        return Ok(Some((filled, shown)));
    }

    match dtype {
        DataType::Boolean => {
            let Some(mode) = most_frequent(series.bool()?.into_iter().flatten().collect()) else {
                return Ok(None);
            };
            Ok(Some((fill_boolean_nulls(series, mode)?, mode.to_string())))
        }
        DataType::String => {
            let Some(mode) = most_frequent(series.str()?.into_iter().flatten().collect()) else {
                return Ok(None);
            };
            Ok(Some((fill_string_nulls(series, mode)?, mode.to_string())))
        }
        _ => fill_with_mode(&series.cast(&DataType::String)?),
    }
}

/// Most frequent value, breaking ties by taking the smallest.
fn most_frequent<T: PartialOrd + Copy>(mut values: Vec<T>) -> Option<T> {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    values
        .chunk_by(|a, b| a == b)
        .fold(None, |best: Option<(T, usize)>, run| match best {
            Some((_, count)) if count >= run.len() => best,
            _ => Some((run[0], run.len())),
        })
        .map(|(value, _)| value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ColumnConfig, DeclaredType};

    fn column(df: &DataFrame, name: &str) -> Series {
        df.column(name).unwrap().as_materialized_series().clone()
    }

    #[test]
    fn test_most_frequent_prefers_smallest_on_tie() {
        assert_eq!(most_frequent(vec![3, 1, 3, 1, 2]), Some(1));
        assert_eq!(most_frequent(vec!["b", "a", "b"]), Some("b"));
        assert_eq!(most_frequent(Vec::<i64>::new()), None);
    }

    #[test]
    fn test_median_fills_with_median_of_present_values() {
        let mut df = df!["amount" => [Some(10i64), Some(20), None, Some(40)]].unwrap();
        let mut steps = Vec::new();

        StatisticalImputer::apply_median(&mut df, "amount", &mut steps).unwrap();

        let amount = column(&df, "amount");
        assert_eq!(amount.dtype(), &DataType::Int64);
        assert_eq!(amount.get(2).unwrap().try_extract::<i64>().unwrap(), 20);
        assert_eq!(steps.len(), 1);
    }

    #[test]
    fn test_strategy_on_absent_column() {
        let mut df = df!["a" => [Some(1i64), None]].unwrap();
        let mut steps = Vec::new();

        let err = StatisticalImputer::apply_mode(&mut df, "b", &mut steps).unwrap_err();

        assert!(matches!(err, CleaningError::ColumnNotFound(ref c) if c == "b"));
    }

    #[test]
    fn test_fractional_median_of_integers_is_rounded() {
        let mut df = df!["n" => [Some(1i64), Some(2), None, Some(3), Some(4)]].unwrap();
        let mut steps = Vec::new();

        StatisticalImputer::apply_median(&mut df, "n", &mut steps).unwrap();

        // median of 1, 2, 3, 4 is 2.5
        let n = column(&df, "n");
        assert_eq!(n.dtype(), &DataType::Int64);
        assert_eq!(n.get(2).unwrap().try_extract::<i64>().unwrap(), 3);
    }

    #[test]
    fn test_median_of_all_missing_is_zero() {
        let mut df = df!["amount" => [None::<f64>, None]].unwrap();
        let mut steps = Vec::new();

        StatisticalImputer::apply_median(&mut df, "amount", &mut steps).unwrap();

        let amount = column(&df, "amount");
        assert_eq!(amount.null_count(), 0);
        assert_eq!(amount.get(0).unwrap().try_extract::<f64>().unwrap(), 0.0);
    }

    #[test]
    fn test_median_on_text_is_fatal() {
        let mut df = df!["city" => [Some("paris"), None]].unwrap();
        let mut steps = Vec::new();

        let err = StatisticalImputer::apply_median(&mut df, "city", &mut steps).unwrap_err();

        assert!(matches!(err, CleaningError::ImputationFailed { ref column, .. } if column == "city"));
    }

    #[test]
    fn test_mode_fills_most_frequent() {
        let mut df = df!["status" => [Some("open"), Some("closed"), Some("open"), None]].unwrap();
        let mut steps = Vec::new();

        StatisticalImputer::apply_mode(&mut df, "status", &mut steps).unwrap();

        assert_eq!(column(&df, "status").str().unwrap().get(3), Some("open"));
    }

    #[test]
    fn test_mode_of_all_missing_is_unknown() {
        let mut df = df!["score" => [None::<f64>, None]].unwrap();
        let mut steps = Vec::new();

        StatisticalImputer::apply_mode(&mut df, "score", &mut steps).unwrap();

        let score = column(&df, "score");
        assert_eq!(score.dtype(), &DataType::String);
        assert_eq!(score.str().unwrap().get(0), Some(UNKNOWN_FILL));
    }

    #[test]
    fn test_constant_defaults_to_unknown() {
        let mut df = df!["reason" => [Some("late"), None]].unwrap();
        let mut steps = Vec::new();

        StatisticalImputer::apply_constant(&mut df, "reason", None, &mut steps).unwrap();

        assert_eq!(column(&df, "reason").str().unwrap().get(1), Some("Unknown"));
    }

    #[test]
    fn test_numeric_constant_keeps_numeric_column() {
        let mut df = df!["visits" => [Some(3i64), None]].unwrap();
        let mut steps = Vec::new();

        StatisticalImputer::apply_constant(&mut df, "visits", Some(&FillValue::Int(0)), &mut steps)
            .unwrap();

        let visits = column(&df, "visits");
        assert_eq!(visits.dtype(), &DataType::Int64);
        assert_eq!(visits.get(1).unwrap().try_extract::<i64>().unwrap(), 0);
    }

    #[test]
    fn test_whole_float_constant_keeps_integer_column() {
        let mut df = df!["visits" => [Some(3i64), None]].unwrap();
        let mut steps = Vec::new();

        StatisticalImputer::apply_constant(&mut df, "visits", Some(&FillValue::Float(2.0)), &mut steps)
            .unwrap();

        let visits = column(&df, "visits");
        assert_eq!(visits.dtype(), &DataType::Int64);
        assert_eq!(visits.get(1).unwrap().try_extract::<i64>().unwrap(), 2);
    }

    #[test]
    fn test_impute_missing_resolves_strategies() {
        let config = TableConfig::new(vec![
            ColumnConfig::new("customerid", DeclaredType::String).critical(),
            ColumnConfig::new("age", DeclaredType::Int).impute(ImputeStrategy::Median),
            ColumnConfig::new("status", DeclaredType::String)
                .value(FillValue::Text("pending".to_string())),
        ]);
        let df = df![
            "customerid" => [Some("a"), None, Some("c")],
            "age" => [Some(30i64), None, Some(50)],
            "status" => [None, Some("done"), None],
            "city" => [Some("rome"), None, Some("rome")],
        ]
        .unwrap();
        let mut steps = Vec::new();

        let (df, imputed) = StatisticalImputer
            .impute_missing(df, &config, &mut steps)
            .unwrap();

        // skip leaves the critical column untouched
        assert_eq!(df.column("customerid").unwrap().null_count(), 1);
        assert_eq!(column(&df, "age").get(1).unwrap().try_extract::<i64>().unwrap(), 40);
        assert_eq!(column(&df, "status").str().unwrap().get(0), Some("pending"));
        // undeclared text column falls back to mode
        assert_eq!(column(&df, "city").str().unwrap().get(1), Some("rome"));

        assert!(!imputed.contains_key("customerid"));
        assert_eq!(imputed.get("age"), Some(&1));
        assert_eq!(imputed.get("status"), Some(&2));
        assert_eq!(imputed.get("city"), Some(&1));
        assert_eq!(steps.len(), 3);
    }
}
