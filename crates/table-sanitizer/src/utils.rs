//! Shared utilities for the cleaning engine.
//!
//! This module contains common helper functions used across multiple modules
//! to reduce code duplication and ensure consistency.

use polars::prelude::*;

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Category of a data type for cleaning purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DtypeCategory {
    /// Integer or floating point numbers
    Numeric,
    /// Date or datetime types
    Datetime,
    /// Boolean type
    Boolean,
    /// String/text type
    String,
    /// Lists, arrays and structs
    Nested,
    /// Other/unknown types
    Other,
}

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Check if a DataType is an integer type.
#[inline]
pub fn is_integer_dtype(dtype: &DataType) -> bool {
    is_numeric_dtype(dtype) && !matches!(dtype, DataType::Float32 | DataType::Float64)
}

/// Check if a DataType is a datetime type.
#[inline]
pub fn is_datetime_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Datetime(_, _) | DataType::Date | DataType::Time
    )
}

/// Check if a DataType holds composite values a flat table cannot store.
#[inline]
pub fn is_nested_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::List(_) | DataType::Array(_, _) | DataType::Struct(_)
    )
}

/// Get the category of a DataType.
pub fn get_dtype_category(dtype: &DataType) -> DtypeCategory {
    if is_numeric_dtype(dtype) {
        DtypeCategory::Numeric
    } else if is_datetime_dtype(dtype) {
        DtypeCategory::Datetime
    } else if matches!(dtype, DataType::Boolean) {
        DtypeCategory::Boolean
    } else if matches!(dtype, DataType::String | DataType::Categorical(_, _)) {
        DtypeCategory::String
    } else if is_nested_dtype(dtype) {
        DtypeCategory::Nested
    } else {
        DtypeCategory::Other
    }
}

// =============================================================================
// String Parsing Utilities
// =============================================================================

/// Convert a float to an integer when it has no fractional part and fits.
pub fn as_whole_number(value: f64) -> Option<i64> {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Some(value as i64)
    } else {
        None
    }
}

/// Parse a trimmed string as a float. NaN counts as unparseable.
///
/// ```rust,ignore
/// assert_eq!(parse_float(" 2.5 "), Some(2.5));
/// assert_eq!(parse_float("NaN"), None);
/// ```
pub fn parse_float(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| !v.is_nan())
}

/// Parse a trimmed string as an integer.
///
/// Accepts float notation when the value is whole (`"7.0"`, `"1e3"`).
pub fn parse_integer(s: &str) -> Option<i64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed
        .parse::<i64>()
        .ok()
        .or_else(|| parse_float(trimmed).and_then(as_whole_number))
}

// =============================================================================
// Ratio Utilities
// =============================================================================

/// Fraction of missing cells; an empty set of cells has ratio 0.
#[inline]
pub fn null_ratio(null_count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        null_count as f64 / total as f64
    }
}

// =============================================================================
// Series Transformation Utilities
// =============================================================================

/// Fill null values in a numeric Series with a float, producing `Float64`.
pub fn fill_float_nulls(series: &Series, fill_value: f64) -> PolarsResult<Series> {
    let floats = series.cast(&DataType::Float64)?;
    let values: Vec<Option<f64>> = floats
        .f64()?
        .into_iter()
        .map(|opt| Some(opt.unwrap_or(fill_value)))
        .collect();
    Ok(Series::new(series.name().clone(), values))
}

/// Fill null values in an integer Series, producing `Int64`.
pub fn fill_integer_nulls(series: &Series, fill_value: i64) -> PolarsResult<Series> {
    let ints = series.cast(&DataType::Int64)?;
    let values: Vec<Option<i64>> = ints
        .i64()?
        .into_iter()
        .map(|opt| Some(opt.unwrap_or(fill_value)))
        .collect();
    Ok(Series::new(series.name().clone(), values))
}

/// Fill null values in a boolean Series.
pub fn fill_boolean_nulls(series: &Series, fill_value: bool) -> PolarsResult<Series> {
    let values: Vec<Option<bool>> = series
        .bool()?
        .into_iter()
        .map(|opt| Some(opt.unwrap_or(fill_value)))
        .collect();
    Ok(Series::new(series.name().clone(), values))
}

/// Fill null values in a temporal Series, keeping its dtype.
///
/// `fill_value` is in the physical representation of the dtype.
pub fn fill_temporal_nulls(series: &Series, fill_value: i64) -> PolarsResult<Series> {
    let physical = series.to_physical_repr().cast(&DataType::Int64)?;
    let filled = fill_integer_nulls(&physical, fill_value)?;
    filled.cast(series.dtype())
}

/// Fill null values in a Series with text, converting it to `String`.
pub fn fill_string_nulls(series: &Series, fill_value: &str) -> PolarsResult<Series> {
    let text = if series.dtype() == &DataType::String {
        series.clone()
    } else {
        series.cast(&DataType::String)?
    };
    let values: Vec<Option<&str>> = text
        .str()?
        .into_iter()
        .map(|opt| Some(opt.unwrap_or(fill_value)))
        .collect();
    Ok(Series::new(series.name().clone(), values))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_numeric_dtype() {
        assert!(is_numeric_dtype(&DataType::Int64));
        assert!(is_numeric_dtype(&DataType::Float64));
        assert!(!is_numeric_dtype(&DataType::String));
        assert!(!is_numeric_dtype(&DataType::Boolean));
    }

    #[test]
    fn test_is_integer_dtype() {
        assert!(is_integer_dtype(&DataType::Int64));
        assert!(is_integer_dtype(&DataType::UInt8));
        assert!(!is_integer_dtype(&DataType::Float64));
    }

    #[test]
    fn test_is_nested_dtype() {
        assert!(is_nested_dtype(&DataType::List(Box::new(DataType::Int64))));
        assert!(!is_nested_dtype(&DataType::String));
        assert_eq!(
            get_dtype_category(&DataType::List(Box::new(DataType::String))),
            DtypeCategory::Nested
        );
    }

    #[test]
    fn test_dtype_category() {
        assert_eq!(get_dtype_category(&DataType::Int64), DtypeCategory::Numeric);
        assert_eq!(get_dtype_category(&DataType::Date), DtypeCategory::Datetime);
        assert_eq!(get_dtype_category(&DataType::Boolean), DtypeCategory::Boolean);
        assert_eq!(get_dtype_category(&DataType::String), DtypeCategory::String);
    }

    #[test]
    fn test_parse_integer() {
        assert_eq!(parse_integer("42"), Some(42));
        assert_eq!(parse_integer(" -7 "), Some(-7));
        assert_eq!(parse_integer("3.0"), Some(3));
        assert_eq!(parse_integer("3.5"), None);
        assert_eq!(parse_integer("1,000"), None);
        assert_eq!(parse_integer(""), None);
    }

    #[test]
    fn test_parse_float() {
        assert_eq!(parse_float("2.5"), Some(2.5));
        assert_eq!(parse_float("-1e2"), Some(-100.0));
        assert_eq!(parse_float("nan"), None);
        assert_eq!(parse_float("abc"), None);
    }

    #[test]
    fn test_null_ratio() {
        assert_eq!(null_ratio(0, 0), 0.0);
        assert_eq!(null_ratio(1, 4), 0.25);
        assert_eq!(null_ratio(4, 4), 1.0);
    }

    #[test]
    fn test_fill_float_nulls() {
        let series = Series::new("test".into(), &[Some(1.0), None, Some(3.0)]);
        let filled = fill_float_nulls(&series, 0.0).unwrap();

        assert_eq!(filled.null_count(), 0);
        assert_eq!(filled.get(1).unwrap().try_extract::<f64>().unwrap(), 0.0);
    }

    #[test]
    fn test_fill_integer_nulls() {
        let series = Series::new("test".into(), &[Some(10i64), None, Some(40)]);
        let filled = fill_integer_nulls(&series, 20).unwrap();

        assert_eq!(filled.dtype(), &DataType::Int64);
        assert_eq!(filled.get(1).unwrap().try_extract::<i64>().unwrap(), 20);
    }

    #[test]
    fn test_fill_string_nulls_converts_numbers() {
        let series = Series::new("test".into(), &[Some(1i64), None]);
        let filled = fill_string_nulls(&series, "Unknown").unwrap();

        assert_eq!(filled.dtype(), &DataType::String);
        assert_eq!(filled.str().unwrap().get(0), Some("1"));
        assert_eq!(filled.str().unwrap().get(1), Some("Unknown"));
    }

    #[test]
    fn test_fill_temporal_nulls_keeps_dtype() {
        let dtype = DataType::Datetime(TimeUnit::Milliseconds, None);
        let series = Series::new("when".into(), &[Some(1_000i64), None])
            .cast(&dtype)
            .unwrap();
        let filled = fill_temporal_nulls(&series, 5_000).unwrap();

        assert_eq!(filled.dtype(), &dtype);
        assert_eq!(filled.null_count(), 0);
    }
}
