//! Value conversion functions for type coercion.
//!
//! Every converter is total: a value that cannot be represented in the target
//! type becomes null, it never fails the column.

use crate::utils::{as_whole_number, is_numeric_dtype, parse_float, parse_integer};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use polars::prelude::*;

/// Datetime dtype every `datetime` column is coerced to.
pub(crate) fn datetime_dtype() -> DataType {
    DataType::Datetime(TimeUnit::Milliseconds, None)
}

const DATETIME_FORMATS: [&str; 10] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
];

const DATE_FORMATS: [&str; 12] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%d.%m.%Y",
    "%Y%m%d",
    "%d %B %Y",
    "%d %b %Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%b %d %Y",
];

/// Parse a date or datetime written in any of the common layouts.
///
/// RFC 3339 values with an offset are converted to UTC. Ambiguous numeric
/// dates are read month first. Returns epoch milliseconds.
pub(crate) fn parse_datetime_millis(value: &str) -> Option<i64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.timestamp_millis());
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(ndt.and_utc().timestamp_millis());
        }
    }

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, fmt) {
            return date
                .and_hms_opt(0, 0, 0)
                .map(|ndt| ndt.and_utc().timestamp_millis());
        }
    }

    None
}

/// Convert a column to nullable `Int64`.
///
/// Text is parsed as an integer, or as a float with no fractional part.
/// Floats with a fractional part, NaN and out-of-range values become null.
pub(crate) fn to_int(series: &Series) -> PolarsResult<Series> {
    match series.dtype() {
        DataType::Int64 => Ok(series.clone()),
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::Boolean => series.cast(&DataType::Int64),
        dtype if is_numeric_dtype(dtype) => {
            let floats = series.cast(&DataType::Float64)?;
            let values: Vec<Option<i64>> = floats
                .f64()?
                .into_iter()
                .map(|opt| opt.and_then(as_whole_number))
                .collect();
            Ok(Series::new(series.name().clone(), values))
        }
        DataType::String => {
            let values: Vec<Option<i64>> = series
                .str()?
                .into_iter()
                .map(|opt| opt.and_then(parse_integer))
                .collect();
            Ok(Series::new(series.name().clone(), values))
        }
        _ => to_int(&series.cast(&DataType::String)?),
    }
}

/// Convert a column to `Float64`. NaN is treated as missing.
pub(crate) fn to_float(series: &Series) -> PolarsResult<Series> {
    let values: Vec<Option<f64>> = match series.dtype() {
        DataType::String => series
            .str()?
            .into_iter()
            .map(|opt| opt.and_then(parse_float))
            .collect(),
        dtype if is_numeric_dtype(dtype) || dtype == &DataType::Boolean => series
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .map(|opt| opt.filter(|v| !v.is_nan()))
            .collect(),
        _ => return to_float(&series.cast(&DataType::String)?),
    };
    Ok(Series::new(series.name().clone(), values))
}

/// Convert a column to millisecond `Datetime`.
///
/// Text goes through [`parse_datetime_millis`]. Integers are read as Unix
/// timestamps in seconds or milliseconds when they fall in a plausible range.
pub(crate) fn to_datetime(series: &Series) -> PolarsResult<Series> {
    match series.dtype() {
        DataType::Datetime(_, _) | DataType::Date => series.cast(&datetime_dtype()),
        DataType::String => {
            let millis: Vec<Option<i64>> = series
                .str()?
                .into_iter()
                .map(|opt| opt.and_then(parse_datetime_millis))
                .collect();
            Series::new(series.name().clone(), millis).cast(&datetime_dtype())
        }
        dtype if is_numeric_dtype(dtype) => {
            let millis: Vec<Option<i64>> = series
                .cast(&DataType::Float64)?
                .f64()?
                .into_iter()
                .map(|opt| opt.and_then(as_whole_number).and_then(timestamp_to_millis))
                .collect();
            Series::new(series.name().clone(), millis).cast(&datetime_dtype())
        }
        _ => to_datetime(&series.cast(&DataType::String)?),
    }
}

/// Convert a column to text with surrounding whitespace removed.
pub(crate) fn to_trimmed_string(series: &Series) -> PolarsResult<Series> {
    let text = if series.dtype() == &DataType::String {
        series.clone()
    } else {
        series.cast(&DataType::String)?
    };
    let values: Vec<Option<&str>> = text.str()?.into_iter().map(|opt| opt.map(str::trim)).collect();
    Ok(Series::new(series.name().clone(), values))
}

fn timestamp_to_millis(timestamp: i64) -> Option<i64> {
    if timestamp > 1_000_000_000 && timestamp < 2_000_000_000 {
        Some(timestamp * 1000)
    } else if timestamp > 1_000_000_000_000 && timestamp < 2_000_000_000_000 {
        Some(timestamp)
    } else {
        None
    }
}
