//! Null-driven column and row elimination.

use crate::config::TableConfig;
use crate::error::{CleaningError, Result};
use crate::utils::null_ratio;
use polars::prelude::*;
use tracing::{debug, error, info};

/// Drop every non-critical column whose null ratio exceeds `threshold`.
///
/// The comparison is strict, and a table with no rows has a ratio of 0 for
/// every column, so nothing is dropped for being empty. Returns the names of
/// the dropped columns in table order.
pub(crate) fn drop_sparse_columns(
    df: DataFrame,
    table_config: &TableConfig,
    threshold: f64,
    processing_steps: &mut Vec<String>,
) -> (DataFrame, Vec<String>) {
    let rows = df.height();

    let sparse: Vec<String> = df
        .get_columns()
        .iter()
        .filter(|col| !table_config.is_critical(col.name()))
        .filter(|col| {
            let ratio = null_ratio(col.null_count(), rows);
            debug!("Column '{}' null ratio {:.3}", col.name(), ratio);
            ratio > threshold
        })
        .map(|col| col.name().to_string())
        .collect();

    if sparse.is_empty() {
        debug!("No columns above null threshold {}", threshold);
        return (df, sparse);
    }

    let names: Vec<PlSmallStr> = sparse.iter().map(|s| s.as_str().into()).collect();
    let df = df.drop_many(names);

    info!(
        "Dropped {} columns with null ratio > {}: {:?}",
        sparse.len(),
        threshold,
        sparse
    );
    processing_steps.push(format!(
        "Dropped {} columns with null ratio > {}: {}",
        sparse.len(),
        threshold,
        sparse.join(", ")
    ));

    (df, sparse)
}

/// Drop rows missing a critical value or whose null ratio exceeds `threshold`.
///
/// The row ratio is taken over the columns still in the table. Every critical
/// column must be present; otherwise the table fails with
/// [`CleaningError::MissingCriticalColumns`]. Returns the number of rows dropped.
pub(crate) fn drop_incomplete_rows(
    df: DataFrame,
    table_name: &str,
    table_config: &TableConfig,
    threshold: f64,
    processing_steps: &mut Vec<String>,
) -> Result<(DataFrame, usize)> {
    let critical = table_config.critical_columns();
    let missing: Vec<String> = critical
        .iter()
        .filter(|name| df.column(name).is_err())
        .map(|name| name.to_string())
        .collect();

    if !missing.is_empty() {
        error!(
            "Critical columns missing from table '{}': {:?}",
            table_name, missing
        );
        return Err(CleaningError::MissingCriticalColumns {
            table: table_name.to_string(),
            columns: missing,
        });
    }

    let before_rows = df.height();
    if before_rows == 0 || df.width() == 0 {
        return Ok((df, 0));
    }

    // Accumulate per-row null counts across columns
    let mut null_counts = Series::new("nulls".into(), vec![0u32; before_rows]);
    for col in df.get_columns() {
        let null_int = col
            .as_materialized_series()
            .is_null()
            .into_series()
            .cast(&DataType::UInt32)?;
        null_counts = (&null_counts + &null_int)?;
    }
    let null_frac = &null_counts.cast(&DataType::Float64)? / df.width() as f64;
    let mut mask = null_frac.lt_eq(threshold)?;

    for name in &critical {
        let present = df.column(name)?.as_materialized_series().is_not_null();
        mask = &mask & &present;
    }

    let df = df.filter(&mask)?;
    let dropped = before_rows - df.height();

    if dropped > 0 {
        info!(
            "Dropped {} rows from '{}' (missing critical value or null ratio > {})",
            dropped, table_name, threshold
        );
        processing_steps.push(format!(
            "Dropped {} rows missing a critical value or with null ratio > {}",
            dropped, threshold
        ));
    } else {
        debug!("No rows dropped from '{}'", table_name);
    }

    Ok((df, dropped))
}
