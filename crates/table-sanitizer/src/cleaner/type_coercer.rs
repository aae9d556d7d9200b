//! Type coercion of configured columns to their declared types.

use super::converters::{to_datetime, to_float, to_int, to_trimmed_string};
use crate::config::{DeclaredType, TableConfig};
use polars::prelude::*;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Converts every configured column to its declared type.
///
/// Columns present in the table but absent from the configuration are left
/// as they are; configured columns missing from the table are ignored.
pub struct TypeCoercer;

impl TypeCoercer {
    /// Coerce the configured columns of a table.
    ///
    /// Returns the table and, per column, the number of values that could not
    /// be represented in the declared type and became missing.
    pub fn coerce_columns(
        &self,
        df: DataFrame,
        table_config: &TableConfig,
        processing_steps: &mut Vec<String>,
    ) -> (DataFrame, BTreeMap<String, usize>) {
        let mut df = df;
        let mut failures = BTreeMap::new();

        debug!("Coercing {} configured columns", table_config.columns.len());

        for column in &table_config.columns {
            let Ok(col) = df.column(&column.name) else {
                debug!("Column '{}' not in table, nothing to coerce", column.name);
                continue;
            };
            let series = col.as_materialized_series().clone();

            match coerce_series(&series, column.dtype) {
                Ok(coerced) => {
                    let failed = coerced.null_count().saturating_sub(series.null_count());
                    if let Err(e) = df.replace(&column.name, coerced) {
                        warn!("Failed to coerce column '{}': {}", column.name, e);
                        continue;
                    }

                    if failed > 0 {
                        info!(
                            "Column '{}': {} values could not be coerced to {} and are now missing",
                            column.name, failed, column.dtype
                        );
                        processing_steps.push(format!(
                            "Coerced '{}' to {} ({} values unparseable)",
                            column.name, column.dtype, failed
                        ));
                        failures.insert(column.name.clone(), failed);
                    } else {
                        debug!("Coerced '{}' to {}", column.name, column.dtype);
                    }
                }
                Err(e) => {
                    warn!(
                        "Failed to coerce column '{}' to {}: {}, leaving it unchanged",
                        column.name, column.dtype, e
                    );
                    processing_steps.push(format!(
                        "Left '{}' unconverted: {}",
                        column.name, e
                    ));
                }
            }
        }

        (df, failures)
    }
}

fn coerce_series(series: &Series, dtype: DeclaredType) -> PolarsResult<Series> {
    match dtype {
        DeclaredType::String => to_trimmed_string(series),
        DeclaredType::Int => to_int(series),
        DeclaredType::Float => to_float(series),
        DeclaredType::Datetime => to_datetime(series),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleaner::converters::datetime_dtype;
    use crate::config::ColumnConfig;

    fn claims_config() -> TableConfig {
        TableConfig::new(vec![
            ColumnConfig::new("claimid", DeclaredType::String).critical(),
            ColumnConfig::new("claimdate", DeclaredType::Datetime),
            ColumnConfig::new("claimamount", DeclaredType::Float),
            ColumnConfig::new("tenure", DeclaredType::Int),
            ColumnConfig::new("not_in_table", DeclaredType::Int),
        ])
    }

    #[test]
    fn test_coerce_columns_to_declared_types() {
        let df = df![
            "claimid" => [" c1 ", "c2", "c3"],
            "claimdate" => ["2024-01-15", "bad date", "2024-02-01"],
            "claimamount" => ["10.5", "n/a", "3"],
            "tenure" => ["4", "5.0", "six"],
            "notes" => [" keep ", "as", "is "],
        ]
        .unwrap();
        let mut steps = Vec::new();

        let (df, failures) = TypeCoercer.coerce_columns(df, &claims_config(), &mut steps);

        assert_eq!(df.column("claimid").unwrap().dtype(), &DataType::String);
        assert_eq!(df.column("claimdate").unwrap().dtype(), &datetime_dtype());
        assert_eq!(df.column("claimamount").unwrap().dtype(), &DataType::Float64);
        assert_eq!(df.column("tenure").unwrap().dtype(), &DataType::Int64);

        let ids = df.column("claimid").unwrap().as_materialized_series().clone();
        assert_eq!(ids.str().unwrap().get(0), Some("c1"));

        // unconfigured columns are not touched
        let notes = df.column("notes").unwrap().as_materialized_series().clone();
        assert_eq!(notes.str().unwrap().get(0), Some(" keep "));

        assert_eq!(failures.get("claimdate"), Some(&1));
        assert_eq!(failures.get("claimamount"), Some(&1));
        assert_eq!(failures.get("tenure"), Some(&1));
        assert!(!failures.contains_key("claimid"));
        assert_eq!(steps.len(), 3);
    }

    #[test]
    fn test_existing_nulls_are_not_failures() {
        let df = df!["tenure" => [Some("1"), None, Some("3")]].unwrap();
        let config = TableConfig::new(vec![ColumnConfig::new("tenure", DeclaredType::Int)]);
        let mut steps = Vec::new();

        let (df, failures) = TypeCoercer.coerce_columns(df, &config, &mut steps);

        assert_eq!(df.column("tenure").unwrap().null_count(), 1);
        assert!(failures.is_empty());
        assert!(steps.is_empty());
    }

    #[test]
    fn test_keeps_row_count() {
        let df = df!["claimamount" => ["x", "y"]].unwrap();
        let config = TableConfig::new(vec![ColumnConfig::new("claimamount", DeclaredType::Float)]);
        let mut steps = Vec::new();

        let (df, failures) = TypeCoercer.coerce_columns(df, &config, &mut steps);

        assert_eq!(df.height(), 2);
        assert_eq!(failures.get("claimamount"), Some(&2));
    }
}
