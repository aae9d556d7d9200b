//! Main cleaning pipeline module.
//!
//! This module provides the core `Pipeline` struct and builder for
//! running the seven cleaning stages over a table, and over a set of tables.

use crate::cleaner::{
    TypeCoercer, drop_incomplete_rows, drop_sparse_columns, normalize_column_names,
    normalize_text_columns, remove_duplicates,
};
use crate::config::{CleaningConfig, ConfigValidationError};
use crate::error::{CleaningError, Result, ResultExt};
use crate::imputers::StatisticalImputer;
use crate::pipeline::progress::{
    ClosureProgressReporter, CleaningStage, ProgressReporter, ProgressUpdate,
};
use crate::types::{ActionType, CleaningAction, TableReport, TableSet};
use polars::prelude::*;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// The table cleaning pipeline.
///
/// Use [`Pipeline::builder()`] to create a new pipeline with custom configuration.
///
/// # Example
///
/// ```rust,ignore
/// use table_sanitizer::{CleaningConfig, Pipeline};
///
/// let config = CleaningConfig::from_path("cleaning.json")?;
/// let pipeline = Pipeline::builder()
///     .config(config)
///     .on_progress(|update| {
///         println!("[{:.0}%] {} {}", update.progress * 100.0, update.table, update.message);
///     })
///     .build()?;
///
/// let (cleaned, reports) = pipeline.transform(tables)?;
/// ```
pub struct Pipeline {
    config: CleaningConfig,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
    type_coercer: TypeCoercer,
    imputer: StatisticalImputer,
}

// A pipeline holds no per-table state and can be shared across threads
static_assertions::assert_impl_all!(Pipeline: Send, Sync);

impl Pipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// The configuration this pipeline cleans with.
    pub fn config(&self) -> &CleaningConfig {
        &self.config
    }

    /// Clean every table, in name order.
    ///
    /// Stops at the first table that fails; no partially cleaned set is
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns the failing table's error with the table name attached as
    /// context.
    pub fn transform(&self, tables: TableSet) -> Result<(TableSet, Vec<TableReport>)> {
        info!("Starting transformation of {} tables", tables.len());

        let mut cleaned = TableSet::new();
        let mut reports = Vec::with_capacity(tables.len());

        for (name, df) in tables {
            let (df, report) = self
                .clean_table(&name, df)
                .context(format!("Failed to clean table '{}'", name))?;
            cleaned.insert(name, df);
            reports.push(report);
        }

        info!("Transformation completed for {} tables", cleaned.len());
        Ok((cleaned, reports))
    }

    /// Run the seven cleaning stages over one table.
    ///
    /// # Errors
    ///
    /// - [`CleaningError::MissingTableConfig`] if the table has no configuration
    /// - [`CleaningError::MissingCriticalColumns`] if a critical column is absent
    /// - [`CleaningError::ImputationFailed`] if a strategy cannot be applied
    pub fn clean_table(&self, table_name: &str, df: DataFrame) -> Result<(DataFrame, TableReport)> {
        match self.clean_table_internal(table_name, df) {
            Ok((df, report)) => {
                self.report_progress(ProgressUpdate::complete(
                    table_name,
                    format!("Cleaned '{}': {} rows, {} columns", table_name, df.height(), df.width()),
                ));
                Ok((df, report))
            }
            Err(e) => {
                self.report_progress(ProgressUpdate::failed(table_name, e.to_string()));
                error!("Error cleaning table '{}': {}", table_name, e);
                Err(e)
            }
        }
    }

    /// Report progress if a reporter is configured.
    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }

    fn begin_stage(&self, table_name: &str, stage: CleaningStage) {
        debug!("[{}] {}", table_name, stage.display_name());
        self.report_progress(ProgressUpdate::new(
            table_name,
            stage,
            0.0,
            format!("{}...", stage.display_name()),
        ));
    }

    fn end_stage(&self, table_name: &str, stage: CleaningStage, message: impl Into<String>) {
        self.report_progress(ProgressUpdate::new(table_name, stage, 1.0, message));
    }

    fn clean_table_internal(
        &self,
        table_name: &str,
        df: DataFrame,
    ) -> Result<(DataFrame, TableReport)> {
        let start_time = Instant::now();
        let table_config = self
            .config
            .table(table_name)
            .ok_or_else(|| CleaningError::MissingTableConfig(table_name.to_string()))?;

        info!(
            "Cleaning table '{}' ({} rows, {} columns)",
            table_name,
            df.height(),
            df.width()
        );

        let mut report = TableReport::new(table_name);
        report.rows_before = df.height();
        report.columns_before = df.width();
        let mut processing_steps: Vec<String> = Vec::new();

        // Step 1: Column names
        self.begin_stage(table_name, CleaningStage::NameNormalization);
        let names_before = column_names(&df);
        let df = normalize_column_names(df, &mut processing_steps);
        report.columns_renamed = names_before
            .iter()
            .zip(column_names(&df))
            .filter(|(before, after)| *before != after)
            .count();
        if report.columns_renamed > 0 {
            report.add_action(CleaningAction::new(
                ActionType::ColumnRenamed,
                "table",
                format!("Renamed {} columns", report.columns_renamed),
            ));
        }
        self.end_stage(
            table_name,
            CleaningStage::NameNormalization,
            format!("Renamed {} columns", report.columns_renamed),
        );

        // Step 2: Type coercion
        self.begin_stage(table_name, CleaningStage::TypeCoercion);
        let (df, failures) =
            self.type_coercer
                .coerce_columns(df, table_config, &mut processing_steps);
        for (column, count) in &failures {
            report.add_action(
                CleaningAction::new(
                    ActionType::TypeCoerced,
                    column,
                    format!("{} values could not be coerced and are now missing", count),
                )
                .with_details(
                    table_config
                        .column(column)
                        .map(|c| c.dtype.to_string())
                        .unwrap_or_default(),
                ),
            );
        }
        report.coercion_failures = failures;
        self.end_stage(
            table_name,
            CleaningStage::TypeCoercion,
            format!("{} values failed coercion", report.total_coercion_failures()),
        );

        // Step 3: Column elimination
        self.begin_stage(table_name, CleaningStage::ColumnElimination);
        let (df, dropped_columns) = drop_sparse_columns(
            df,
            table_config,
            self.config.drop_column_threshold,
            &mut processing_steps,
        );
        for column in &dropped_columns {
            report.add_action(
                CleaningAction::new(ActionType::ColumnRemoved, column, "Dropped sparse column")
                    .with_details(format!(
                        "null ratio > {}",
                        self.config.drop_column_threshold
                    )),
            );
        }
        report.dropped_columns = dropped_columns;
        self.end_stage(
            table_name,
            CleaningStage::ColumnElimination,
            format!("Dropped {} columns", report.dropped_columns.len()),
        );

        // Step 4: Row elimination
        self.begin_stage(table_name, CleaningStage::RowElimination);
        let (df, rows_dropped) = drop_incomplete_rows(
            df,
            table_name,
            table_config,
            self.config.drop_row_threshold,
            &mut processing_steps,
        )?;
        if rows_dropped > 0 {
            report.add_action(CleaningAction::new(
                ActionType::RowsRemoved,
                "table",
                format!("Dropped {} incomplete rows", rows_dropped),
            ));
        }
        report.rows_dropped = rows_dropped;
        self.end_stage(
            table_name,
            CleaningStage::RowElimination,
            format!("Dropped {} rows", rows_dropped),
        );

        // Step 5: Imputation
        self.begin_stage(table_name, CleaningStage::Imputation);
        let (df, imputed) = self
            .imputer
            .impute_missing(df, table_config, &mut processing_steps)?;
        for (column, count) in &imputed {
            report.add_action(
                CleaningAction::new(
                    ActionType::ValueImputed,
                    column,
                    format!("Filled {} missing values", count),
                )
                .with_details(table_config.impute_strategy(column).to_string()),
            );
        }
        report.imputed_values = imputed;
        self.end_stage(
            table_name,
            CleaningStage::Imputation,
            format!("Imputed {} values", report.total_imputed()),
        );

        // Step 6: Text normalization
        self.begin_stage(table_name, CleaningStage::TextNormalization);
        let (df, text_columns) = normalize_text_columns(df, table_config, &mut processing_steps);
        if !text_columns.is_empty() {
            report.add_action(
                CleaningAction::new(
                    ActionType::TextNormalized,
                    "table",
                    format!("Normalized text in {} columns", text_columns.len()),
                )
                .with_details(text_columns.join(", ")),
            );
        }
        report.text_columns_cleaned = text_columns;
        self.end_stage(
            table_name,
            CleaningStage::TextNormalization,
            format!("Normalized {} text columns", report.text_columns_cleaned.len()),
        );

        // Step 7: Deduplication
        self.begin_stage(table_name, CleaningStage::Deduplication);
        let (df, duplicates) = remove_duplicates(df, &mut processing_steps)?;
        if duplicates > 0 {
            report.add_action(CleaningAction::new(
                ActionType::DuplicatesRemoved,
                "table",
                format!("Removed {} duplicate rows", duplicates),
            ));
        }
        report.duplicates_removed = duplicates;
        self.end_stage(
            table_name,
            CleaningStage::Deduplication,
            format!("Removed {} duplicates", duplicates),
        );

        report.rows_after = df.height();
        report.columns_after = df.width();
        report.processing_steps = processing_steps;

        info!(
            "Cleaned table '{}' in {:.2}s: rows {} -> {}, columns {} -> {}",
            table_name,
            start_time.elapsed().as_secs_f64(),
            report.rows_before,
            report.rows_after,
            report.columns_before,
            report.columns_after
        );

        Ok((df, report))
    }
}

fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .into_iter()
        .map(|s| s.to_string())
        .collect()
}

/// Builder for creating a [`Pipeline`] instance.
///
/// Use [`Pipeline::builder()`] to get started.
#[derive(Default)]
pub struct PipelineBuilder {
    config: Option<CleaningConfig>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

static_assertions::assert_impl_all!(PipelineBuilder: Send);

impl PipelineBuilder {
    /// Set the cleaning configuration.
    pub fn config(mut self, config: CleaningConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set a progress reporter for receiving updates during processing.
    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    ///
    /// This is a convenience method for simple progress handling.
    /// For more complex scenarios, use [`progress_reporter`](Self::progress_reporter).
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Build the pipeline.
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> std::result::Result<Pipeline, ConfigValidationError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        Ok(Pipeline {
            config,
            progress_reporter: self.progress_reporter,
            type_coercer: TypeCoercer,
            imputer: StatisticalImputer,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ColumnConfig, DeclaredType, ImputeStrategy, TableConfig};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn customers_config() -> CleaningConfig {
        CleaningConfig::builder()
            .table(
                "customers",
                TableConfig::new(vec![
                    ColumnConfig::new("customerid", DeclaredType::String).critical(),
                    ColumnConfig::new("age", DeclaredType::Int).impute(ImputeStrategy::Median),
                    ColumnConfig::new("name", DeclaredType::String).impute(ImputeStrategy::Mode),
                ]),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_pipeline_builder_default() {
        let pipeline = Pipeline::builder().build().unwrap();
        assert!(pipeline.config().tables.is_empty());
        assert!(pipeline.progress_reporter.is_none());
    }

    #[test]
    fn test_pipeline_builder_rejects_invalid_config() {
        let mut config = CleaningConfig::default();
        config.drop_column_threshold = 2.0;
        assert!(Pipeline::builder().config(config).build().is_err());
    }

    #[test]
    fn test_missing_table_config_is_fatal() {
        let pipeline = Pipeline::builder().config(customers_config()).build().unwrap();
        let df = df!["a" => [1i64]].unwrap();

        let err = pipeline.clean_table("orders", df).unwrap_err();

        assert!(matches!(err, CleaningError::MissingTableConfig(ref t) if t == "orders"));
    }

    #[test]
    fn test_clean_table_runs_all_stages() {
        let pipeline = Pipeline::builder().config(customers_config()).build().unwrap();
        let df = df![
            "CustomerID" => [Some("c1"), Some("c2"), None, Some("c1")],
            " Age " => [Some("30"), None, Some("41"), Some("30")],
            "Name" => [Some(" Ann! "), Some("Bob"), Some("Cy"), Some(" Ann! ")],
        ]
        .unwrap();

        let (df, report) = pipeline.clean_table("customers", df).unwrap();

        assert_eq!(column_names(&df), ["customerid", "age", "name"]);
        assert_eq!(report.columns_renamed, 3);
        assert_eq!(report.rows_dropped, 1);
        assert_eq!(report.imputed_values.get("age"), Some(&1));
        assert_eq!(report.duplicates_removed, 1);
        assert_eq!(report.rows_after, 2);
        assert_eq!(df.column("age").unwrap().dtype(), &DataType::Int64);
        assert_eq!(df.column("age").unwrap().null_count(), 0);

        let names = df.column("name").unwrap().as_materialized_series().clone();
        assert_eq!(names.str().unwrap().get(0), Some("ann"));
        assert!(!report.processing_steps.is_empty());
    }

    #[test]
    fn test_progress_reported_for_every_stage() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();

        let pipeline = Pipeline::builder()
            .config(customers_config())
            .on_progress(move |update| {
                seen_clone.lock().unwrap().push(update.stage);
            })
            .build()
            .unwrap();

        let df = df![
            "customerid" => ["c1"],
            "age" => [Some(1i64)],
            "name" => ["x"],
        ]
        .unwrap();
        pipeline.clean_table("customers", df).unwrap();

        let seen = seen.lock().unwrap();
        // start and end of each stage, then the terminal update
        assert_eq!(seen.len(), CleaningStage::ORDERED.len() * 2 + 1);
        assert_eq!(seen.last(), Some(&CleaningStage::Complete));
    }

    #[test]
    fn test_failure_is_reported() {
        let failures = Arc::new(AtomicUsize::new(0));
        let failures_clone = failures.clone();

        let pipeline = Pipeline::builder()
            .config(customers_config())
            .on_progress(move |update| {
                if update.stage == CleaningStage::Failed {
                    failures_clone.fetch_add(1, Ordering::SeqCst);
                }
            })
            .build()
            .unwrap();

        // critical column never extracted
        let df = df!["age" => [1i64]].unwrap();
        let err = pipeline.clean_table("customers", df).unwrap_err();

        assert_eq!(err.error_code(), "MISSING_CRITICAL_COLUMNS");
        assert_eq!(failures.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_transform_fails_fast_with_table_context() {
        let pipeline = Pipeline::builder().config(customers_config()).build().unwrap();
        let mut tables = TableSet::new();
        tables.insert("customers".to_string(), df!["customerid" => ["c1"]].unwrap());
        tables.insert("unknown".to_string(), df!["x" => [1i64]].unwrap());

        let err = pipeline.transform(tables).unwrap_err();

        assert!(err.to_string().contains("Failed to clean table 'unknown'"));
        assert!(err.is_configuration_error());
    }
}
