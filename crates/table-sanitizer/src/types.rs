use crate::error::CleaningError;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tables keyed by name. Iteration is lexicographic by name.
pub type TableSet = BTreeMap<String, DataFrame>;

// ============================================================================
// Table Report
// ============================================================================

/// What the pipeline did to one table.
///
/// Filled in stage by stage and returned to the caller alongside the cleaned
/// table, so a run can be audited without reading logs.
///
/// # Example
///
/// ```rust,ignore
/// let (cleaned, report) = pipeline.clean_table("insurance_claims", df)?;
/// println!("{}: {} -> {} rows", report.table, report.rows_before, report.rows_after);
/// for action in &report.actions {
///     println!("{} {}", action.action_type.display_name(), action.description);
/// }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableReport {
    /// Name of the table as it was extracted.
    pub table: String,

    /// Number of rows before cleaning.
    pub rows_before: usize,
    /// Number of rows after cleaning.
    pub rows_after: usize,
    /// Number of columns before cleaning.
    pub columns_before: usize,
    /// Number of columns after cleaning.
    pub columns_after: usize,

    /// Columns whose label changed during name normalization.
    pub columns_renamed: usize,
    /// Values per column that could not be coerced and became missing.
    pub coercion_failures: BTreeMap<String, usize>,
    /// Columns dropped for exceeding the column null threshold.
    pub dropped_columns: Vec<String>,
    /// Rows dropped by row elimination.
    pub rows_dropped: usize,
    /// Cells filled per column by imputation.
    pub imputed_values: BTreeMap<String, usize>,
    /// Columns the text normalizer rewrote.
    pub text_columns_cleaned: Vec<String>,
    /// Exact-duplicate rows removed.
    pub duplicates_removed: usize,

    /// Audit trail of structured actions.
    pub actions: Vec<CleaningAction>,
    /// Human-readable processing steps, in order.
    pub processing_steps: Vec<String>,
}

impl TableReport {
    /// Create an empty report for a table.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Self::default()
        }
    }

    /// Add an action to the report.
    pub fn add_action(&mut self, action: CleaningAction) {
        self.actions.push(action);
    }

    /// Total number of values that became missing during coercion.
    pub fn total_coercion_failures(&self) -> usize {
        self.coercion_failures.values().sum()
    }

    /// Total number of cells filled by imputation.
    pub fn total_imputed(&self) -> usize {
        self.imputed_values.values().sum()
    }

    /// Calculate the percentage of rows removed.
    pub fn rows_removed_percentage(&self) -> f32 {
        if self.rows_before == 0 {
            0.0
        } else {
            (self.rows_before.saturating_sub(self.rows_after) as f32 / self.rows_before as f32)
                * 100.0
        }
    }
}

/// A single action taken while cleaning a table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleaningAction {
    /// Type of action performed.
    pub action_type: ActionType,
    /// Target of the action (column name or "table").
    pub target: String,
    /// Human-readable description of the action.
    pub description: String,
    /// Additional details (e.g., fill value, strategy used).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl CleaningAction {
    pub fn new(
        action_type: ActionType,
        target: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            action_type,
            target: target.into(),
            description: description.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Types of actions the pipeline records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    ColumnRenamed,
    TypeCoerced,
    ColumnRemoved,
    RowsRemoved,
    ValueImputed,
    TextNormalized,
    DuplicatesRemoved,
}

impl ActionType {
    /// Get a human-readable display name for the action type.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::ColumnRenamed => "Column Renamed",
            Self::TypeCoerced => "Type Coerced",
            Self::ColumnRemoved => "Column Removed",
            Self::RowsRemoved => "Rows Removed",
            Self::ValueImputed => "Value Imputed",
            Self::TextNormalized => "Text Normalized",
            Self::DuplicatesRemoved => "Duplicates Removed",
        }
    }
}

// ============================================================================
// Run Summary
// ============================================================================

/// Outcome of one extract, transform and load run.
#[derive(Debug, Default, Serialize)]
pub struct RunSummary {
    pub success: bool,
    /// Total execution time in milliseconds.
    pub duration_ms: u64,
    /// Names of the tables handed to the sink.
    pub tables_written: Vec<String>,
    /// One report per cleaned table, in processing order.
    pub tables: Vec<TableReport>,
    /// Set when the run failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<CleaningError>,
}

impl RunSummary {
    pub fn total_rows_written(&self) -> usize {
        self.tables.iter().map(|t| t.rows_after).sum()
    }
}
