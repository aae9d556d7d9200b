//! Error types for the table cleaning engine.
//!
//! The taxonomy follows the way failures are handled by the pipeline:
//!
//! - configuration errors (missing table configuration, missing critical
//!   columns, malformed declarations) abort the current table and the run;
//! - value-level coercion and text cleaning failures never surface here, they
//!   are recorded as missing values or left unchanged and logged;
//! - I/O and polars errors from the source and sink propagate unchanged.
//!
//! Errors serialize as `{code, message}` so a run summary can carry them.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for the cleaning engine.
#[derive(Error, Debug)]
pub enum CleaningError {
    /// No configuration entry exists for the table being cleaned.
    #[error("No config found for table: {0}")]
    MissingTableConfig(String),

    /// Critical columns declared in configuration are absent from the table.
    #[error("Critical columns missing from table '{table}': {columns:?}")]
    MissingCriticalColumns { table: String, columns: Vec<String> },

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Imputation could not be applied to a column.
    #[error("Failed to impute missing values in column '{column}': {reason}")]
    ImputationFailed { column: String, reason: String },

    /// Column was not found in the table.
    #[error("Column '{0}' not found in table")]
    ColumnNotFound(String),

    /// The sink cannot represent a column as a flat typed column.
    #[error("Column '{column}' in table '{table}' has unsupported type {dtype}")]
    UnsupportedColumnType {
        table: String,
        column: String,
        dtype: String,
    },

    /// Table name failed validation.
    #[error("Invalid table name: {0}")]
    InvalidTableName(String),

    /// The source could not produce any table.
    #[error("No tables could be read: {0}")]
    NoTablesRead(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<CleaningError>,
    },
}

impl CleaningError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        CleaningError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Stable error code, preserved through added context.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MissingTableConfig(_) => "MISSING_TABLE_CONFIG",
            Self::MissingCriticalColumns { .. } => "MISSING_CRITICAL_COLUMNS",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::ImputationFailed { .. } => "IMPUTATION_FAILED",
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::UnsupportedColumnType { .. } => "UNSUPPORTED_COLUMN_TYPE",
            Self::InvalidTableName(_) => "INVALID_TABLE_NAME",
            Self::NoTablesRead(_) => "NO_TABLES_READ",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Whether this error belongs to the configuration class.
    ///
    /// Configuration errors mean the configuration and the extracted data
    /// disagree; rerunning without changing either will fail the same way.
    pub fn is_configuration_error(&self) -> bool {
        match self {
            Self::MissingTableConfig(_)
            | Self::MissingCriticalColumns { .. }
            | Self::InvalidConfig(_)
            | Self::ImputationFailed { .. } => true,
            Self::WithContext { source, .. } => source.is_configuration_error(),
            _ => false,
        }
    }
}

impl Serialize for CleaningError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("CleaningError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for cleaning operations.
pub type Result<T> = std::result::Result<T, CleaningError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| CleaningError::Polars(e).with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(
            CleaningError::MissingTableConfig("claims".to_string()).error_code(),
            "MISSING_TABLE_CONFIG"
        );
        assert_eq!(
            CleaningError::ColumnNotFound("age".to_string()).error_code(),
            "COLUMN_NOT_FOUND"
        );
    }

    #[test]
    fn test_configuration_errors() {
        assert!(CleaningError::MissingTableConfig("t".to_string()).is_configuration_error());
        assert!(
            CleaningError::MissingCriticalColumns {
                table: "t".to_string(),
                columns: vec!["id".to_string()],
            }
            .is_configuration_error()
        );
        let io = std::io::Error::other("disk gone");
        assert!(!CleaningError::Io(io).is_configuration_error());
    }

    #[test]
    fn test_error_serialization() {
        let error = CleaningError::MissingTableConfig("insurance_claims".to_string());
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("MISSING_TABLE_CONFIG"));
        assert!(json.contains("insurance_claims"));
    }

    #[test]
    fn test_with_context() {
        let error = CleaningError::MissingTableConfig("t".to_string())
            .with_context("Failed to clean table 't'");
        assert!(error.to_string().contains("Failed to clean table"));
        assert_eq!(error.error_code(), "MISSING_TABLE_CONFIG");
        assert!(error.is_configuration_error());
    }
}
