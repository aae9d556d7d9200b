//! Table Sanitizer Library
//!
//! A config-driven cleaning engine for tables extracted from a relational
//! source, built with Rust and Polars.
//!
//! # Overview
//!
//! Every table is cleaned by the same seven steps, in this order:
//!
//! - **Name normalization**: column labels become lowercase identifiers
//! - **Type coercion**: each declared column is converted to its declared type;
//!   values that fail to convert become missing
//! - **Column elimination**: sparse non-critical columns are dropped
//! - **Row elimination**: sparse rows, and rows missing a critical value, are dropped
//! - **Imputation**: remaining gaps are filled per column strategy
//! - **Text normalization**: textual values are trimmed, lowercased and stripped
//! - **Deduplication**: exact duplicate rows are removed, first occurrence kept
//!
//! What happens to each table is described by a [`CleaningConfig`] document.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use table_sanitizer::{CleaningConfig, CsvDirectorySink, CsvDirectorySource, EtlRunner, Pipeline};
//!
//! let config = CleaningConfig::from_path("cleaning.json")?;
//! let pipeline = Pipeline::builder()
//!     .config(config)
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {} {}", update.progress * 100.0, update.table, update.message);
//!     })
//!     .build()?;
//!
//! let summary = EtlRunner::new(pipeline).run(
//!     &CsvDirectorySource::new("raw"),
//!     &CsvDirectorySink::new("clean"),
//! )?;
//!
//! println!("Wrote {} tables", summary.tables_written.len());
//! ```
//!
//! # Configuration
//!
//! ```json
//! {
//!   "drop_column_threshold": 0.5,
//!   "drop_row_threshold": 0.5,
//!   "tables": {
//!     "customers": {
//!       "columns": {
//!         "customerid": { "dtype": "string", "critical": true },
//!         "age": { "dtype": "int", "impute": "median" },
//!         "segment": { "dtype": "string", "impute": "constant", "value": "retail" }
//!       }
//!     }
//!   }
//! }
//! ```
//!
//! # Cleaning without I/O
//!
//! [`Pipeline::clean_table`] and [`Pipeline::transform`] work on in-memory
//! DataFrames and never touch a source or sink.

pub mod cleaner;
pub mod config;
pub mod error;
pub mod etl;
pub mod imputers;
pub mod io;
pub mod pipeline;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use cleaner::{TypeCoercer, normalize_column_name, normalize_text};
pub use config::{
    CleaningConfig, CleaningConfigBuilder, ColumnConfig, ConfigValidationError, DeclaredType,
    FillValue, ImputeStrategy, TableConfig,
};
pub use error::{CleaningError, Result, ResultExt};
pub use etl::{CLEANED_SUFFIX, EtlRunner};
pub use imputers::StatisticalImputer;
pub use io::{CsvDirectorySink, CsvDirectorySource, SinkWriter, SourceReader, validate_table_name};
pub use pipeline::{
    CleaningStage, ClosureProgressReporter, Pipeline, PipelineBuilder, ProgressReporter,
    ProgressUpdate,
};
pub use types::{ActionType, CleaningAction, RunSummary, TableReport, TableSet};
pub use utils::{DtypeCategory, get_dtype_category, is_numeric_dtype};
