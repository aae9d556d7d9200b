//! Progress reporting for the cleaning pipeline.
//!
//! A [`Pipeline`](super::Pipeline) optionally holds a [`ProgressReporter`]
//! and emits an update as each stage of a table starts and completes, plus a
//! terminal update when the table is done or has failed.
//!
//! # Example
//!
//! ```rust,ignore
//! use table_sanitizer::Pipeline;
//!
//! let pipeline = Pipeline::builder()
//!     .config(config)
//!     .on_progress(|update| {
//!         println!("[{}] {:?} {}", update.table, update.stage, update.message);
//!     })
//!     .build()?;
//! ```

use serde::{Deserialize, Serialize};

/// Stages of cleaning one table, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleaningStage {
    /// Canonicalizing column labels
    NameNormalization,
    /// Converting columns to their declared types
    TypeCoercion,
    /// Dropping sparse non-critical columns
    ColumnElimination,
    /// Dropping incomplete rows
    RowElimination,
    /// Filling missing values
    Imputation,
    /// Cleaning textual values
    TextNormalization,
    /// Removing exact-duplicate rows
    Deduplication,
    /// Table cleaned successfully
    Complete,
    /// Table failed with an error
    Failed,
}

impl CleaningStage {
    /// The seven cleaning stages, in the order they run.
    pub const ORDERED: [CleaningStage; 7] = [
        Self::NameNormalization,
        Self::TypeCoercion,
        Self::ColumnElimination,
        Self::RowElimination,
        Self::Imputation,
        Self::TextNormalization,
        Self::Deduplication,
    ];

    /// Returns a human-readable name for the stage.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::NameNormalization => "Normalizing Column Names",
            Self::TypeCoercion => "Coercing Types",
            Self::ColumnElimination => "Dropping Sparse Columns",
            Self::RowElimination => "Dropping Incomplete Rows",
            Self::Imputation => "Imputing Values",
            Self::TextNormalization => "Normalizing Text",
            Self::Deduplication => "Removing Duplicates",
            Self::Complete => "Complete",
            Self::Failed => "Failed",
        }
    }

    /// Share of a table's work attributed to this stage (0.0 - 1.0).
    ///
    /// The weights of the seven cleaning stages sum to 1.0.
    pub fn weight(&self) -> f32 {
        match self {
            Self::NameNormalization => 0.05,
            Self::TypeCoercion => 0.20,
            Self::ColumnElimination => 0.10,
            Self::RowElimination => 0.15,
            Self::Imputation => 0.25,
            Self::TextNormalization => 0.15,
            Self::Deduplication => 0.10,
            Self::Complete | Self::Failed => 0.0,
        }
    }

    /// Returns the cumulative progress at the start of this stage.
    pub fn base_progress(&self) -> f32 {
        match self {
            Self::NameNormalization => 0.0,
            Self::TypeCoercion => 0.05,
            Self::ColumnElimination => 0.25,
            Self::RowElimination => 0.35,
            Self::Imputation => 0.50,
            Self::TextNormalization => 0.75,
            Self::Deduplication => 0.90,
            Self::Complete => 1.0,
            Self::Failed => 0.0,
        }
    }
}

/// Progress of one table through the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// Table being cleaned
    pub table: String,

    /// Current stage
    pub stage: CleaningStage,

    /// Progress through the table (0.0 - 1.0)
    pub progress: f32,

    /// Progress within the current stage (0.0 - 1.0)
    pub stage_progress: f32,

    /// Human-readable message describing current activity
    pub message: String,
}

impl ProgressUpdate {
    pub fn new(
        table: impl Into<String>,
        stage: CleaningStage,
        stage_progress: f32,
        message: impl Into<String>,
    ) -> Self {
        let progress = stage.base_progress() + (stage.weight() * stage_progress);
        Self {
            table: table.into(),
            stage,
            progress: progress.clamp(0.0, 1.0),
            stage_progress: stage_progress.clamp(0.0, 1.0),
            message: message.into(),
        }
    }

    /// Creates a completion progress update.
    pub fn complete(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            stage: CleaningStage::Complete,
            progress: 1.0,
            stage_progress: 1.0,
            message: message.into(),
        }
    }

    /// Creates a failed progress update.
    pub fn failed(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            stage: CleaningStage::Failed,
            progress: 0.0,
            stage_progress: 0.0,
            message: message.into(),
        }
    }
}

/// Receives progress updates while tables are cleaned.
///
/// Implementations must be `Send + Sync` so a pipeline holding one can be
/// moved to and shared with worker threads.
pub trait ProgressReporter: Send + Sync {
    /// Called at the start and end of every stage. Should not block.
    fn report(&self, update: ProgressUpdate);
}

/// Wrapper that implements [`ProgressReporter`] using a closure.
pub struct ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    callback: F,
}

impl<F> ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    /// Creates a new closure-based progress reporter.
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ProgressReporter for ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    fn report(&self, update: ProgressUpdate) {
        (self.callback)(update);
    }
}

static_assertions::assert_impl_all!(ProgressUpdate: Send, Sync);
