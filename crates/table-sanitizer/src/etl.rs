//! Extract, transform, load.
//!
//! [`EtlRunner`] drives one full run: every table from a [`SourceReader`] is
//! cleaned by the [`Pipeline`] and the results are handed to a
//! [`SinkWriter`] as `<table>_cleaned`. Nothing reaches the sink unless every
//! table was cleaned.

use crate::error::{CleaningError, Result, ResultExt};
use crate::io::{SinkWriter, SourceReader};
use crate::pipeline::Pipeline;
use crate::types::{RunSummary, TableSet};
use std::time::Instant;
use tracing::{error, info};

/// Appended to every table name on load.
pub const CLEANED_SUFFIX: &str = "_cleaned";

/// Runs the cleaning pipeline between a source and a sink.
pub struct EtlRunner {
    pipeline: Pipeline,
}

impl EtlRunner {
    pub fn new(pipeline: Pipeline) -> Self {
        Self { pipeline }
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Extract, clean and load every table.
    ///
    /// # Errors
    ///
    /// Fails if the source yields no tables, if any table fails to clean, or
    /// if the sink rejects the output. The sink is not called in the first
    /// two cases.
    pub fn run(&self, source: &dyn SourceReader, sink: &dyn SinkWriter) -> Result<RunSummary> {
        let start_time = Instant::now();
        info!("Starting ETL run...");

        match self.run_internal(source, sink) {
            Ok(mut summary) => {
                summary.duration_ms = start_time.elapsed().as_millis() as u64;
                info!(
                    "ETL run completed in {:.2}s ({} tables, {} rows)",
                    start_time.elapsed().as_secs_f64(),
                    summary.tables_written.len(),
                    summary.total_rows_written()
                );
                Ok(summary)
            }
            Err(e) => {
                error!(
                    "ETL run failed after {:.2}s: {}",
                    start_time.elapsed().as_secs_f64(),
                    e
                );
                Err(e)
            }
        }
    }

    fn run_internal(&self, source: &dyn SourceReader, sink: &dyn SinkWriter) -> Result<RunSummary> {
        info!("Extracting tables...");
        let tables = source.read_tables().context("Extract failed")?;
        if tables.is_empty() {
            return Err(CleaningError::NoTablesRead(
                "source returned an empty table set".to_string(),
            ));
        }
        info!("Extracted {} tables", tables.len());

        info!("Transforming tables...");
        let (cleaned, reports) = self.pipeline.transform(tables)?;

        let output: TableSet = cleaned
            .into_iter()
            .map(|(name, df)| (format!("{}{}", name, CLEANED_SUFFIX), df))
            .collect();

        info!("Loading {} tables...", output.len());
        sink.write_tables(&output).context("Load failed")?;

        Ok(RunSummary {
            success: true,
            duration_ms: 0,
            tables_written: output.keys().cloned().collect(),
            tables: reports,
            error: None,
        })
    }
}
