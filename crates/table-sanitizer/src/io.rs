//! Table sources and sinks.
//!
//! The cleaning engine only sees [`TableSet`]s. Where the tables come from
//! and where they go is behind the [`SourceReader`] and [`SinkWriter`]
//! traits; this module ships a CSV-directory implementation of each, one
//! `<table>.csv` file per table.

use crate::error::{CleaningError, Result, ResultExt};
use crate::types::TableSet;
use crate::utils::{DtypeCategory, get_dtype_category};
use once_cell::sync::Lazy;
use polars::prelude::*;
use regex::Regex;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

static TABLE_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("Invalid regex: table name")
});

/// Supplies the raw tables of a run.
pub trait SourceReader {
    /// Read every table this source knows about.
    fn read_tables(&self) -> Result<TableSet>;
}

/// Persists cleaned tables, replacing whatever the destination held.
pub trait SinkWriter {
    fn write_tables(&self, tables: &TableSet) -> Result<()>;
}

/// Check that a table name is a plain identifier.
pub fn validate_table_name(name: &str) -> Result<()> {
    if TABLE_NAME.is_match(name) {
        Ok(())
    } else {
        Err(CleaningError::InvalidTableName(name.to_string()))
    }
}

/// Reads `<dir>/<table>.csv` files with every column as raw text.
#[derive(Debug, Clone)]
pub struct CsvDirectorySource {
    dir: PathBuf,
    tables: Option<Vec<String>>,
}

impl CsvDirectorySource {
    /// Read every `*.csv` file in `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            tables: None,
        }
    }

    /// Read only the named tables.
    pub fn with_tables(mut self, tables: Vec<String>) -> Self {
        self.tables = Some(tables);
        self
    }

    fn table_names(&self) -> Result<Vec<String>> {
        if let Some(tables) = &self.tables {
            return Ok(tables.clone());
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)
            .map_err(CleaningError::from)
            .context(format!("Listing tables in {}", self.dir.display()))?
        {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("csv") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    fn read_table(&self, name: &str) -> Result<DataFrame> {
        validate_table_name(name)?;
        let path = self.dir.join(format!("{}.csv", name));

        let df = CsvReadOptions::default()
            .with_has_header(true)
            // no inference: every column is read as String
            .with_infer_schema_length(Some(0))
            .try_into_reader_with_file_path(Some(path.clone()))?
            .finish()
            .context(format!("Reading {}", path.display()))?;
        Ok(df)
    }
}

impl SourceReader for CsvDirectorySource {
    /// Invalid names and unreadable files are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`CleaningError::NoTablesRead`] if no table could be read.
    fn read_tables(&self) -> Result<TableSet> {
        let mut tables = TableSet::new();

        for name in self.table_names()? {
            match self.read_table(&name) {
                Ok(df) => {
                    info!(
                        "Extracted table '{}' ({} rows, {} columns)",
                        name,
                        df.height(),
                        df.width()
                    );
                    tables.insert(name, df);
                }
                Err(e) => warn!("Skipping table '{}': {}", name, e),
            }
        }

        if tables.is_empty() {
            return Err(CleaningError::NoTablesRead(format!(
                "no readable tables in {}",
                self.dir.display()
            )));
        }

        Ok(tables)
    }
}

/// Writes each table to `<dir>/<table>.csv`, replacing any existing file.
#[derive(Debug, Clone)]
pub struct CsvDirectorySink {
    dir: PathBuf,
}

impl CsvDirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn write_table(&self, name: &str, df: &DataFrame) -> Result<()> {
        let path = self.dir.join(format!("{}.csv", name));
        let tmp_path = self.dir.join(format!(".{}.csv.tmp", name));

        let written = Self::write_csv(&tmp_path, df)
            .context(format!("Writing {}", path.display()))
            .and_then(|()| {
                fs::rename(&tmp_path, &path)
                    .map_err(CleaningError::from)
                    .context(format!("Replacing {}", path.display()))
            });
        if written.is_err() {
            let _ = fs::remove_file(&tmp_path);
        }
        written?;

        debug!("Wrote {}", path.display());
        Ok(())
    }

    fn write_csv(path: &Path, df: &DataFrame) -> Result<()> {
        let mut file = File::create(path)?;
        CsvWriter::new(&mut file)
            .include_header(true)
            .with_separator(b',')
            .with_quote_char(b'"')
            .finish(&mut df.clone())?;
        Ok(())
    }
}

/// Fails if any column holds values a flat file cannot represent.
fn check_flat(name: &str, df: &DataFrame) -> Result<()> {
    for col in df.get_columns() {
        if get_dtype_category(col.dtype()) == DtypeCategory::Nested {
            return Err(CleaningError::UnsupportedColumnType {
                table: name.to_string(),
                column: col.name().to_string(),
                dtype: col.dtype().to_string(),
            });
        }
    }
    Ok(())
}

impl SinkWriter for CsvDirectorySink {
    /// Every table is checked before anything is written. Tables with no
    /// rows are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`CleaningError::UnsupportedColumnType`] for nested columns and
    /// [`CleaningError::InvalidTableName`] for names that are not identifiers.
    fn write_tables(&self, tables: &TableSet) -> Result<()> {
        for (name, df) in tables {
            validate_table_name(name)?;
            check_flat(name, df)?;
        }

        fs::create_dir_all(&self.dir)?;

        for (name, df) in tables {
            if df.height() == 0 {
                warn!("Table '{}' has no rows, not writing it", name);
                continue;
            }
            self.write_table(name, df)?;
            info!("Loaded table '{}' ({} rows)", name, df.height());
        }

        Ok(())
    }
}
