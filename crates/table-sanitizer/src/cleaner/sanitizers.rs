//! Text normalization for string columns.

use crate::config::{DeclaredType, TableConfig};
use once_cell::sync::Lazy;
use polars::prelude::*;
use regex::Regex;
use tracing::{debug, info, warn};

static DISALLOWED_CHARS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[^a-z0-9\s.,'-]").expect("Invalid regex: disallowed text characters")
});

/// Trim, lower-case and strip characters outside the allowed set.
///
/// The allowed set is lowercase ASCII letters, digits, whitespace, period,
/// comma, apostrophe and hyphen.
///
/// ```rust,ignore
/// assert_eq!(normalize_text("  John_Doe!! "), "johndoe");
/// assert_eq!(normalize_text("O'Brien-Smith, Jr."), "o'brien-smith, jr.");
/// ```
pub fn normalize_text(value: &str) -> String {
    let lowered = value.trim().to_lowercase();
    // stripping can expose whitespace at either end
    DISALLOWED_CHARS.replace_all(&lowered, "").trim().to_string()
}

/// Normalize every textual column except those declared `datetime`.
///
/// A column that cannot be rewritten is logged and left as it was. Returns
/// the names of the columns whose values changed.
pub(crate) fn normalize_text_columns(
    df: DataFrame,
    table_config: &TableConfig,
    processing_steps: &mut Vec<String>,
) -> (DataFrame, Vec<String>) {
    let mut df = df;
    let column_names: Vec<String> = df
        .get_column_names()
        .into_iter()
        .map(|s| s.to_string())
        .collect();
    let mut cleaned = Vec::new();

    for col_name in &column_names {
        if table_config
            .column(col_name)
            .is_some_and(|c| c.dtype == DeclaredType::Datetime)
        {
            continue;
        }

        let Ok(col) = df.column(col_name) else {
            continue;
        };
        let series = col.as_materialized_series();
        if series.dtype() != &DataType::String {
            continue;
        }

        match normalize_series(series) {
            Ok(Some(normalized)) => match df.replace(col_name, normalized) {
                Ok(_) => {
                    debug!("Normalized text in '{}'", col_name);
                    cleaned.push(col_name.clone());
                }
                Err(e) => warn!("Error cleaning text column '{}': {}", col_name, e),
            },
            Ok(None) => {}
            Err(e) => warn!("Error cleaning text column '{}': {}", col_name, e),
        }
    }

    if !cleaned.is_empty() {
        info!("Cleaned text values in {} columns", cleaned.len());
        processing_steps.push(format!(
            "Normalized text in {} columns: {}",
            cleaned.len(),
            cleaned.join(", ")
        ));
    }

    (df, cleaned)
}

/// Normalized copy of a string series, or `None` when nothing would change.
fn normalize_series(series: &Series) -> PolarsResult<Option<Series>> {
    let values = series.str()?;
    let mut changed = false;
    let normalized: Vec<Option<String>> = values
        .into_iter()
        .map(|opt| {
            opt.map(|v| {
                let n = normalize_text(v);
                changed |= n != v;
                n
            })
        })
        .collect();

    Ok(changed.then(|| Series::new(series.name().clone(), normalized)))
}
