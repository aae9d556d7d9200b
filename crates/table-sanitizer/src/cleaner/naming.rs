//! Canonical column names.

use once_cell::sync::Lazy;
use polars::prelude::*;
use regex::Regex;
use std::collections::HashSet;
use tracing::{debug, error, info};

static NON_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\s]").expect("Invalid regex: non-word characters"));
static WHITESPACE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("Invalid regex: whitespace run"));

/// Canonical form of a column label.
///
/// Trims, lower-cases, strips everything that is neither a word character nor
/// whitespace, then collapses whitespace runs into a single underscore.
/// Applying it to its own output returns the output unchanged.
///
/// ```rust,ignore
/// assert_eq!(normalize_column_name("  Customer ID# "), "customer_id");
/// ```
pub fn normalize_column_name(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    let stripped = NON_WORD.replace_all(&lowered, "");
    WHITESPACE_RUN.replace_all(&stripped, "_").into_owned()
}

/// Rename every column of the frame to its canonical form.
///
/// Never fails the table: if the canonical names collide, the frame is
/// returned unchanged and the problem is logged.
pub(crate) fn normalize_column_names(
    df: DataFrame,
    processing_steps: &mut Vec<String>,
) -> DataFrame {
    let original: Vec<String> = df
        .get_column_names()
        .into_iter()
        .map(|s| s.to_string())
        .collect();
    let canonical: Vec<String> = original.iter().map(|n| normalize_column_name(n)).collect();

    if original == canonical {
        debug!("Column names already canonical");
        return df;
    }

    let mut seen = HashSet::with_capacity(canonical.len());
    if let Some(duplicate) = canonical.iter().find(|n| !seen.insert(n.as_str())) {
        error!(
            "Error enforcing column naming: canonical name '{}' would be used twice, keeping original names",
            duplicate
        );
        return df;
    }

    let columns: Vec<Column> = df
        .get_columns()
        .iter()
        .zip(&canonical)
        .map(|(col, name)| col.clone().with_name(name.as_str().into()))
        .collect();

    match DataFrame::new(columns) {
        Ok(renamed) => {
            let changes: Vec<String> = original
                .iter()
                .zip(&canonical)
                .filter(|(before, after)| before != after)
                .map(|(before, after)| format!("'{}' -> '{}'", before, after))
                .collect();
            info!("Standardized column names: {}", changes.join(", "));
            processing_steps.push(format!(
                "Renamed {} columns: {}",
                changes.len(),
                changes.join(", ")
            ));
            renamed
        }
        Err(e) => {
            error!("Error enforcing column naming: {}", e);
            df
        }
    }
}
