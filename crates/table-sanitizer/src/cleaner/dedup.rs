//! Exact-duplicate row removal.

use crate::error::Result;
use polars::prelude::*;
use tracing::debug;

/// Remove rows equal in every column to an earlier row.
///
/// The first occurrence is kept and surviving rows stay in their original
/// order. Returns the number of rows removed.
pub(crate) fn remove_duplicates(
    df: DataFrame,
    processing_steps: &mut Vec<String>,
) -> Result<(DataFrame, usize)> {
    let before = df.height();
    if before == 0 || df.width() == 0 {
        return Ok((df, 0));
    }

    let df = df
        .lazy()
        .unique_stable(None, UniqueKeepStrategy::First)
        .collect()?;
    let removed = before - df.height();

    if removed > 0 {
        let pct = (removed as f64 / before as f64) * 100.0;
        processing_steps.push(format!(
            "Removed {} duplicate rows ({:.1}%)",
            removed, pct
        ));
        debug!("Removed {} duplicate rows", removed);
    } else {
        debug!("No duplicate rows found");
    }

    Ok((df, removed))
}
