//! Cleaning stages applied to a single table.
//!
//! This module provides:
//! - Column name normalization
//! - Type coercion to declared types
//! - Null-driven column and row elimination
//! - Text normalization
//! - Duplicate row removal
//!
//! Imputation lives in [`crate::imputers`]. The stages are sequenced by
//! [`crate::pipeline::Pipeline`].

pub(crate) mod converters;
mod dedup;
mod naming;
mod pruning;
mod sanitizers;
mod type_coercer;

pub use naming::normalize_column_name;
pub use sanitizers::normalize_text;
pub use type_coercer::TypeCoercer;

pub(crate) use dedup::remove_duplicates;
pub(crate) use naming::normalize_column_names;
pub(crate) use pruning::{drop_incomplete_rows, drop_sparse_columns};
pub(crate) use sanitizers::normalize_text_columns;
