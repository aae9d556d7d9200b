//! Imputation module for handling missing values.
//!
//! Strategies are resolved per column from the table configuration:
//! skip, median, mode, constant, or the type-dependent default.

mod statistical;

pub use statistical::StatisticalImputer;
