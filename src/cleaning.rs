//! Cleaning stages. Each stage is a free function over `&mut Table` that builds
//! polars expressions, swaps in the collected result and returns an outcome
//! describing what changed. The [`crate::pipeline::DataPipeline`] chains them and
//! records the outcomes.
//!
//! Every stage treats a table without rows as a no-op. A stage that fails leaves
//! the table as it was; [`optimize`] keeps the columns it converted before the
//! failure.

pub mod garbage;
pub mod impute;
pub mod optimize;
pub mod outliers;
pub mod standardize;
pub mod temporal;

pub use garbage::{GarbageOutcome, remove_garbage};
pub use impute::{ImputeOutcome, impute_missing};
pub use optimize::{OptimizeOptions, OptimizeOutcome, optimize};
pub use outliers::{Bounds, OutlierMethod, OutlierOutcome, column_bounds, handle_outliers};
pub use standardize::{StandardizeOutcome, normalize_column_name, standardize};
pub use temporal::{MarkerTokens, TemporalNamePredicate};
