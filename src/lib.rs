//! # datascrub
//!
//! A chainable cleaning pipeline for tabular data. A [`pipeline::DataPipeline`]
//! owns one [`table::Table`] and applies stages to it in place:
//!
//! 1. **standardize**: normalise column names and trim text cells
//! 2. **garbage**: drop duplicate and fully empty rows
//! 3. **impute**: fill numeric gaps with the median, other gaps with the mode
//! 4. **outliers**: cap or remove values outside the IQR fences
//! 5. **optimize**: parse date-named columns, dictionary-encode repetitive text
//!
//! Tables are loaded from CSV, JSON, Parquet, spreadsheets or a SQLite query
//! and exported to CSV, Excel, JSON, Parquet or a SQLite table.
//!
//! ```no_run
//! use datascrub::io::ExportFormat;
//! use datascrub::pipeline::DataPipeline;
//!
//! # fn main() -> datascrub::error::Result<()> {
//! let mut pipeline = DataPipeline::new("dirty.csv");
//! pipeline
//!     .standardize()?
//!     .handle_garbage()
//!     .impute_missing()
//!     .handle_outliers(1.5, "remove")?
//!     .optimize();
//! pipeline.try_export("clean.parquet", ExportFormat::Parquet)?;
//! println!("{}", pipeline.report().summary(pipeline.table().shape()));
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`table`]: the in-memory column store the stages operate on
//! - [`cleaning`]: the stages as free functions over a table
//! - [`pipeline`]: the chainable controller and its run report
//! - [`io`]: ingestion and export adapters
//! - [`config`]: JSON configuration with environment overrides
//! - [`error`]: the crate error type
//! - [`logging`]: tracing subscriber setup

pub mod cleaning;
pub mod config;
pub mod error;
pub mod io;
pub mod logging;
pub mod pipeline;
pub mod table;
