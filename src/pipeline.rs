//! Pipeline controller: one owned table, a run report and chainable stages.
//!
//! Stages can be invoked in any order; the natural one is
//! standardize → garbage → impute → outliers → optimize.
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
//!     .handle_outliers(1.5, "cap")?
//!     .optimize()
//!     .export("clean.csv", ExportFormat::Csv);
//! # Ok(())
//! # }
//! ```
//!
//! A source that cannot be loaded yields an empty table; every stage is then a
//! no-op and export only logs a warning.

pub mod report;

pub use report::{RunReport, StageEvent};

use crate::cleaning::{self, OptimizeOptions, OutlierMethod};
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::io::{self, ExportFormat, ExportOptions, Source};
use crate::table::Table;

pub struct DataPipeline {
    table: Table,
    report: RunReport,
    optimize_options: OptimizeOptions,
    export_options: ExportOptions,
}

impl DataPipeline {
    /// Loads `source` with default settings.
    pub fn new(source: impl Into<Source>) -> Self {
        Self::with_config(source, &PipelineConfig::default())
    }

    /// Loads `source`; a load failure is logged and replaced by an empty table.
    pub fn with_config(source: impl Into<Source>, config: &PipelineConfig) -> Self {
        let source = source.into();
        let table = match io::load(&source, &config.ingest_options()) {
            Ok(table) => table,
            Err(e) => {
                tracing::error!("Failed to load {source}: {e}");
                Table::empty()
            }
        };
        let mut pipeline = Self::from_table(table);
        pipeline.configure(config);
        pipeline
    }

    pub fn from_table(table: Table) -> Self {
        let (rows, cols) = table.shape();
        tracing::info!("Data loaded. Rows: {rows}, Columns: {cols}");
        Self {
            report: RunReport::new((rows, cols)),
            table,
            optimize_options: OptimizeOptions::default(),
            export_options: ExportOptions::default(),
        }
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn into_table(self) -> Table {
        self.table
    }

    pub fn report(&self) -> &RunReport {
        &self.report
    }

    /// Applies the optimisation and export settings of `config`.
    pub fn configure(&mut self, config: &PipelineConfig) -> &mut Self {
        self.optimize_options = config.optimize_options();
        self.export_options = config.export_options();
        self
    }

    pub fn set_optimize_options(&mut self, options: OptimizeOptions) -> &mut Self {
        self.optimize_options = options;
        self
    }

    /// Normalises column names and trims text cells.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::ScrubError::ColumnCollision`] when two names
    /// normalise to the same string; the table is unchanged.
    pub fn standardize(&mut self) -> Result<&mut Self> {
        if self.table.is_empty() {
            tracing::warn!("Empty table, skipping standardisation");
            return Ok(self);
        }
        let outcome = cleaning::standardize(&mut self.table)?;
        self.report.renamed_columns += outcome.renamed_columns;
        self.report.trimmed_cells += outcome.trimmed_cells;
        self.report.record(
            "standardize",
            format!(
                "Column names and text standardised ({} renamed, {} cells trimmed)",
                outcome.renamed_columns, outcome.trimmed_cells
            ),
        );
        Ok(self)
    }

    /// Removes duplicate rows and fully empty rows.
    pub fn handle_garbage(&mut self) -> &mut Self {
        if self.table.is_empty() {
            return self;
        }
        let outcome = match cleaning::remove_garbage(&mut self.table) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!("Garbage removal failed: {e}");
                return self;
            }
        };
        self.report.rows_removed_garbage += outcome.rows_removed();
        let message = if outcome.rows_removed() > 0 {
            format!(
                "Duplicates and empty rows removed ({} records: {} duplicate, {} empty)",
                outcome.rows_removed(),
                outcome.duplicates_removed,
                outcome.empty_removed
            )
        } else {
            "No duplicates or empty rows found".to_owned()
        };
        self.report.record("garbage", message);
        self
    }

    /// Fills missing cells with the median (numeric) or mode (everything else).
    pub fn impute_missing(&mut self) -> &mut Self {
        if self.table.is_empty() {
            return self;
        }
        let outcome = match cleaning::impute_missing(&mut self.table) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!("Imputation failed: {e}");
                return self;
            }
        };
        let message = if outcome.imputed_columns.is_empty() {
            "No missing values to impute".to_owned()
        } else {
            format!(
                "Missing values imputed in {} columns",
                outcome.imputed_columns.len()
            )
        };
        if !outcome.skipped_columns.is_empty() {
            tracing::warn!(
                "No fill value for fully missing columns: {}",
                outcome.skipped_columns.join(", ")
            );
        }
        self.report.imputed_columns.extend(outcome.imputed_columns);
        self.report.record("impute", message);
        self
    }

    /// Treats outliers with `method` (`"cap"` or `"remove"`).
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::ScrubError::InvalidArgument`] for any other method;
    /// the table is unchanged.
    pub fn handle_outliers(&mut self, threshold: f64, method: &str) -> Result<&mut Self> {
        let method = method.parse::<OutlierMethod>().inspect_err(|e| {
            tracing::error!("{e}");
        })?;
        Ok(self.handle_outliers_with(threshold, method))
    }

    pub fn handle_outliers_with(&mut self, threshold: f64, method: OutlierMethod) -> &mut Self {
        if self.table.is_empty() {
            return self;
        }
        let outcome = match cleaning::handle_outliers(&mut self.table, threshold, method) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!("Outlier treatment failed: {e}");
                return self;
            }
        };
        let message = match method {
            OutlierMethod::Cap if outcome.capped_columns.is_empty() => {
                "No significant outliers detected".to_owned()
            }
            OutlierMethod::Cap => format!(
                "Outliers capped (winsorized) in {} columns",
                outcome.capped_columns.len()
            ),
            OutlierMethod::Remove if outcome.rows_removed == 0 => {
                "No outliers to remove".to_owned()
            }
            OutlierMethod::Remove => {
                format!("Removed {} rows with outliers", outcome.rows_removed)
            }
        };
        self.report
            .outlier_columns_capped
            .extend(outcome.capped_columns);
        self.report.outlier_rows_removed += outcome.rows_removed;
        self.report.record("outliers", message);
        self
    }

    /// Converts date-named columns to timestamps and low-cardinality text to
    /// categories.
    pub fn optimize(&mut self) -> &mut Self {
        if self.table.is_empty() {
            return self;
        }
        let outcome = match cleaning::optimize(&mut self.table, &self.optimize_options) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!("Type optimisation failed: {e}");
                return self;
            }
        };
        if outcome.unparsed_cells > 0 {
            tracing::warn!(
                "{} cells could not be parsed as dates and are now missing",
                outcome.unparsed_cells
            );
        }
        let message = format!(
            "Types optimised ({} temporal, {} categorical)",
            outcome.temporal_columns.len(),
            outcome.categorical_columns.len()
        );
        self.report.temporal_columns.extend(outcome.temporal_columns);
        self.report
            .categorical_columns
            .extend(outcome.categorical_columns);
        self.report.record("optimize", message);
        self
    }

    /// Writes the table. Failures are logged, never returned.
    pub fn export(&self, destination: &str, format: ExportFormat) {
        if let Err(e) = self.try_export(destination, format) {
            tracing::error!("Export failed: {e}");
        }
    }

    /// Like [`DataPipeline::export`] but reports the failure. Exporting an empty
    /// table writes nothing and succeeds.
    ///
    /// # Errors
    ///
    /// Returns the adapter's error when writing fails.
    pub fn try_export(&self, destination: &str, format: ExportFormat) -> Result<()> {
        if self.table.is_empty() {
            tracing::warn!("The table is empty. Nothing will be exported.");
            return Ok(());
        }
        io::write(&self.table, destination, format, &self.export_options)?;
        tracing::info!("Data exported to {destination}");
        Ok(())
    }
}

impl std::fmt::Debug for DataPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataPipeline")
            .field("shape", &self.table.shape())
            .field("report", &self.report)
            .finish_non_exhaustive()
    }
}
