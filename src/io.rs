//! Ingestion and export adapters.
//!
//! Files are dispatched on their extension: `.csv`, `.json` and `.parquet`
//! go through polars, `.xlsx`/`.xls`/`.ods` through calamine. SQL sources run
//! a query against a SQLite database. Every adapter produces or consumes a
//! [`Table`]; flat files hand their polars frame straight to the table.

pub mod files;
pub mod spreadsheet;
pub mod sql;

use crate::error::{Result, ScrubError};
use crate::table::Table;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Where a table is loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    File(PathBuf),
    Sql { url: String, query: Option<String> },
}

impl Source {
    pub fn sql(url: impl Into<String>, query: impl Into<String>) -> Self {
        Self::Sql {
            url: url.into(),
            query: Some(query.into()),
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Sql { url, .. } => write!(f, "{url}"),
        }
    }
}

impl From<&str> for Source {
    fn from(path: &str) -> Self {
        Self::File(PathBuf::from(path))
    }
}

impl From<String> for Source {
    fn from(path: String) -> Self {
        Self::File(PathBuf::from(path))
    }
}

impl From<PathBuf> for Source {
    fn from(path: PathBuf) -> Self {
        Self::File(path)
    }
}

impl From<&Path> for Source {
    fn from(path: &Path) -> Self {
        Self::File(path.to_path_buf())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestOptions {
    /// Rows scanned to infer CSV column types. `None` scans everything.
    pub infer_schema_length: Option<usize>,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            infer_schema_length: Some(10_000),
        }
    }
}

/// Loads `source` into a table.
///
/// # Errors
///
/// - [`ScrubError::InvalidPath`] when the file does not exist.
/// - [`ScrubError::Ingestion`] for an unsupported extension or unreadable content.
/// - [`ScrubError::Config`] for a SQL source without a query.
/// - [`ScrubError::Database`] when the query fails.
pub fn load(source: &Source, options: &IngestOptions) -> Result<Table> {
    match source {
        Source::File(path) => load_file(path, options),
        Source::Sql { url, query } => {
            let query = query
                .as_deref()
                .filter(|q| !q.trim().is_empty())
                .ok_or_else(|| ScrubError::Config("A query is required for SQL sources".to_owned()))?;
            sql::read(url, query)
        }
    }
}

fn load_file(path: &Path, options: &IngestOptions) -> Result<Table> {
    if !path.exists() {
        return Err(ScrubError::InvalidPath(format!(
            "File not found: {}",
            path.display()
        )));
    }

    let ext = extension(path);
    match ext.as_str() {
        "csv" => Table::from_dataframe(files::read_csv(path, options)?),
        "json" => Table::from_dataframe(files::read_json(path)?),
        "parquet" => Table::from_dataframe(files::read_parquet(path)?),
        "xlsx" | "xlsm" | "xls" | "ods" => spreadsheet::read(path),
        _ => Err(ScrubError::Ingestion(format!(
            "Unsupported file extension: '{ext}' ({})",
            path.display()
        ))),
    }
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_lowercase()
}

/// Output format for [`write`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Excel,
    Sql,
    Json,
    Parquet,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Excel => "excel",
            Self::Sql => "sql",
            Self::Json => "json",
            Self::Parquet => "parquet",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = ScrubError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "excel" | "xlsx" => Ok(Self::Excel),
            "sql" | "sqlite" => Ok(Self::Sql),
            "json" => Ok(Self::Json),
            "parquet" => Ok(Self::Parquet),
            other => Err(ScrubError::InvalidArgument(format!(
                "Unknown export format '{other}'. Use csv, excel, sql, json or parquet."
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    /// Table replaced when writing to a SQL destination.
    pub sql_table: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            sql_table: "cleaned_data".to_owned(),
        }
    }
}

/// Writes `table` to `destination`. For [`ExportFormat::Sql`] the destination
/// is a SQLite path or URL and the configured table is replaced.
///
/// # Errors
///
/// Returns [`ScrubError::Export`] or [`ScrubError::Database`] when writing fails.
pub fn write(
    table: &Table,
    destination: &str,
    format: ExportFormat,
    options: &ExportOptions,
) -> Result<()> {
    match format {
        ExportFormat::Csv => files::write_csv(&mut table.export_frame()?, Path::new(destination)),
        ExportFormat::Json => files::write_json(&mut table.export_frame()?, Path::new(destination)),
        ExportFormat::Parquet => {
            files::write_parquet(&mut table.export_frame()?, Path::new(destination))
        }
        ExportFormat::Excel => spreadsheet::write(table, Path::new(destination)),
        ExportFormat::Sql => sql::write(table, destination, &options.sql_table),
    }?;
    tracing::debug!("Wrote {destination} as {format}");
    Ok(())
}
