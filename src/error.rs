//! Centralized error handling for datascrub.
//!
//! The library distinguishes three families of failure:
//!
//! - **Boundary I/O failures** (ingestion and export). These are returned by the
//!   adapters in [`crate::io`], but the [`crate::pipeline::DataPipeline`] absorbs
//!   them: a failed load becomes an empty table and a failed export is logged.
//! - **Invalid stage arguments** such as an unknown outlier method. These are
//!   always returned to the caller.
//! - **Cell-level anomalies** (an unparseable date). These never surface as errors;
//!   the affected cell becomes missing.
//!
//! ```
//! use datascrub::error::ScrubError;
//!
//! fn describe(err: &ScrubError) -> &'static str {
//!     match err {
//!         ScrubError::InvalidArgument(_) => "bad argument",
//!         ScrubError::ColumnCollision(_) => "duplicate column name",
//!         _ => "other",
//!     }
//! }
//! ```

use std::fmt;

/// Main error type for datascrub operations.
#[derive(Debug)]
pub enum ScrubError {
    /// I/O errors (file operations)
    Io(std::io::Error),

    /// A source could not be ingested (unsupported format, unreadable content)
    Ingestion(String),

    /// Export to a destination failed
    Export(String),

    /// A stage or adapter received an argument it does not understand
    InvalidArgument(String),

    /// Two columns would end up with the same name
    ColumnCollision(String),

    /// Column lookup, length or type mismatch inside the table
    DataProcessing(String),

    /// Database operation errors
    Database(String),

    /// Configuration errors
    Config(String),

    /// File not found or invalid path
    InvalidPath(String),

    /// Generic error with context
    Other(String),
}

impl fmt::Display for ScrubError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Ingestion(msg) => write!(f, "Ingestion error: {msg}"),
            Self::Export(msg) => write!(f, "Export error: {msg}"),
            Self::InvalidArgument(msg) => write!(f, "Invalid argument: {msg}"),
            Self::ColumnCollision(msg) => write!(f, "Column name collision: {msg}"),
            Self::DataProcessing(msg) => write!(f, "Data processing error: {msg}"),
            Self::Database(msg) => write!(f, "Database error: {msg}"),
            Self::Config(msg) => write!(f, "Configuration error: {msg}"),
            Self::InvalidPath(msg) => write!(f, "Invalid path: {msg}"),
            Self::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for ScrubError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ScrubError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<anyhow::Error> for ScrubError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(format!("{err:#}"))
    }
}

impl From<serde_json::Error> for ScrubError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(format!("JSON error: {err}"))
    }
}

impl From<polars::error::PolarsError> for ScrubError {
    fn from(err: polars::error::PolarsError) -> Self {
        Self::DataProcessing(err.to_string())
    }
}

impl From<rusqlite::Error> for ScrubError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<calamine::Error> for ScrubError {
    fn from(err: calamine::Error) -> Self {
        Self::Ingestion(format!("Spreadsheet error: {err}"))
    }
}

impl From<rust_xlsxwriter::XlsxError> for ScrubError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        Self::Export(format!("Spreadsheet error: {err}"))
    }
}

/// Result type alias for datascrub operations.
pub type Result<T> = std::result::Result<T, ScrubError>;

/// Extension trait to add context to results.
pub trait ResultExt<T> {
    /// Add context to an error.
    ///
    /// # Errors
    ///
    /// Returns the original error wrapped with `msg`.
    fn context(self, msg: impl Into<String>) -> Result<T>;

    /// Add context using a closure (lazy evaluation).
    ///
    /// # Errors
    ///
    /// Returns the original error wrapped with the closure's message.
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<ScrubError>,
{
    fn context(self, msg: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let err: ScrubError = e.into();
            wrap(err, msg.into())
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let err: ScrubError = e.into();
            wrap(err, f())
        })
    }
}

/// Keeps the variant so callers can still match on the error family.
fn wrap(err: ScrubError, msg: String) -> ScrubError {
    match err {
        ScrubError::Io(e) => ScrubError::Io(std::io::Error::new(e.kind(), format!("{msg}: {e}"))),
        ScrubError::Ingestion(m) => ScrubError::Ingestion(format!("{msg}: {m}")),
        ScrubError::Export(m) => ScrubError::Export(format!("{msg}: {m}")),
        ScrubError::InvalidArgument(m) => ScrubError::InvalidArgument(format!("{msg}: {m}")),
        ScrubError::ColumnCollision(m) => ScrubError::ColumnCollision(format!("{msg}: {m}")),
        ScrubError::DataProcessing(m) => ScrubError::DataProcessing(format!("{msg}: {m}")),
        ScrubError::Database(m) => ScrubError::Database(format!("{msg}: {m}")),
        ScrubError::Config(m) => ScrubError::Config(format!("{msg}: {m}")),
        ScrubError::InvalidPath(m) => ScrubError::InvalidPath(format!("{msg}: {m}")),
        ScrubError::Other(m) => ScrubError::Other(format!("{msg}: {m}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ScrubError::InvalidArgument("Unknown outlier method 'bogus'".to_owned());
        assert_eq!(
            err.to_string(),
            "Invalid argument: Unknown outlier method 'bogus'"
        );
    }

    #[test]
    fn test_result_context() {
        let result: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "file.txt",
        ));

        let result: Result<()> = result.context("Failed to read file");
        let err = result.expect_err("context keeps the error");
        assert!(matches!(err, ScrubError::Io(_)));
        assert!(err.to_string().contains("Failed to read file"));
    }

    #[test]
    fn test_context_preserves_variant() {
        let result: Result<()> = Err(ScrubError::Database("locked".to_owned()));
        let err = result
            .with_context(|| "Writing table".to_owned())
            .expect_err("still an error");
        assert!(matches!(err, ScrubError::Database(ref m) if m == "Writing table: locked"));
    }
}
