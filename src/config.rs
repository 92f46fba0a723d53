//! Pipeline configuration, read from a JSON file with environment overrides.
//!
//! Every field has a default, so a partial file (or no file at all) is valid:
//!
//! ```json
//! {
//!   "outliers": { "threshold": 2.0, "method": "remove" },
//!   "optimize": { "cardinality_threshold": 0.05, "temporal_markers": ["date", "fecha", "datum"] }
//! }
//! ```

use crate::cleaning::optimize::DEFAULT_CARDINALITY_THRESHOLD;
use crate::cleaning::outliers::DEFAULT_THRESHOLD;
use crate::cleaning::{MarkerTokens, OptimizeOptions, OutlierMethod};
use crate::error::{Result, ResultExt as _, ScrubError};
use crate::io::{ExportOptions, IngestOptions};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ENV_OUTLIER_THRESHOLD: &str = "DATASCRUB_OUTLIER_THRESHOLD";
pub const ENV_OUTLIER_METHOD: &str = "DATASCRUB_OUTLIER_METHOD";
pub const ENV_CARDINALITY_THRESHOLD: &str = "DATASCRUB_CARDINALITY_THRESHOLD";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlierSettings {
    pub threshold: f64,
    pub method: OutlierMethod,
}

impl Default for OutlierSettings {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            method: OutlierMethod::Cap,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizeSettings {
    pub cardinality_threshold: f64,
    /// Case-insensitive substrings that mark a column as holding dates.
    pub temporal_markers: Vec<String>,
}

impl Default for OptimizeSettings {
    fn default() -> Self {
        Self {
            cardinality_threshold: DEFAULT_CARDINALITY_THRESHOLD,
            temporal_markers: vec!["date".to_owned(), "fecha".to_owned()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestSettings {
    /// Rows scanned when inferring CSV column types.
    pub infer_schema_length: usize,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            infer_schema_length: 10_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    /// Table replaced when exporting to a relational target.
    pub sql_table: String,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            sql_table: "cleaned_data".to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LoggingSettings {
    /// Also write a daily rolling log file.
    pub file_logging: bool,
    /// Defaults to the platform data directory.
    pub log_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PipelineConfig {
    pub outliers: OutlierSettings,
    pub optimize: OptimizeSettings,
    pub ingest: IngestSettings,
    pub export: ExportSettings,
    pub logging: LoggingSettings,
}

impl PipelineConfig {
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid JSON.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_json(&content)
    }

    /// # Errors
    ///
    /// Returns [`ScrubError::Config`] for invalid JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse pipeline config")
    }

    /// Reads `path` if it exists, otherwise starts from the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be parsed.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) if p.exists() => Self::from_file(p),
            Some(p) => {
                tracing::debug!("Config file {} not found, using defaults", p.display());
                Ok(Self::default())
            }
            None => Ok(Self::default()),
        }
    }

    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json).context("Failed to write pipeline config")
    }

    /// Applies `DATASCRUB_*` environment variables on top of the current values.
    ///
    /// # Errors
    ///
    /// Returns [`ScrubError::Config`] when a variable is set to an unparseable
    /// value.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(ENV_OUTLIER_THRESHOLD) {
            self.outliers.threshold = parse_f64(ENV_OUTLIER_THRESHOLD, &v)?;
        }
        if let Some(v) = lookup(ENV_OUTLIER_METHOD) {
            self.outliers.method = v
                .trim()
                .parse()
                .map_err(|e: ScrubError| ScrubError::Config(format!("{ENV_OUTLIER_METHOD}: {e}")))?;
        }
        if let Some(v) = lookup(ENV_CARDINALITY_THRESHOLD) {
            self.optimize.cardinality_threshold = parse_f64(ENV_CARDINALITY_THRESHOLD, &v)?;
        }
        Ok(())
    }

    pub fn ingest_options(&self) -> IngestOptions {
        IngestOptions {
            infer_schema_length: Some(self.ingest.infer_schema_length),
        }
    }

    pub fn export_options(&self) -> ExportOptions {
        ExportOptions {
            sql_table: self.export.sql_table.clone(),
        }
    }

    pub fn optimize_options(&self) -> OptimizeOptions {
        OptimizeOptions::new(
            self.optimize.cardinality_threshold,
            MarkerTokens::new(&self.optimize.temporal_markers),
        )
    }
}

fn parse_f64(key: &str, raw: &str) -> Result<f64> {
    raw.trim()
        .parse::<f64>()
        .map_err(|e| ScrubError::Config(format!("{key}='{raw}' is not a number: {e}")))
}
