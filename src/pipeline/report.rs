//! Run report accumulated by the pipeline as stages complete.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A human-readable record of one stage completing.
#[derive(Debug, Clone, Serialize)]
pub struct StageEvent {
    pub stage: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Shape and per-stage statistics of one pipeline run.
#[derive(Debug, Clone, Serialize, Default)]
pub struct RunReport {
    /// `(rows, columns)` at construction time.
    pub initial_shape: (usize, usize),
    pub renamed_columns: usize,
    pub trimmed_cells: usize,
    pub rows_removed_garbage: usize,
    pub imputed_columns: Vec<String>,
    pub outlier_columns_capped: Vec<String>,
    pub outlier_rows_removed: usize,
    pub temporal_columns: Vec<String>,
    pub categorical_columns: Vec<String>,
    events: Vec<StageEvent>,
}

impl RunReport {
    pub fn new(initial_shape: (usize, usize)) -> Self {
        Self {
            initial_shape,
            ..Default::default()
        }
    }

    /// Appends an event and forwards it to the log.
    pub fn record(&mut self, stage: &str, message: impl Into<String>) {
        let message = message.into();
        tracing::info!(stage, "{message}");
        self.events.push(StageEvent {
            stage: stage.to_owned(),
            message,
            timestamp: Utc::now(),
        });
    }

    pub fn events(&self) -> &[StageEvent] {
        &self.events
    }

    /// One-line summary against the current shape of the table.
    pub fn summary(&self, final_shape: (usize, usize)) -> String {
        let (rows_before, cols_before) = self.initial_shape;
        let (rows_after, cols_after) = final_shape;
        format!(
            "Pipeline completed: rows {rows_before} → {rows_after}, columns {cols_before} → {cols_after}, \
             {} imputed, {} capped, {} outlier rows removed, {} stages",
            self.imputed_columns.len(),
            self.outlier_columns_capped.len(),
            self.outlier_rows_removed,
            self.events.len()
        )
    }

    /// # Errors
    ///
    /// Returns [`crate::error::ScrubError::Config`] if serialisation fails.
    pub fn to_json(&self) -> crate::error::Result<String> {
        serde_json::to_string_pretty(self).map_err(Into::into)
    }
}
