//! Type optimisation: temporal parsing for date-named columns and dictionary
//! encoding for low-cardinality text.

use super::temporal::{MarkerTokens, TemporalNamePredicate};
use crate::error::Result;
use crate::table::{ColumnKind, Table, categorical_dtype, timestamp_dtype};
use polars::prelude::*;

pub const DEFAULT_CARDINALITY_THRESHOLD: f64 = 0.1;

/// Heuristics used by [`optimize`].
pub struct OptimizeOptions {
    /// A text column becomes categorical when `distinct / rows` is below this.
    pub cardinality_threshold: f64,
    pub temporal: Box<dyn TemporalNamePredicate>,
}

impl OptimizeOptions {
    pub fn new(cardinality_threshold: f64, temporal: impl TemporalNamePredicate + 'static) -> Self {
        Self {
            cardinality_threshold,
            temporal: Box::new(temporal),
        }
    }
}

impl Default for OptimizeOptions {
    fn default() -> Self {
        Self::new(DEFAULT_CARDINALITY_THRESHOLD, MarkerTokens::default())
    }
}

impl std::fmt::Debug for OptimizeOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OptimizeOptions")
            .field("cardinality_threshold", &self.cardinality_threshold)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptimizeOutcome {
    pub temporal_columns: Vec<String>,
    /// Cells that failed to parse and became missing.
    pub unparsed_cells: usize,
    pub categorical_columns: Vec<String>,
}

/// Reclassifies columns. Never drops rows; the only values lost are text cells in
/// temporal columns that do not parse as timestamps.
///
/// # Errors
///
/// Returns [`crate::error::ScrubError::DataProcessing`] if polars fails to
/// evaluate a conversion. Columns converted before the failure keep their new
/// type.
pub fn optimize(table: &mut Table, options: &OptimizeOptions) -> Result<OptimizeOutcome> {
    let mut outcome = OptimizeOutcome::default();
    if table.is_empty() {
        return Ok(outcome);
    }
    let height = table.height() as f64;
    let names: Vec<String> = table.column_names().into_iter().map(str::to_owned).collect();

    for name in &names {
        if options.temporal.is_temporal(name) {
            match table.column_kind(name) {
                Some(ColumnKind::Text | ColumnKind::Categorical) => {
                    outcome.unparsed_cells += to_temporal(table, name)?;
                    outcome.temporal_columns.push(name.clone());
                }
                Some(ColumnKind::Numeric) => {
                    tracing::warn!(
                        column = %name,
                        "Leaving column unchanged: numeric values cannot be read as timestamps"
                    );
                }
                _ => {}
            }
        }

        if table.column_kind(name) == Some(ColumnKind::Text) {
            let distinct = table.aggregate(vec![col(name.as_str()).drop_nulls().n_unique()])?;
            let ratio = distinct.first().copied().flatten().unwrap_or(0.0) / height;
            if ratio < options.cardinality_threshold {
                let category = col(name.as_str()).cast(categorical_dtype());
                table.transform(|lf| lf.with_column(category))?;
                outcome.categorical_columns.push(name.clone());
            }
        }
    }
    Ok(outcome)
}

/// Parses a text column into timestamps and returns how many present cells were
/// lost. The layout is inferred from the first present value; if that fails, or
/// nothing parses, the column goes through a plain dtype cast instead.
fn to_temporal(table: &mut Table, name: &str) -> Result<usize> {
    let missing_before = table.column(name).map_or(0, |c| c.null_count());
    let text = col(name).cast(DataType::String);
    let inferred = text.clone().str().to_datetime(
        Some(TimeUnit::Milliseconds),
        None,
        StrptimeOptions {
            strict: false,
            ..Default::default()
        },
        lit("raise"),
    );

    let parsed = match table.lazy().select([inferred]).collect() {
        Ok(df) if df.get_columns().iter().any(|c| c.null_count() < c.len()) => df,
        _ => table
            .lazy()
            .select([text.cast(timestamp_dtype())])
            .collect()?,
    };
    let Some(column) = parsed.get_columns().first().cloned() else {
        return Ok(0);
    };
    let unparsed = column.null_count().saturating_sub(missing_before);
    table.set_column(column)?;
    Ok(unparsed)
}
