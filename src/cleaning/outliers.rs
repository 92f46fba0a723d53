//! Interquartile-range outlier detection with capping or row removal.
//!
//! For every numeric column the bounds are `Q1 - k*IQR` and `Q3 + k*IQR`, where
//! `k` is the caller's threshold. Columns without spread (`IQR == 0`) are skipped.
//! Missing cells are never outliers.

use crate::error::{Result, ScrubError};
use crate::table::Table;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_THRESHOLD: f64 = 1.5;

/// How flagged values are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutlierMethod {
    /// Winsorize: replace out-of-bound values with the nearest bound.
    #[default]
    Cap,
    /// Drop every row that is out of bounds in any numeric column.
    Remove,
}

impl OutlierMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cap => "cap",
            Self::Remove => "remove",
        }
    }
}

impl fmt::Display for OutlierMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutlierMethod {
    type Err = ScrubError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "cap" => Ok(Self::Cap),
            "remove" => Ok(Self::Remove),
            other => Err(ScrubError::InvalidArgument(format!(
                "Unknown outlier method '{other}'. Use 'cap' or 'remove'."
            ))),
        }
    }
}

/// Acceptance interval for one column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub q1: f64,
    pub q3: f64,
    pub lower: f64,
    pub upper: f64,
}

impl Bounds {
    pub fn iqr(&self) -> f64 {
        self.q3 - self.q1
    }

    pub fn is_outlier(&self, value: f64) -> bool {
        value < self.lower || value > self.upper
    }

    /// `None` when there is no spread between the quartiles.
    pub fn from_quartiles(q1: f64, q3: f64, threshold: f64) -> Option<Self> {
        let iqr = q3 - q1;
        if iqr == 0.0 {
            return None;
        }
        Some(Self {
            q1,
            q3,
            lower: q1 - threshold * iqr,
            upper: q3 + threshold * iqr,
        })
    }

    fn flags(&self, name: &str) -> Expr {
        col(name).lt(lit(self.lower)).or(col(name).gt(lit(self.upper)))
    }
}

/// Linear-interpolated quartile bounds of every numeric column that has present
/// values and spread.
///
/// # Errors
///
/// Returns [`ScrubError::DataProcessing`] if polars fails to compute a quantile.
pub fn column_bounds(table: &Table, threshold: f64) -> Result<Vec<(String, Bounds)>> {
    let names = table.numeric_column_names();
    if names.is_empty() || table.is_empty() {
        return Ok(Vec::new());
    }
    let quartiles = table.aggregate(
        names
            .iter()
            .enumerate()
            .flat_map(|(i, name)| {
                let expr = col(name.as_str());
                [
                    expr.clone()
                        .quantile(lit(0.25), QuantileMethod::Linear)
                        .alias(format!("q1_{i}")),
                    expr.quantile(lit(0.75), QuantileMethod::Linear)
                        .alias(format!("q3_{i}")),
                ]
            })
            .collect(),
    )?;
    Ok(names
        .into_iter()
        .zip(quartiles.chunks(2))
        .filter_map(|(name, q)| match q {
            [Some(q1), Some(q3)] => {
                Bounds::from_quartiles(*q1, *q3, threshold).map(|b| (name, b))
            }
            _ => None,
        })
        .collect())
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutlierOutcome {
    pub method: OutlierMethod,
    /// Bounds of every numeric column that had spread.
    pub bounds: Vec<(String, Bounds)>,
    /// Columns in which at least one value was capped.
    pub capped_columns: Vec<String>,
    pub cells_capped: usize,
    pub rows_removed: usize,
}

/// # Errors
///
/// Returns [`ScrubError::DataProcessing`] if polars fails to evaluate the bounds
/// or the treatment; the table is unchanged.
pub fn handle_outliers(
    table: &mut Table,
    threshold: f64,
    method: OutlierMethod,
) -> Result<OutlierOutcome> {
    let mut outcome = OutlierOutcome {
        method,
        ..Default::default()
    };
    if table.is_empty() {
        return Ok(outcome);
    }

    outcome.bounds = column_bounds(table, threshold)?;
    if outcome.bounds.is_empty() {
        return Ok(outcome);
    }
    match method {
        OutlierMethod::Cap => {
            let (columns, cells) = cap(table, &outcome.bounds)?;
            outcome.capped_columns = columns;
            outcome.cells_capped = cells;
        }
        OutlierMethod::Remove => outcome.rows_removed = remove(table, &outcome.bounds)?,
    }
    Ok(outcome)
}

/// Winsorizes each bounded column: below `lower` becomes `lower`, then above
/// `upper` becomes `upper`.
fn cap(table: &mut Table, bounds: &[(String, Bounds)]) -> Result<(Vec<String>, usize)> {
    let counts = table.aggregate(
        bounds
            .iter()
            .map(|(name, b)| b.flags(name).sum())
            .collect(),
    )?;

    let mut columns = Vec::new();
    let mut cells = 0;
    for ((name, b), count) in bounds.iter().zip(counts) {
        let capped = count.unwrap_or(0.0) as usize;
        if capped > 0 {
            tracing::debug!(
                column = %name,
                capped,
                lower = b.lower,
                upper = b.upper,
                "Capped outliers"
            );
            columns.push(name.clone());
            cells += capped;
        }
    }

    let clipped: Vec<Expr> = bounds
        .iter()
        .map(|(name, b)| col(name.as_str()).clip(lit(b.lower), lit(b.upper)))
        .collect();
    table.transform(|lf| lf.with_columns(clipped))?;
    Ok((columns, cells))
}

/// A row survives only if every bounded column is in bounds or missing.
fn remove(table: &mut Table, bounds: &[(String, Bounds)]) -> Result<usize> {
    let before = table.height();
    let any_outlier = bounds
        .iter()
        .map(|(name, b)| b.flags(name).fill_null(lit(false)))
        .reduce(|a, b| a.or(b));
    if let Some(any_outlier) = any_outlier {
        table.transform(|lf| lf.filter(any_outlier.not()))?;
    }
    Ok(before - table.height())
}
