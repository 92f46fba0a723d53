//! Statistical imputation of missing cells.
//!
//! Numeric columns are filled with the median of their present values, every
//! other typed column with its mode. A column with no present value keeps its
//! missing cells.

use crate::error::Result;
use crate::table::{ColumnKind, Table, categorical_dtype};
use polars::prelude::*;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImputeOutcome {
    /// Columns that received at least one filled value.
    pub imputed_columns: Vec<String>,
    /// Columns with missing cells that could not be filled.
    pub skipped_columns: Vec<String>,
    pub cells_filled: usize,
}

/// # Errors
///
/// Returns [`crate::error::ScrubError::DataProcessing`] if polars fails to
/// evaluate the fills; the table is unchanged.
pub fn impute_missing(table: &mut Table) -> Result<ImputeOutcome> {
    let mut outcome = ImputeOutcome::default();
    if table.is_empty() {
        return Ok(outcome);
    }

    let mut fills = Vec::new();
    for column in table.columns() {
        let name = column.name().as_str();
        let missing = column.null_count();
        if missing == 0 {
            continue;
        }
        let kind = ColumnKind::of(column.dtype());
        if kind == ColumnKind::Missing || missing == column.len() {
            outcome.skipped_columns.push(name.to_owned());
            continue;
        }
        tracing::debug!(column = %name, filled = missing, "Imputing missing values");
        fills.push(fill_expr(name, kind));
        outcome.imputed_columns.push(name.to_owned());
        outcome.cells_filled += missing;
    }

    if !fills.is_empty() {
        table.transform(|lf| lf.with_columns(fills))?;
    }
    Ok(outcome)
}

fn fill_expr(name: &str, kind: ColumnKind) -> Expr {
    let expr = col(name);
    match kind {
        ColumnKind::Numeric => expr.clone().fill_null(expr.median()),
        ColumnKind::Categorical => {
            fill_with_mode(expr.cast(DataType::String)).cast(categorical_dtype())
        }
        _ => fill_with_mode(expr),
    }
}

/// Ties between modes go to the smallest value.
fn fill_with_mode(expr: Expr) -> Expr {
    let mode = expr
        .clone()
        .drop_nulls()
        .mode()
        .sort(SortOptions::default())
        .first();
    expr.fill_null(mode)
}
