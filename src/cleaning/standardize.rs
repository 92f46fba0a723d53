//! Column name normalisation and whitespace trimming of text cells.

use crate::error::Result;
use crate::table::Table;
use polars::prelude::*;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StandardizeOutcome {
    /// Columns whose name changed.
    pub renamed_columns: usize,
    /// Text columns whose cells were trimmed.
    pub trimmed_columns: usize,
    /// Cells whose content changed after trimming.
    pub trimmed_cells: usize,
}

/// Trims, lowercases, turns whitespace into `_` and drops anything that is not a
/// word character. Idempotent.
pub fn normalize_column_name(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .collect()
}

/// Normalises every column name, then strips surrounding whitespace from every
/// text cell.
///
/// # Errors
///
/// Returns [`crate::error::ScrubError::ColumnCollision`] if two columns normalise
/// to the same name. The table is left untouched in that case.
pub fn standardize(table: &mut Table) -> Result<StandardizeOutcome> {
    let mut outcome = StandardizeOutcome::default();
    if table.is_empty() {
        return Ok(outcome);
    }

    let new_names: Vec<String> = table
        .column_names()
        .into_iter()
        .map(normalize_column_name)
        .collect();
    outcome.renamed_columns = table
        .column_names()
        .into_iter()
        .zip(&new_names)
        .filter(|(old, new)| *old != new.as_str())
        .count();
    table.rename_columns(new_names)?;

    let text = table.text_column_names();
    if !text.is_empty() {
        let changed = table.aggregate(
            text.iter()
                .map(|name| col(name.as_str()).neq(trimmed(name)).sum())
                .collect(),
        )?;
        outcome.trimmed_columns = text.len();
        outcome.trimmed_cells = changed.into_iter().flatten().sum::<f64>() as usize;
        let exprs: Vec<Expr> = text.iter().map(|name| trimmed(name)).collect();
        table.transform(|lf| lf.with_columns(exprs))?;
    }

    tracing::debug!(
        renamed = outcome.renamed_columns,
        trimmed_cells = outcome.trimmed_cells,
        "Standardised column names and text cells"
    );
    Ok(outcome)
}

fn trimmed(name: &str) -> Expr {
    col(name).str().strip_chars(lit(NULL))
}
