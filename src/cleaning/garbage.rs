//! Removal of exact-duplicate rows and fully empty rows.

use crate::error::Result;
use crate::table::{ColumnKind, Table};
use polars::prelude::*;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GarbageOutcome {
    pub duplicates_removed: usize,
    pub empty_removed: usize,
}

impl GarbageOutcome {
    pub fn rows_removed(&self) -> usize {
        self.duplicates_removed + self.empty_removed
    }
}

/// Drops repeated rows (keeping the first occurrence) and then rows where every
/// cell is missing. Missing markers compare equal, so repeated all-missing rows
/// count as duplicates.
///
/// # Errors
///
/// Returns [`crate::error::ScrubError::DataProcessing`] if polars fails to
/// evaluate the plan; the table is unchanged.
pub fn remove_garbage(table: &mut Table) -> Result<GarbageOutcome> {
    let mut outcome = GarbageOutcome::default();
    if table.is_empty() {
        return Ok(outcome);
    }
    let before = table.height();

    // Untyped columns take part in row equality as all-null text.
    let blank = table.columns_of_kind(ColumnKind::Missing);
    let as_text: Vec<Expr> = blank
        .iter()
        .map(|name| col(name.as_str()).cast(DataType::String))
        .collect();
    let deduped = table
        .lazy()
        .with_columns(as_text)
        .unique_stable(None, UniqueKeepStrategy::First)
        .collect()?;
    outcome.duplicates_removed = before - deduped.height();

    let mut plan = deduped.lazy();
    let all_missing = table
        .column_names()
        .into_iter()
        .map(|name| col(name).is_null())
        .reduce(|a, b| a.and(b));
    if let Some(all_missing) = all_missing {
        plan = plan.filter(all_missing.not());
    }
    let restore: Vec<Expr> = blank.iter().map(|name| lit(NULL).alias(name.as_str())).collect();
    let cleaned = plan.with_columns(restore).collect()?;
    outcome.empty_removed = before - outcome.duplicates_removed - cleaned.height();

    table.set_frame(cleaned);
    if outcome.rows_removed() > 0 {
        tracing::debug!(
            duplicates = outcome.duplicates_removed,
            empty = outcome.empty_removed,
            "Removed garbage rows"
        );
    }
    Ok(outcome)
}
