//! In-memory tabular store shared by every cleaning stage.
//!
//! A [`Table`] owns a polars [`DataFrame`] whose columns are normalised on entry to
//! one dtype per [`ColumnKind`]: `Float64`, `String`, `Categorical`,
//! `Datetime(ms)` and `Null`. Missing cells are polars nulls; `NaN` is stored as a
//! null. Stages borrow the table mutably one after another and either replace the
//! frame with a fully computed result or leave it untouched.

use crate::error::{Result, ScrubError};
use chrono::{DateTime, NaiveDateTime};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Storage dtype of temporal columns.
pub(crate) fn timestamp_dtype() -> DataType {
    DataType::Datetime(TimeUnit::Milliseconds, None)
}

pub(crate) fn categorical_dtype() -> DataType {
    DataType::Categorical(None, Default::default())
}

/// Logical type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnKind {
    Numeric,
    Text,
    Categorical,
    Temporal,
    /// Every cell is missing and no type could be inferred.
    Missing,
}

impl ColumnKind {
    pub fn of(dtype: &DataType) -> Self {
        match dtype {
            DataType::Null => Self::Missing,
            DataType::Categorical(_, _) => Self::Categorical,
            DataType::Date | DataType::Datetime(_, _) => Self::Temporal,
            dt if dt.is_primitive_numeric() => Self::Numeric,
            _ => Self::Text,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Numeric => "Numeric",
            Self::Text => "Text",
            Self::Categorical => "Categorical",
            Self::Temporal => "Temporal",
            Self::Missing => "Missing",
        }
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single cell, detached from its column.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Missing,
    Number(f64),
    Text(String),
    Timestamp(NaiveDateTime),
}

impl Value {
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => f.write_str("<missing>"),
            Self::Number(v) => write!(f, "{v}"),
            Self::Text(s) => f.write_str(s),
            Self::Timestamp(ts) => write!(f, "{ts}"),
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Self::Timestamp(v)
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Missing, Into::into)
    }
}

/// Rows x named columns.
#[derive(Debug, Clone, Default)]
pub struct Table {
    df: DataFrame,
}

impl PartialEq for Table {
    fn eq(&self, other: &Self) -> bool {
        self.df.get_column_names() == other.df.get_column_names()
            && self
                .df
                .get_columns()
                .iter()
                .zip(other.df.get_columns())
                .all(|(a, b)| a.dtype() == b.dtype())
            && self.df.equals_missing(&other.df)
    }
}

impl Table {
    /// Builds a table, checking that names are unique and lengths agree.
    ///
    /// # Errors
    ///
    /// Returns [`ScrubError::ColumnCollision`] for a repeated name and
    /// [`ScrubError::DataProcessing`] for a length mismatch.
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.name().as_str()) {
                return Err(ScrubError::ColumnCollision(format!(
                    "column '{}' appears more than once",
                    column.name()
                )));
            }
        }
        if let Some(first) = columns.first()
            && let Some(bad) = columns.iter().find(|c| c.len() != first.len())
        {
            return Err(ScrubError::DataProcessing(format!(
                "column '{}' has {} rows, expected {}",
                bad.name(),
                bad.len(),
                first.len()
            )));
        }
        Self::from_dataframe(DataFrame::new(columns)?)
    }

    /// Wraps a frame produced by an ingestion adapter, normalising its dtypes.
    ///
    /// # Errors
    ///
    /// Returns [`ScrubError::DataProcessing`] if a column cannot be cast.
    pub fn from_dataframe(df: DataFrame) -> Result<Self> {
        let columns = df
            .get_columns()
            .iter()
            .map(|c| normalize(c.as_materialized_series()).map(Column::from))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            df: DataFrame::new(columns)?,
        })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn height(&self) -> usize {
        self.df.height()
    }

    pub fn width(&self) -> usize {
        self.df.width()
    }

    /// `(rows, columns)`
    pub fn shape(&self) -> (usize, usize) {
        self.df.shape()
    }

    /// True when there are no rows.
    pub fn is_empty(&self) -> bool {
        self.height() == 0
    }

    pub fn frame(&self) -> &DataFrame {
        &self.df
    }

    pub fn into_frame(self) -> DataFrame {
        self.df
    }

    pub(crate) fn lazy(&self) -> LazyFrame {
        self.df.clone().lazy()
    }

    /// Runs `plan` over a lazy view of the table and keeps the result. The table
    /// is unchanged when the plan fails.
    pub(crate) fn transform<F>(&mut self, plan: F) -> Result<()>
    where
        F: FnOnce(LazyFrame) -> LazyFrame,
    {
        self.df = plan(self.lazy()).collect()?;
        Ok(())
    }

    /// Swaps in a frame computed from this table by a stage.
    pub(crate) fn set_frame(&mut self, df: DataFrame) {
        self.df = df;
    }

    /// Evaluates one-row aggregations and returns each result as a float.
    pub(crate) fn aggregate(&self, exprs: Vec<Expr>) -> Result<Vec<Option<f64>>> {
        let out = self.lazy().select(exprs).collect()?;
        out.get_columns()
            .iter()
            .map(|c| -> Result<Option<f64>> { Ok(c.get(0)?.extract::<f64>()) })
            .collect()
    }

    pub fn columns(&self) -> &[Column] {
        self.df.get_columns()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.df
            .get_column_names()
            .into_iter()
            .map(PlSmallStr::as_str)
            .collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.df.column(name).ok()
    }

    pub fn column_kind(&self, name: &str) -> Option<ColumnKind> {
        self.column(name).map(|c| ColumnKind::of(c.dtype()))
    }

    /// Every cell of one column, top to bottom.
    ///
    /// # Errors
    ///
    /// Returns [`ScrubError::DataProcessing`] for an unknown column.
    pub fn column_values(&self, name: &str) -> Result<Vec<Value>> {
        let column = self.column(name).ok_or_else(|| unknown_column(name))?;
        series_values(column.as_materialized_series())
    }

    /// Replaces the column with the same name or appends a new one.
    ///
    /// # Errors
    ///
    /// Returns [`ScrubError::DataProcessing`] if the column length differs from the
    /// table height.
    pub fn set_column(&mut self, column: Column) -> Result<()> {
        if self.width() > 0 && column.len() != self.height() {
            return Err(ScrubError::DataProcessing(format!(
                "column '{}' has {} rows, table has {}",
                column.name(),
                column.len(),
                self.height()
            )));
        }
        let column = Column::from(normalize(column.as_materialized_series())?);
        self.df.with_column(column)?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`ScrubError::DataProcessing`] for an unknown column or row.
    pub fn cell(&self, row: usize, column: &str) -> Result<Value> {
        let col = self.column(column).ok_or_else(|| unknown_column(column))?;
        if row >= col.len() {
            return Err(out_of_bounds(row, col.len()));
        }
        let single = col.as_materialized_series().slice(row as i64, 1);
        Ok(series_values(&single)?.pop().unwrap_or(Value::Missing))
    }

    /// Writes one cell. A numeric column only accepts numbers or the missing marker;
    /// a fully missing column takes the type of the first value written into it.
    ///
    /// # Errors
    ///
    /// Returns [`ScrubError::DataProcessing`] for an unknown column, an out of range
    /// row or a value whose type does not match the column.
    pub fn set_cell(&mut self, row: usize, column: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let series = self
            .column(column)
            .ok_or_else(|| unknown_column(column))?
            .as_materialized_series();
        if row >= series.len() {
            return Err(out_of_bounds(row, series.len()));
        }
        let name = series.name().clone();

        let kind = match (ColumnKind::of(series.dtype()), &value) {
            (ColumnKind::Missing, Value::Missing) => return Ok(()),
            (ColumnKind::Missing, Value::Number(_)) => ColumnKind::Numeric,
            (ColumnKind::Missing, Value::Text(_)) => ColumnKind::Text,
            (ColumnKind::Missing, Value::Timestamp(_)) => ColumnKind::Temporal,
            (kind, _) => kind,
        };
        let updated = match (kind, value) {
            (ColumnKind::Numeric, v @ (Value::Number(_) | Value::Missing)) => {
                let mut values: Vec<Option<f64>> =
                    series.cast(&DataType::Float64)?.f64()?.into_iter().collect();
                values[row] = v.as_f64().filter(|x| !x.is_nan());
                Series::new(name, values)
            }
            (ColumnKind::Text | ColumnKind::Categorical, v @ (Value::Text(_) | Value::Missing)) => {
                let mut values: Vec<Option<String>> = series
                    .cast(&DataType::String)?
                    .str()?
                    .into_iter()
                    .map(|s| s.map(str::to_owned))
                    .collect();
                values[row] = v.as_str().map(str::to_owned);
                let text = Series::new(name, values);
                if kind == ColumnKind::Categorical {
                    text.cast(&categorical_dtype())?
                } else {
                    text
                }
            }
            (ColumnKind::Temporal, v @ (Value::Timestamp(_) | Value::Missing)) => {
                let mut millis: Vec<Option<i64>> = series
                    .cast(&timestamp_dtype())?
                    .cast(&DataType::Int64)?
                    .i64()?
                    .into_iter()
                    .collect();
                millis[row] = match v {
                    Value::Timestamp(ts) => Some(ts.and_utc().timestamp_millis()),
                    _ => None,
                };
                Series::new(name, millis).cast(&timestamp_dtype())?
            }
            (kind, other) => {
                return Err(ScrubError::DataProcessing(format!(
                    "column '{column}': cannot store '{other}' in a {kind} column"
                )));
            }
        };
        self.df.replace(column, updated)?;
        Ok(())
    }

    /// All cells of one row, in column order.
    ///
    /// # Errors
    ///
    /// Returns [`ScrubError::DataProcessing`] for an out of range row.
    pub fn row(&self, row: usize) -> Result<Vec<Value>> {
        self.column_names()
            .into_iter()
            .map(|name| self.cell(row, name))
            .collect()
    }

    /// Keeps rows whose mask entry is `true` and returns how many were dropped.
    ///
    /// # Errors
    ///
    /// Returns [`ScrubError::DataProcessing`] if the mask length differs from the
    /// table height.
    pub fn filter_rows(&mut self, mask: &[bool]) -> Result<usize> {
        if mask.len() != self.height() {
            return Err(ScrubError::DataProcessing(format!(
                "row mask has {} entries, table has {} rows",
                mask.len(),
                self.height()
            )));
        }
        let before = self.height();
        let mask = BooleanChunked::from_slice("mask".into(), mask);
        self.df = self.df.filter(&mask)?;
        Ok(before - self.height())
    }

    /// Keeps rows for which `keep` returns `true`; returns the number removed.
    ///
    /// # Errors
    ///
    /// Propagates failures reading the rows.
    pub fn retain_rows<F>(&mut self, mut keep: F) -> Result<usize>
    where
        F: FnMut(&[Value]) -> bool,
    {
        let mask = (0..self.height())
            .map(|i| self.row(i).map(|row| keep(&row)))
            .collect::<Result<Vec<bool>>>()?;
        self.filter_rows(&mask)
    }

    pub fn columns_of_kind(&self, kind: ColumnKind) -> Vec<String> {
        self.columns()
            .iter()
            .filter(|c| ColumnKind::of(c.dtype()) == kind)
            .map(|c| c.name().to_string())
            .collect()
    }

    pub fn numeric_column_names(&self) -> Vec<String> {
        self.columns_of_kind(ColumnKind::Numeric)
    }

    pub fn text_column_names(&self) -> Vec<String> {
        self.columns_of_kind(ColumnKind::Text)
    }

    /// Renames every column at once. Nothing changes if the new names are not
    /// unique or their count is wrong.
    ///
    /// # Errors
    ///
    /// Returns [`ScrubError::ColumnCollision`] when two new names are equal and
    /// [`ScrubError::InvalidArgument`] when the number of names is wrong.
    pub fn rename_columns(&mut self, names: Vec<String>) -> Result<()> {
        let current = self.column_names();
        if names.len() != current.len() {
            return Err(ScrubError::InvalidArgument(format!(
                "expected {} column names, got {}",
                current.len(),
                names.len()
            )));
        }
        let mut seen = HashSet::new();
        for (name, old) in names.iter().zip(&current) {
            if !seen.insert(name.as_str()) {
                let first = names
                    .iter()
                    .zip(&current)
                    .find(|(n, _)| *n == name)
                    .map_or("", |(_, c)| *c);
                return Err(ScrubError::ColumnCollision(format!(
                    "'{first}' and '{old}' both become '{name}'"
                )));
            }
        }
        let columns = self
            .columns()
            .iter()
            .zip(names)
            .map(|(c, name)| {
                Column::from(c.as_materialized_series().clone().with_name(name.into()))
            })
            .collect();
        self.df = DataFrame::new(columns)?;
        Ok(())
    }

    /// A copy of the frame that every writer accepts: fully missing columns are
    /// written as text.
    pub(crate) fn export_frame(&self) -> Result<DataFrame> {
        let mut df = self.df.clone();
        for name in self.columns_of_kind(ColumnKind::Missing) {
            let text = df.column(&name)?.cast(&DataType::String)?;
            df.with_column(text)?;
        }
        Ok(df)
    }
}

/// Casts one ingested series to the dtype of its [`ColumnKind`].
fn normalize(series: &Series) -> Result<Series> {
    let name = series.name().clone();
    let len = series.len();
    let dtype = series.dtype();

    if matches!(dtype, DataType::Null) {
        return Ok(series.clone());
    }
    if dtype.is_primitive_numeric() {
        let values: Vec<Option<f64>> = series
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .map(|v| v.filter(|x| !x.is_nan()))
            .collect();
        return Ok(Series::new(name, values));
    }
    if len > 0 && series.null_count() == len {
        return Ok(Series::new_null(name, len));
    }
    Ok(match dtype {
        DataType::String | DataType::Categorical(_, _) => series.clone(),
        DataType::Date | DataType::Datetime(_, _) => series.cast(&timestamp_dtype())?,
        _ => series.cast(&DataType::String)?,
    })
}

fn series_values(series: &Series) -> Result<Vec<Value>> {
    Ok(match ColumnKind::of(series.dtype()) {
        ColumnKind::Missing => vec![Value::Missing; series.len()],
        ColumnKind::Numeric => series
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .map(Value::from)
            .collect(),
        ColumnKind::Text | ColumnKind::Categorical => series
            .cast(&DataType::String)?
            .str()?
            .into_iter()
            .map(Value::from)
            .collect(),
        ColumnKind::Temporal => series
            .cast(&timestamp_dtype())?
            .cast(&DataType::Int64)?
            .i64()?
            .into_iter()
            .map(|ms| {
                ms.and_then(DateTime::from_timestamp_millis)
                    .map(|dt| dt.naive_utc())
                    .into()
            })
            .collect(),
    })
}

fn unknown_column(name: &str) -> ScrubError {
    ScrubError::DataProcessing(format!("column '{name}' not found"))
}

fn out_of_bounds(row: usize, height: usize) -> ScrubError {
    ScrubError::DataProcessing(format!("row {row} is out of bounds (height {height})"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Result<Table> {
        let df = df!(
            "name" => &[Some("Juan"), None, Some("Ana")],
            "age" => &[Some(25i64), Some(30), None],
        )?;
        Table::from_dataframe(df)
    }

    #[test]
    fn test_shape_and_lookup() -> Result<()> {
        let table = sample()?;
        assert_eq!(table.shape(), (3, 2));
        assert_eq!(table.column_names(), vec!["name", "age"]);
        assert_eq!(table.numeric_column_names(), vec!["age".to_owned()]);
        assert_eq!(table.text_column_names(), vec!["name".to_owned()]);
        assert_eq!(table.column("age").map(|c| c.dtype()), Some(&DataType::Float64));
        assert!(!table.is_empty());
        assert!(Table::empty().is_empty());
        Ok(())
    }

    #[test]
    fn test_new_rejects_mismatched_lengths() {
        let result = Table::new(vec![
            Column::from(Series::new("a".into(), &[1.0])),
            Column::from(Series::new("b".into(), &[1.0, 2.0])),
        ]);
        assert!(matches!(result, Err(ScrubError::DataProcessing(_))));
    }

    #[test]
    fn test_new_rejects_duplicate_names() {
        let result = Table::new(vec![
            Column::from(Series::new_null("a".into(), 1)),
            Column::from(Series::new_null("a".into(), 1)),
        ]);
        assert!(matches!(result, Err(ScrubError::ColumnCollision(_))));
    }

    #[test]
    fn test_ingest_normalises_dtypes() -> Result<()> {
        let df = df!(
            "flag" => &[Some(true), Some(false), None],
            "ratio" => &[Some(f64::NAN), Some(0.5), None],
            "blank" => &[None::<&str>, None, None],
        )?;
        let table = Table::from_dataframe(df)?;

        assert_eq!(table.column_kind("flag"), Some(ColumnKind::Text));
        assert_eq!(table.cell(0, "flag")?, Value::from("true"));
        assert_eq!(table.column("ratio").map(|c| c.null_count()), Some(2));
        assert_eq!(table.column_kind("blank"), Some(ColumnKind::Missing));
        Ok(())
    }

    #[test]
    fn test_numeric_column_rejects_text() -> Result<()> {
        let mut table = sample()?;
        let err = table.set_cell(0, "age", "old").expect_err("type mismatch");
        assert!(matches!(err, ScrubError::DataProcessing(_)));
        assert_eq!(table.cell(0, "age")?, Value::Number(25.0));

        table.set_cell(2, "age", 41.0)?;
        assert_eq!(table.cell(2, "age")?, Value::Number(41.0));
        Ok(())
    }

    #[test]
    fn test_filter_rows_keeps_columns_aligned() -> Result<()> {
        let mut table = sample()?;
        let removed = table.filter_rows(&[true, false, true])?;
        assert_eq!(removed, 1);
        assert_eq!(table.height(), 2);
        assert_eq!(table.row(1)?, vec![Value::from("Ana"), Value::Missing]);
        assert!(table.filter_rows(&[true]).is_err());
        Ok(())
    }

    #[test]
    fn test_retain_rows_by_predicate() -> Result<()> {
        let mut table = sample()?;
        let removed = table.retain_rows(|row| !row.iter().any(Value::is_missing))?;
        assert_eq!(removed, 2);
        assert_eq!(table.height(), 1);
        Ok(())
    }

    #[test]
    fn test_categorical_cells_read_and_write() -> Result<()> {
        let mut table = sample()?;
        let names = table.columns()[0].cast(&categorical_dtype())?;
        table.set_column(names)?;
        assert_eq!(table.column_kind("name"), Some(ColumnKind::Categorical));

        table.set_cell(1, "name", "Zoe")?;
        assert_eq!(table.column_kind("name"), Some(ColumnKind::Categorical));
        assert_eq!(
            table.column_values("name")?,
            vec![Value::from("Juan"), Value::from("Zoe"), Value::from("Ana")]
        );
        Ok(())
    }

    #[test]
    fn test_missing_column_takes_type_of_first_value() -> Result<()> {
        let mut table = Table::new(vec![Column::from(Series::new_null("x".into(), 2))])?;
        table.set_cell(1, "x", "hello")?;
        assert_eq!(table.column_kind("x"), Some(ColumnKind::Text));
        assert_eq!(table.cell(0, "x")?, Value::Missing);
        Ok(())
    }

    #[test]
    fn test_rename_collision_leaves_names() -> Result<()> {
        let mut table = sample()?;
        let err = table
            .rename_columns(vec!["same".to_owned(), "same".to_owned()])
            .expect_err("collision");
        assert!(matches!(err, ScrubError::ColumnCollision(_)));
        assert_eq!(table.column_names(), vec!["name", "age"]);

        table.rename_columns(vec!["nombre".to_owned(), "edad".to_owned()])?;
        assert_eq!(table.cell(0, "nombre")?, Value::from("Juan"));
        Ok(())
    }

    #[test]
    fn test_export_frame_writes_blank_columns_as_text() -> Result<()> {
        let table = Table::new(vec![Column::from(Series::new_null("x".into(), 2))])?;
        let df = table.export_frame()?;
        assert_eq!(df.column("x")?.dtype(), &DataType::String);
        Ok(())
    }
}
