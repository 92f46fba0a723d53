//! Spreadsheet ingestion (calamine) and Excel export (rust_xlsxwriter).
//!
//! Only the first worksheet is read and its first row is the header.

use crate::error::{Result, ScrubError};
use crate::table::{Table, Value, timestamp_dtype};
use calamine::{Data, DataType as _, Reader as _, open_workbook_auto};
use chrono::NaiveDateTime;
use polars::prelude::{Column, DataType, NamedFrom, Series};
use rust_xlsxwriter::Workbook;
use std::path::Path;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn read(path: &Path) -> Result<Table> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| {
            ScrubError::Ingestion(format!("Workbook {} has no worksheets", path.display()))
        })??;

    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Ok(Table::empty());
    };
    let names: Vec<String> = header
        .iter()
        .enumerate()
        .map(|(i, cell)| match cell {
            Data::Empty => format!("column_{i}"),
            other => other.to_string(),
        })
        .collect();

    let body: Vec<&[Data]> = rows.collect();
    let columns = names
        .into_iter()
        .enumerate()
        .map(|(i, name)| {
            let cells: Vec<&Data> = body
                .iter()
                .map(|row| row.get(i).unwrap_or(&Data::Empty))
                .collect();
            infer_column(&name, &cells).map(Column::from)
        })
        .collect::<Result<Vec<_>>>()?;
    Table::new(columns)
}

fn infer_column(name: &str, cells: &[&Data]) -> Result<Series> {
    let present: Vec<&Data> = cells.iter().copied().filter(|c| !is_blank(c)).collect();
    if present.is_empty() {
        return Ok(Series::new_null(name.into(), cells.len()));
    }
    if present.iter().all(|c| matches!(c, Data::Int(_) | Data::Float(_))) {
        let values: Vec<Option<f64>> = cells.iter().map(|c| c.as_f64()).collect();
        return Ok(Series::new(name.into(), values));
    }
    if present
        .iter()
        .all(|c| matches!(c, Data::DateTime(_) | Data::DateTimeIso(_)) && c.as_datetime().is_some())
    {
        let millis: Vec<Option<i64>> = cells
            .iter()
            .map(|c| c.as_datetime().map(|ts| ts.and_utc().timestamp_millis()))
            .collect();
        return Ok(Series::new(name.into(), millis).cast(&timestamp_dtype())?);
    }
    let text: Vec<Option<String>> = cells
        .iter()
        .map(|c| (!is_blank(c)).then(|| c.to_string()))
        .collect();
    Ok(Series::new(name.into(), text))
}

/// Only empty and error cells are blank; whitespace strings are kept as text.
fn is_blank(cell: &Data) -> bool {
    matches!(cell, Data::Empty | Data::Error(_))
}

pub fn write(table: &Table, path: &Path) -> Result<()> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();

    for (col_idx, name) in table.column_names().into_iter().enumerate() {
        let col = u16::try_from(col_idx)
            .map_err(|_| ScrubError::Export("Too many columns for an Excel sheet".to_owned()))?;
        sheet.write_string(0, col, name)?;

        for (row_idx, value) in table.column_values(name)?.into_iter().enumerate() {
            let row = u32::try_from(row_idx + 1)
                .map_err(|_| ScrubError::Export("Too many rows for an Excel sheet".to_owned()))?;
            match value {
                Value::Missing => {}
                Value::Number(v) => {
                    sheet.write_number(row, col, v)?;
                }
                Value::Text(s) => {
                    sheet.write_string(row, col, &s)?;
                }
                Value::Timestamp(ts) => {
                    sheet.write_string(row, col, format_timestamp(&ts))?;
                }
            }
        }
    }

    workbook.save(path)?;
    Ok(())
}

fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}
