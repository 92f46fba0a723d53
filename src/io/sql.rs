//! SQLite source and destination.
//!
//! URLs may be plain paths or carry a `sqlite://` / `sqlite:` prefix. Exports
//! replace the destination table inside a single transaction.

use crate::error::{Result, ScrubError};
use crate::table::{ColumnKind, Table, Value};
use polars::prelude::{Column, NamedFrom, Series};
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{Connection, OpenFlags, params_from_iter};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Largest integer magnitude an `f64` represents exactly.
const MAX_EXACT_INTEGER: i64 = 1 << 53;

fn db_path(url: &str) -> &str {
    url.strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
        .unwrap_or(url)
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

enum Cell {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

pub fn read(url: &str, query: &str) -> Result<Table> {
    let conn = Connection::open_with_flags(db_path(url), OpenFlags::SQLITE_OPEN_READ_ONLY)?;
    let mut stmt = conn.prepare(query)?;
    let names: Vec<String> = stmt.column_names().into_iter().map(str::to_owned).collect();
    let width = names.len();

    let mut columns: Vec<Vec<Cell>> = (0..width).map(|_| Vec::new()).collect();
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        for (i, cells) in columns.iter_mut().enumerate() {
            let cell = match row.get_ref(i)? {
                ValueRef::Null => Cell::Null,
                ValueRef::Integer(n) => Cell::Integer(n),
                ValueRef::Real(f) => Cell::Real(f),
                ValueRef::Text(t) => Cell::Text(String::from_utf8_lossy(t).into_owned()),
                ValueRef::Blob(_) => Cell::Text("<blob>".to_owned()),
            };
            cells.push(cell);
        }
    }

    let columns = names
        .into_iter()
        .zip(columns)
        .map(|(name, cells)| Column::from(infer_column(&name, cells)))
        .collect();
    let table = Table::new(columns)?;
    tracing::debug!("Read {} rows from {}", table.height(), db_path(url));
    Ok(table)
}

/// A column is numeric only when every integer in it converts to `f64` without
/// rounding; otherwise it is read as text so large identifiers survive intact.
fn infer_column(name: &str, cells: Vec<Cell>) -> Series {
    if cells.iter().all(|c| matches!(c, Cell::Null)) {
        return Series::new_null(name.into(), cells.len());
    }
    let numeric = cells.iter().all(|c| match c {
        Cell::Null | Cell::Real(_) => true,
        Cell::Integer(n) => n.unsigned_abs() <= MAX_EXACT_INTEGER.unsigned_abs(),
        Cell::Text(_) => false,
    });
    if numeric {
        let values: Vec<Option<f64>> = cells
            .into_iter()
            .map(|c| match c {
                Cell::Integer(n) => Some(n as f64),
                Cell::Real(v) => Some(v),
                _ => None,
            })
            .collect();
        return Series::new(name.into(), values);
    }
    let text: Vec<Option<String>> = cells
        .into_iter()
        .map(|c| match c {
            Cell::Null => None,
            Cell::Integer(n) => Some(n.to_string()),
            Cell::Real(v) => Some(v.to_string()),
            Cell::Text(s) => Some(s),
        })
        .collect();
    Series::new(name.into(), text)
}

/// Replaces `table_name` in the database at `url` with the contents of `table`.
pub fn write(table: &Table, url: &str, table_name: &str) -> Result<()> {
    if table.width() == 0 {
        return Err(ScrubError::Export("Cannot export a table without columns".to_owned()));
    }
    let mut conn = Connection::open(db_path(url))?;
    let tx = conn.transaction()?;

    let target = quote_ident(table_name);
    tx.execute(&format!("DROP TABLE IF EXISTS {target}"), [])?;

    let definitions: Vec<String> = table
        .columns()
        .iter()
        .map(|c| {
            let sql_type = match ColumnKind::of(c.dtype()) {
                ColumnKind::Numeric => "REAL",
                _ => "TEXT",
            };
            format!("{} {sql_type}", quote_ident(c.name().as_str()))
        })
        .collect();
    tx.execute(&format!("CREATE TABLE {target} ({})", definitions.join(", ")), [])?;

    {
        let columns = table
            .column_names()
            .into_iter()
            .map(|name| table.column_values(name))
            .collect::<Result<Vec<_>>>()?;
        let placeholders = vec!["?"; table.width()].join(", ");
        let mut insert = tx.prepare(&format!("INSERT INTO {target} VALUES ({placeholders})"))?;
        for row in 0..table.height() {
            let values = columns.iter().map(|values| match &values[row] {
                Value::Missing => SqlValue::Null,
                Value::Number(x) => SqlValue::Real(*x),
                Value::Text(s) => SqlValue::Text(s.clone()),
                Value::Timestamp(ts) => SqlValue::Text(ts.format(TIMESTAMP_FORMAT).to_string()),
            });
            insert.execute(params_from_iter(values))?;
        }
    }

    tx.commit()?;
    tracing::debug!("Wrote {} rows to table {table_name}", table.height());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Result<Table> {
        Table::new(vec![
            Series::new("name".into(), &[Some("Ana"), Some("Luis")]).into(),
            Series::new("age".into(), &[Some(30.0), None]).into(),
        ])
    }

    #[test]
    fn test_db_path_prefixes() {
        assert_eq!(db_path("sqlite:///tmp/a.db"), "/tmp/a.db");
        assert_eq!(db_path("sqlite:a.db"), "a.db");
        assert_eq!(db_path("a.db"), "a.db");
    }

    #[test]
    fn test_write_then_read() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let url = format!("sqlite://{}", dir.path().join("out.db").display());
        write(&sample()?, &url, "people")?;

        let loaded = read(&url, "SELECT * FROM people")?;
        assert_eq!(loaded.shape(), (2, 2));
        assert_eq!(loaded.cell(0, "name")?, Value::from("Ana"));
        assert_eq!(loaded.cell(0, "age")?, Value::Number(30.0));
        assert_eq!(loaded.cell(1, "age")?, Value::Missing);
        Ok(())
    }

    #[test]
    fn test_write_replaces_existing_table() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let url = dir.path().join("out.db").display().to_string();
        write(&sample()?, &url, "people")?;

        let smaller = Table::new(vec![Series::new("only".into(), &[1.0]).into()])?;
        write(&smaller, &url, "people")?;

        let loaded = read(&url, "SELECT * FROM people")?;
        assert_eq!(loaded.shape(), (1, 1));
        assert_eq!(loaded.column_names(), vec!["only"]);
        Ok(())
    }

    #[test]
    fn test_bad_query_is_database_error() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let url = dir.path().join("out.db").display().to_string();
        write(&sample()?, &url, "people")?;
        let err = read(&url, "SELECT * FROM nope").expect_err("missing table");
        assert!(matches!(err, ScrubError::Database(_)));
        Ok(())
    }

    #[test]
    fn test_large_integers_are_read_as_text() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("ids.db");
        let conn = Connection::open(&path)?;
        conn.execute("CREATE TABLE ids (id INTEGER, qty INTEGER)", [])?;
        conn.execute("INSERT INTO ids VALUES (9007199254740993, 3), (7, 4)", [])?;
        drop(conn);

        let loaded = read(&path.display().to_string(), "SELECT * FROM ids")?;
        assert_eq!(loaded.column_kind("id"), Some(ColumnKind::Text));
        assert_eq!(loaded.cell(0, "id")?, Value::from("9007199254740993"));
        assert_eq!(loaded.cell(1, "id")?, Value::from("7"));
        assert_eq!(loaded.column_kind("qty"), Some(ColumnKind::Numeric));
        assert_eq!(loaded.cell(0, "qty")?, Value::Number(3.0));
        Ok(())
    }
}
