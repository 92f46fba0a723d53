//! Flat-file readers and writers backed by polars.

use super::IngestOptions;
use crate::error::{Result, ResultExt as _};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;

pub fn read_csv(path: &Path, options: &IngestOptions) -> Result<DataFrame> {
    LazyCsvReader::new(path)
        .with_infer_schema_length(options.infer_schema_length)
        .with_has_header(true)
        .finish()
        .and_then(LazyFrame::collect)
        .map_err(|e| ingestion("CSV", path, &e))
}

pub fn read_json(path: &Path) -> Result<DataFrame> {
    JsonReader::new(File::open(path)?)
        .finish()
        .map_err(|e| ingestion("JSON", path, &e))
}

pub fn read_parquet(path: &Path) -> Result<DataFrame> {
    ParquetReader::new(File::open(path)?)
        .finish()
        .map_err(|e| ingestion("Parquet", path, &e))
}

pub fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    let file = File::create(path).context("Failed to create CSV file")?;
    CsvWriter::new(file)
        .include_header(true)
        .finish(df)
        .map_err(|e| export("CSV", path, &e))
}

pub fn write_json(df: &mut DataFrame, path: &Path) -> Result<()> {
    let file = File::create(path).context("Failed to create JSON file")?;
    JsonWriter::new(file)
        .with_json_format(JsonFormat::Json)
        .finish(df)
        .map_err(|e| export("JSON", path, &e))
}

pub fn write_parquet(df: &mut DataFrame, path: &Path) -> Result<()> {
    let file = File::create(path).context("Failed to create Parquet file")?;
    ParquetWriter::new(file)
        .finish(df)
        .map(|_| ())
        .map_err(|e| export("Parquet", path, &e))
}

fn ingestion(kind: &str, path: &Path, err: &PolarsError) -> crate::error::ScrubError {
    crate::error::ScrubError::Ingestion(format!(
        "Failed to read {kind} {}: {err}",
        path.display()
    ))
}

fn export(kind: &str, path: &Path, err: &PolarsError) -> crate::error::ScrubError {
    crate::error::ScrubError::Export(format!(
        "Failed to write {kind} {}: {err}",
        path.display()
    ))
}
