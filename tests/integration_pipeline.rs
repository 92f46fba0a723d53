//! End-to-end runs of the pipeline over the fixture in `testdata/`.

use chrono::NaiveDate;
use datascrub::config::PipelineConfig;
use datascrub::error::Result;
use datascrub::io::{self, ExportFormat, IngestOptions, Source};
use datascrub::pipeline::DataPipeline;
use datascrub::table::{ColumnKind, Value};

const DIRTY: &str = "testdata/dirty.csv";

#[test]
fn test_full_chain_on_dirty_csv() -> Result<()> {
    let mut pipeline = DataPipeline::new(DIRTY);
    assert_eq!(pipeline.table().shape(), (5, 4));

    pipeline
        .standardize()?
        .handle_garbage()
        .impute_missing()
        .handle_outliers(1.5, "cap")?
        .optimize();

    let table = pipeline.table();
    assert_eq!(
        table.column_names(),
        vec!["nombre", "edad", "fecha_registro", "score"]
    );
    assert_eq!(table.height(), 4);
    assert_eq!(table.cell(2, "nombre")?, Value::from("Pedro"));

    // Median of [10.5, 5.0, 1000.0] after the duplicate is gone.
    assert_eq!(table.cell(1, "score")?, Value::Number(10.5));
    assert_eq!(table.cell(3, "edad")?, Value::Number(1119.375));
    assert_eq!(table.cell(3, "score")?, Value::Number(631.0));

    let fecha = table.column_kind("fecha_registro");
    assert_eq!(fecha, Some(ColumnKind::Temporal));
    let jan_first = NaiveDate::from_ymd_opt(2023, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(Value::Timestamp);
    // Three-way tie in the mode resolves to the earliest date.
    assert_eq!(Some(table.cell(2, "fecha_registro")?), jan_first);

    let report = pipeline.report();
    assert_eq!(report.initial_shape, (5, 4));
    assert_eq!(report.rows_removed_garbage, 1);
    assert_eq!(report.imputed_columns, vec!["fecha_registro", "score"]);
    assert_eq!(report.outlier_columns_capped, vec!["edad", "score"]);
    assert_eq!(report.temporal_columns, vec!["fecha_registro"]);
    assert!(report.summary(table.shape()).contains("rows 5 → 4"));
    Ok(())
}

#[test]
fn test_remove_drops_the_outlier_row() -> Result<()> {
    let mut pipeline = DataPipeline::new(DIRTY);
    pipeline.standardize()?.handle_outliers(1.5, "remove")?;

    let table = pipeline.table();
    assert_eq!(table.height(), 4);
    let names: Vec<Value> = (0..table.height())
        .map(|row| table.cell(row, "nombre"))
        .collect::<Result<_>>()?;
    assert!(!names.contains(&Value::from("OutlierMan")));
    assert_eq!(pipeline.report().outlier_rows_removed, 1);
    Ok(())
}

#[test]
fn test_unknown_method_leaves_table_alone() -> Result<()> {
    let mut pipeline = DataPipeline::new(DIRTY);
    pipeline.standardize()?;
    let before = pipeline.table().clone();

    assert!(pipeline.handle_outliers(1.5, "trim").is_err());
    assert_eq!(pipeline.table(), &before);
    Ok(())
}

#[test]
fn test_csv_export_roundtrip() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let out = dir.path().join("clean.csv");

    let mut pipeline = DataPipeline::new(DIRTY);
    pipeline.standardize()?.handle_garbage().impute_missing();
    pipeline.try_export(&out.to_string_lossy(), ExportFormat::Csv)?;

    let reloaded = io::load(&Source::from(out), &IngestOptions::default())?;
    assert_eq!(reloaded.shape(), (4, 4));
    assert_eq!(reloaded.column("score").map(|c| c.null_count()), Some(0));
    Ok(())
}

#[test]
fn test_sql_export_replaces_table() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let db = dir.path().join("clean.db");
    let url = format!("sqlite://{}", db.display());

    let mut config = PipelineConfig::default();
    config.export.sql_table = "personas".to_owned();

    let mut first = DataPipeline::with_config(DIRTY, &config);
    first.standardize()?;
    first.try_export(&url, ExportFormat::Sql)?;

    let mut second = DataPipeline::with_config(DIRTY, &config);
    second.standardize()?.handle_garbage();
    second.try_export(&url, ExportFormat::Sql)?;

    let loaded = io::load(
        &Source::sql(&url, "SELECT * FROM personas"),
        &IngestOptions::default(),
    )?;
    assert_eq!(loaded.height(), 4);
    assert_eq!(
        loaded.column_names(),
        vec!["nombre", "edad", "fecha_registro", "score"]
    );
    Ok(())
}

#[test]
fn test_sql_source_feeds_pipeline() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let db = dir.path().join("source.db").display().to_string();

    let mut seed = DataPipeline::new(DIRTY);
    seed.standardize()?;
    seed.try_export(&db, ExportFormat::Sql)?;

    let mut pipeline = DataPipeline::new(Source::sql(
        db,
        "SELECT nombre, edad FROM cleaned_data WHERE edad < 1000",
    ));
    assert_eq!(pipeline.table().shape(), (4, 2));
    pipeline.handle_garbage();
    assert_eq!(pipeline.table().height(), 3);
    Ok(())
}

#[test]
fn test_excel_export_is_readable() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let out = dir.path().join("clean.xlsx");

    let mut pipeline = DataPipeline::new(DIRTY);
    pipeline
        .standardize()?
        .handle_garbage()
        .impute_missing()
        .optimize();
    pipeline.try_export(&out.to_string_lossy(), ExportFormat::Excel)?;

    let reloaded = io::load(&Source::from(out), &IngestOptions::default())?;
    assert_eq!(reloaded.shape(), (4, 4));
    assert_eq!(reloaded.cell(0, "nombre")?, Value::from("Juan"));
    Ok(())
}

#[test]
fn test_missing_source_is_an_empty_pipeline() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let out = dir.path().join("never.csv");

    let mut pipeline = DataPipeline::new("testdata/does_not_exist.csv");
    pipeline
        .standardize()?
        .handle_garbage()
        .impute_missing()
        .handle_outliers(1.5, "cap")?
        .optimize();
    pipeline.export(&out.to_string_lossy(), ExportFormat::Csv);

    assert!(pipeline.table().is_empty());
    assert!(pipeline.report().events().is_empty());
    assert!(!out.exists());
    Ok(())
}
