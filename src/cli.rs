use anyhow::{Context as _, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use datascrub::cleaning::OutlierMethod;
use datascrub::config::PipelineConfig;
use datascrub::io::{ExportFormat, Source};
use datascrub::pipeline::DataPipeline;
use datascrub::table::{ColumnKind, Table};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "datascrub", version, about = "Clean tabular data files and databases")]
pub struct Cli {
    /// Path to a JSON pipeline configuration file
    #[arg(long, global = true, env = "DATASCRUB_CONFIG")]
    pub config: Option<PathBuf>,

    /// Also write a daily rolling log file
    #[arg(long, global = true)]
    pub log_file: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the cleaning pipeline and export the result
    Clean(CleanArgs),
    /// Print the shape, column types and missing counts of a source
    Inspect {
        #[command(flatten)]
        source: SourceArgs,
    },
}

#[derive(Args)]
pub struct SourceArgs {
    /// Input file (CSV, JSON, Parquet, XLSX/XLS/ODS)
    #[arg(short, long, required_unless_present = "sql_url", conflicts_with = "sql_url")]
    pub input: Option<PathBuf>,

    /// SQLite database to read from (path or sqlite:// URL)
    #[arg(long, env = "DATASCRUB_SQL_URL", requires = "query")]
    pub sql_url: Option<String>,

    /// Query to run against --sql-url
    #[arg(long)]
    pub query: Option<String>,
}

impl SourceArgs {
    fn to_source(&self) -> Source {
        match (&self.input, &self.sql_url) {
            (Some(path), _) => Source::File(path.clone()),
            (None, Some(url)) => Source::Sql {
                url: url.clone(),
                query: self.query.clone(),
            },
            (None, None) => Source::File(PathBuf::new()),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Stage {
    Standardize,
    Garbage,
    Impute,
    Outliers,
    Optimize,
}

#[derive(Args)]
pub struct CleanArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Destination file, or SQLite database for --format sql
    #[arg(short, long)]
    pub output: String,

    /// Output format. Defaults to the output extension, then CSV.
    #[arg(short, long)]
    pub format: Option<String>,

    /// IQR multiplier for outlier bounds
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Outlier treatment: cap or remove
    #[arg(long)]
    pub method: Option<String>,

    /// Stages to skip
    #[arg(long, value_enum, value_delimiter = ',')]
    pub skip: Vec<Stage>,

    /// Write the run report as JSON to this path
    #[arg(long)]
    pub report: Option<PathBuf>,
}

pub fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    let mut config = PipelineConfig::load_or_default(path)?;
    config.apply_env_overrides()?;
    Ok(config)
}

pub fn run_command(command: Commands, config: &PipelineConfig) -> Result<()> {
    match command {
        Commands::Clean(args) => handle_clean(args, config),
        Commands::Inspect { source } => handle_inspect(&source, config),
    }
}

/// A source that fails to load degrades to an empty table: every stage is
/// skipped and nothing is written.
fn handle_clean(args: CleanArgs, config: &PipelineConfig) -> Result<()> {
    let threshold = args.threshold.unwrap_or(config.outliers.threshold);
    let method = match args.method.as_deref() {
        Some(m) => m.parse::<OutlierMethod>()?,
        None => config.outliers.method,
    };
    let format = resolve_format(args.format.as_deref(), &args.output)?;
    let runs = |stage: Stage| !args.skip.contains(&stage);

    let mut pipeline = DataPipeline::with_config(args.source.to_source(), config);
    if runs(Stage::Standardize) {
        pipeline.standardize()?;
    }
    if runs(Stage::Garbage) {
        pipeline.handle_garbage();
    }
    if runs(Stage::Impute) {
        pipeline.impute_missing();
    }
    if runs(Stage::Outliers) {
        pipeline.handle_outliers_with(threshold, method);
    }
    if runs(Stage::Optimize) {
        pipeline.optimize();
    }
    pipeline.try_export(&args.output, format)?;

    tracing::info!("{}", pipeline.report().summary(pipeline.table().shape()));
    if let Some(path) = &args.report {
        std::fs::write(path, pipeline.report().to_json()?)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
    }
    Ok(())
}

fn resolve_format(explicit: Option<&str>, output: &str) -> Result<ExportFormat> {
    if let Some(format) = explicit {
        return Ok(format.parse()?);
    }
    let ext = Path::new(output)
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("csv");
    Ok(match ext.to_lowercase().as_str() {
        "db" | "sqlite" | "sqlite3" => ExportFormat::Sql,
        other => other.parse().unwrap_or(ExportFormat::Csv),
    })
}

fn handle_inspect(source: &SourceArgs, config: &PipelineConfig) -> Result<()> {
    let pipeline = DataPipeline::with_config(source.to_source(), config);
    print!("{}", describe(pipeline.table()));
    Ok(())
}

fn describe(table: &Table) -> String {
    let (rows, cols) = table.shape();
    let mut out = format!("{rows} rows x {cols} columns\n");
    for column in table.columns() {
        out.push_str(&format!(
            "  {:<24} {:<12} {} missing\n",
            column.name().as_str(),
            ColumnKind::of(column.dtype()).as_str(),
            column.null_count()
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use datascrub::io;
    use polars::prelude::{NamedFrom, Series};

    #[test]
    fn test_resolve_format() -> Result<()> {
        assert_eq!(resolve_format(None, "out.parquet")?, ExportFormat::Parquet);
        assert_eq!(resolve_format(None, "out.xlsx")?, ExportFormat::Excel);
        assert_eq!(resolve_format(None, "warehouse.db")?, ExportFormat::Sql);
        assert_eq!(resolve_format(None, "out")?, ExportFormat::Csv);
        assert_eq!(resolve_format(Some("json"), "out.csv")?, ExportFormat::Json);
        assert!(resolve_format(Some("xml"), "out.csv").is_err());
        Ok(())
    }

    #[test]
    fn test_parse_clean_args() {
        let cli = Cli::try_parse_from([
            "datascrub",
            "clean",
            "-i",
            "dirty.csv",
            "-o",
            "clean.csv",
            "--skip",
            "impute,optimize",
            "--method",
            "remove",
        ]);
        let Ok(Cli {
            command: Commands::Clean(args),
            ..
        }) = cli
        else {
            panic!("clean args should parse");
        };
        assert_eq!(args.skip.len(), 2);
        assert!(args.skip.contains(&Stage::Impute));
        assert_eq!(args.method.as_deref(), Some("remove"));
    }

    #[test]
    fn test_source_is_required() {
        assert!(Cli::try_parse_from(["datascrub", "clean", "-o", "out.csv"]).is_err());
    }

    #[test]
    fn test_describe() -> datascrub::error::Result<()> {
        let table = Table::new(vec![Series::new("edad".into(), &[Some(1.0), None]).into()])?;
        let text = describe(&table);
        assert!(text.starts_with("2 rows x 1 columns"));
        assert!(text.contains("edad"));
        assert!(text.contains("1 missing"));
        Ok(())
    }

    #[test]
    fn test_clean_end_to_end() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let input = dir.path().join("in.csv");
        let output = dir.path().join("out.csv");
        std::fs::write(&input, " Nombre ,Edad\nJuan,25\nAna,30\nJuan,25\nPedro,120\n")?;

        let report = dir.path().join("report.json");
        let cli = Cli::try_parse_from([
            "datascrub",
            "clean",
            "-i",
            input.to_str().expect("utf-8 path"),
            "-o",
            output.to_str().expect("utf-8 path"),
            "--report",
            report.to_str().expect("utf-8 path"),
        ])?;
        run_command(cli.command, &PipelineConfig::default())?;

        let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&report)?)?;
        assert_eq!(json["rows_removed_garbage"], 1);

        let cleaned = io::load(&Source::from(output), &io::IngestOptions::default())?;
        assert_eq!(cleaned.column_names(), vec!["nombre", "edad"]);
        assert_eq!(cleaned.height(), 3);
        Ok(())
    }

    #[test]
    fn test_clean_missing_input_writes_nothing() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let input = dir.path().join("absent.csv");
        let output = dir.path().join("out.csv");
        let report = dir.path().join("report.json");
        let cli = Cli::try_parse_from([
            "datascrub",
            "clean",
            "-i",
            input.to_str().expect("utf-8 path"),
            "-o",
            output.to_str().expect("utf-8 path"),
            "--report",
            report.to_str().expect("utf-8 path"),
        ])?;

        run_command(cli.command, &PipelineConfig::default())?;

        assert!(!output.exists());
        let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&report)?)?;
        assert_eq!(json["rows_removed_garbage"], 0);
        Ok(())
    }
}
