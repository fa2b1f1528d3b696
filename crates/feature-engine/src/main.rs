//! Feature Pipeline CLI

use anyhow::Context;
use clap::{Parser, ValueEnum};
use feature_engine::{init_logging, FeaturePipeline, PipelineConfig, PipelineInput};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::PathBuf;
use tracing::{info, Level};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Table, selection scores and patterns
    Json,
    /// Table only
    Csv,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

/// Build a recommender feature table from structured, text and sequence inputs
#[derive(Parser, Debug)]
#[command(name = "feature-pipeline")]
#[command(about = "Build a recommender feature table", long_about = None)]
struct Args {
    /// Pipeline configuration (TOML); defaults apply when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Pipeline input (JSON)
    #[arg(short, long)]
    input: PathBuf,

    /// Output file; stdout when omitted
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,

    /// Log level
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_logging(args.log_level.into())?;

    info!("=== Feature Pipeline v{} ===", env!("CARGO_PKG_VERSION"));

    let config = match &args.config {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("loading configuration {}", path.display()))?,
        None => PipelineConfig::default(),
    };

    let file = File::open(&args.input).with_context(|| format!("opening input {}", args.input.display()))?;
    let input: PipelineInput = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("parsing input {}", args.input.display()))?;

    let pipeline = FeaturePipeline::new(config)?;
    let output = pipeline.run(&input)?;

    let mut writer: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("creating output {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    match args.format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut writer, &output)?;
            writeln!(writer)?;
        }
        OutputFormat::Csv => output.table.write_csv(&mut writer)?,
    }
    writer.flush()?;

    info!(
        "Wrote {} rows x {} columns",
        output.table.n_rows(),
        output.table.n_columns()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_parsed() {
        let args = Args::try_parse_from(["feature-pipeline", "-i", "in.json", "--log-level", "debug"]).unwrap();
        assert_eq!(args.log_level, LogLevel::Debug);
        assert_eq!(Level::from(args.log_level), Level::DEBUG);

        let args = Args::try_parse_from(["feature-pipeline", "-i", "in.json"]).unwrap();
        assert_eq!(args.log_level, LogLevel::Info);
        assert_eq!(args.format, OutputFormat::Json);
    }

    #[test]
    fn test_unknown_log_level_rejected() {
        let err = Args::try_parse_from(["feature-pipeline", "-i", "in.json", "--log-level", "verbose"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidValue);
    }
}
