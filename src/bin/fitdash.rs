//! fitdash CLI - Command-line interface for fitdash-core
//!
//! Commands:
//! - summary: Headline figures for one activity
//! - export: Canonical table as CSV
//! - series: One column as a time-indexed series
//! - inspect: Decoder-level view of a file (message and field counts)
//! - columns: Columns with recorded values
//! - config: Print the effective processor configuration

use clap::{Parser, Subcommand, ValueEnum};
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use fitdash_core::config::ProcessorConfig;
use fitdash_core::decoder::{ActivityDecoder, FitDecoder};
use fitdash_core::error::{ConfigError, DecodeError, ExportError};
use fitdash_core::export::write_csv;
use fitdash_core::pipeline::ActivityProcessor;
use fitdash_core::series::{available_columns, series, Column};
use fitdash_core::summary::ActivitySummary;
use fitdash_core::types::{CanonicalTable, Outcome};
use fitdash_core::{ComputeError, VERSION};

/// fitdash - Turn FIT activity recordings into a canonical table
#[derive(Parser)]
#[command(name = "fitdash")]
#[command(version = VERSION)]
#[command(about = "Decode and normalize FIT activity files", long_about = None)]
struct Cli {
    /// Processor config file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the input size limit (bytes)
    #[arg(long, global = true)]
    max_input_bytes: Option<usize>,

    /// Override the sample record limit
    #[arg(long, global = true)]
    max_rows: Option<usize>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print headline figures for an activity
    Summary {
        /// Input FIT file (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output format
        #[arg(long, default_value = "text")]
        format: SummaryFormat,
    },

    /// Export the canonical table as CSV
    Export {
        /// Input FIT file (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output CSV file (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,
    },

    /// Extract one column as a time-indexed series (JSON)
    Series {
        /// Input FIT file (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Column to extract (e.g. heart_rate_bpm, speed_kmh)
        #[arg(short, long)]
        column: Column,

        /// Output file (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,
    },

    /// Show what the decoder extracted, before normalization
    Inspect {
        /// Input FIT file (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,
    },

    /// List columns that carry at least one value
    Columns {
        /// Input FIT file (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Print the effective processor configuration
    Config,
}

#[derive(Clone, ValueEnum)]
enum SummaryFormat {
    /// Human-readable lines
    Text,
    /// Single-line JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn run(cli: Cli) -> Result<(), FitdashCliError> {
    let mut config = load_config(cli.config.as_deref())?;
    if let Some(limit) = cli.max_input_bytes {
        config.max_input_bytes = limit;
    }
    if let Some(limit) = cli.max_rows {
        config.normalizer.max_rows = limit;
    }
    config.validate()?;

    match cli.command {
        Commands::Summary { input, format } => cmd_summary(&input, format, config),
        Commands::Export { input, output } => cmd_export(&input, &output, config),
        Commands::Series {
            input,
            column,
            output,
        } => cmd_series(&input, column, &output, config),
        Commands::Inspect { input } => cmd_inspect(&input, &config),
        Commands::Columns { input } => cmd_columns(&input, config),
        Commands::Config => cmd_config(&config),
    }
}

fn load_config(path: Option<&Path>) -> Result<ProcessorConfig, FitdashCliError> {
    match path {
        Some(path) => Ok(ProcessorConfig::from_json(&fs::read_to_string(path)?)?),
        None => Ok(ProcessorConfig::default()),
    }
}

fn read_input(input: &Path) -> Result<Vec<u8>, FitdashCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = Vec::new();
        io::stdin().read_to_end(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read(input)?)
    }
}

fn open_output(output: &Path) -> Result<Box<dyn Write>, FitdashCliError> {
    if output.to_string_lossy() == "-" {
        Ok(Box::new(io::stdout().lock()))
    } else {
        Ok(Box::new(fs::File::create(output)?))
    }
}

/// Run the pipeline and insist on a table
fn load_table(input: &Path, config: ProcessorConfig) -> Result<CanonicalTable, FitdashCliError> {
    let bytes = read_input(input)?;
    let mut processor = ActivityProcessor::with_config(config);
    let outcome = processor.process(&bytes).map_err(ComputeError::from)?;

    match outcome {
        Outcome::Ready { table } => Ok(table),
        empty => Err(FitdashCliError::Empty(empty)),
    }
}

fn cmd_summary(
    input: &Path,
    format: SummaryFormat,
    config: ProcessorConfig,
) -> Result<(), FitdashCliError> {
    let table = load_table(input, config)?;
    let summary = ActivitySummary::derive(&table);

    match format {
        SummaryFormat::Json => println!("{}", serde_json::to_string(&summary)?),
        SummaryFormat::JsonPretty => println!("{}", serde_json::to_string_pretty(&summary)?),
        SummaryFormat::Text => print_summary(&summary),
    }
    Ok(())
}

fn print_summary(summary: &ActivitySummary) {
    fn optional(value: Option<f64>, unit: &str) -> String {
        value
            .map(|v| format!("{v:.1} {unit}"))
            .unwrap_or_else(|| "-".to_string())
    }

    println!("Date:            {}", summary.date.as_deref().unwrap_or("-"));
    println!("Activity:        {}", summary.activity_type);
    println!("Samples:         {}", summary.sample_count);
    println!("Distance:        {:.2} km", summary.distance_km);
    println!("Duration:        {}", summary.duration_hms);
    println!("Avg speed:       {:.1} km/h", summary.avg_speed_kmh);
    println!("Max speed:       {}", optional(summary.max_speed_kmh, "km/h"));
    println!("Avg heart rate:  {}", optional(summary.avg_heart_rate, "bpm"));
    println!("Max heart rate:  {}", optional(summary.max_heart_rate, "bpm"));
    println!("Avg power:       {}", optional(summary.avg_power_watts, "W"));
    println!("Max power:       {}", optional(summary.max_power_watts, "W"));
    println!("Elevation gain:  {}", optional(summary.elevation_gain_m, "m"));
    println!("Calories:        {}", optional(summary.calories, "kcal"));
}

fn cmd_export(input: &Path, output: &Path, config: ProcessorConfig) -> Result<(), FitdashCliError> {
    let table = load_table(input, config)?;
    write_csv(&table, open_output(output)?)?;
    Ok(())
}

fn cmd_series(
    input: &Path,
    column: Column,
    output: &Path,
    config: ProcessorConfig,
) -> Result<(), FitdashCliError> {
    let table = load_table(input, config)?;
    let points = series(&table, column);

    let mut writer = open_output(output)?;
    serde_json::to_writer(&mut writer, &SeriesReport {
        column: column.as_str(),
        label: column.label(),
        activity_type: table.activity_type(),
        points: &points,
    })?;
    writeln!(writer)?;
    Ok(())
}

fn cmd_inspect(input: &Path, config: &ProcessorConfig) -> Result<(), FitdashCliError> {
    let bytes = read_input(input)?;
    if bytes.len() > config.max_input_bytes {
        return Err(FitdashCliError::Decode(DecodeError::InputTooLarge {
            size: bytes.len(),
            limit: config.max_input_bytes,
        }));
    }

    let decoded = FitDecoder.decode(&bytes)?;

    let mut sample_fields: BTreeMap<&str, usize> = BTreeMap::new();
    for sample in &decoded.samples {
        for name in sample.fields.keys() {
            *sample_fields.entry(name.as_str()).or_default() += 1;
        }
    }

    let report = InspectReport {
        bytes: bytes.len(),
        message_count: decoded.message_count,
        sample_count: decoded.samples.len(),
        session_count: decoded.sessions.len(),
        sports: decoded.sessions.iter().filter_map(|s| s.sport()).collect(),
        sample_fields,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn cmd_columns(input: &Path, config: ProcessorConfig) -> Result<(), FitdashCliError> {
    let table = load_table(input, config)?;
    for column in available_columns(&table) {
        println!("{:<16} {}", column.as_str(), column.label());
    }
    Ok(())
}

fn cmd_config(config: &ProcessorConfig) -> Result<(), FitdashCliError> {
    println!("{}", config.to_json()?);
    Ok(())
}

// Error handling

#[derive(Debug)]
enum FitdashCliError {
    Io(io::Error),
    Compute(ComputeError),
    Decode(DecodeError),
    Empty(Outcome),
}

impl From<io::Error> for FitdashCliError {
    fn from(e: io::Error) -> Self {
        FitdashCliError::Io(e)
    }
}

impl From<ComputeError> for FitdashCliError {
    fn from(e: ComputeError) -> Self {
        FitdashCliError::Compute(e)
    }
}

impl From<DecodeError> for FitdashCliError {
    fn from(e: DecodeError) -> Self {
        FitdashCliError::Decode(e)
    }
}

impl From<serde_json::Error> for FitdashCliError {
    fn from(e: serde_json::Error) -> Self {
        FitdashCliError::Compute(e.into())
    }
}

impl From<ExportError> for FitdashCliError {
    fn from(e: ExportError) -> Self {
        FitdashCliError::Compute(e.into())
    }
}

impl From<ConfigError> for FitdashCliError {
    fn from(e: ConfigError) -> Self {
        FitdashCliError::Compute(e.into())
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<FitdashCliError> for CliError {
    fn from(e: FitdashCliError) -> Self {
        match e {
            FitdashCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            FitdashCliError::Compute(ComputeError::Config(e)) => CliError {
                code: "CONFIG_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Run 'fitdash config' to see the expected shape".to_string()),
            },
            FitdashCliError::Compute(e) => CliError {
                code: "COMPUTE_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            FitdashCliError::Decode(e) => CliError {
                code: "DECODE_FAILED".to_string(),
                message: e.to_string(),
                hint: Some("Ensure the input is a FIT activity file".to_string()),
            },
            FitdashCliError::Empty(outcome) => CliError {
                code: outcome
                    .empty_reason()
                    .map(|r| r.as_str().to_ascii_uppercase())
                    .unwrap_or_else(|| "EMPTY".to_string()),
                message: outcome.user_message(),
                hint: Some("Run 'fitdash inspect' to see what the file contains".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct SeriesReport<'a> {
    column: &'a str,
    label: &'a str,
    activity_type: &'a str,
    points: &'a [fitdash_core::series::SeriesPoint],
}

#[derive(serde::Serialize)]
struct InspectReport<'a> {
    bytes: usize,
    message_count: usize,
    sample_count: usize,
    session_count: usize,
    sports: Vec<String>,
    sample_fields: BTreeMap<&'a str, usize>,
}
