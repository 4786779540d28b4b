//! WIB CLI - Command-line interface for WIB Flux
//!
//! Commands:
//! - analyze: Run every analysis and write the session report
//! - traces: Write segmented traces with derived kinematic columns
//! - validate: Check schema and timestamp integrity of an event log
//! - config: Print the default analysis configuration

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use wib_flux::pipeline::Analyzer;
use wib_flux::report::ReportEncoder;
use wib_flux::schema::{EventLogAdapter, InputFormat};
use wib_flux::trace::{advance_all, TraceMap, TraceStage};
use wib_flux::{AnalysisConfig, ComputeError, EventLog, WIB_VERSION};

/// WIB - Behavioral metrics from web interaction logs
#[derive(Parser)]
#[command(name = "wib")]
#[command(author = "WIB Research")]
#[command(version = WIB_VERSION)]
#[command(about = "Analyze mouse, touch and keyboard interaction logs", long_about = None)]
struct Cli {
    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Input options shared by the commands that read an event log
#[derive(clap::Args)]
struct InputArgs {
    /// Input file path (use - for stdin)
    #[arg(short, long)]
    input: PathBuf,

    /// Input format
    #[arg(long, default_value = "csv")]
    input_format: InputFormatArg,

    /// Analysis configuration (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Reject sessions with duplicate timestamps
    #[arg(long)]
    strict: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every analysis and write the session report
    Analyze {
        #[command(flatten)]
        input: InputArgs,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        output_format: OutputFormat,
    },

    /// Write segmented traces with derived kinematic columns
    Traces {
        #[command(flatten)]
        input: InputArgs,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        output_format: OutputFormat,

        /// Derivation stage to compute
        #[arg(long, default_value = "raw")]
        stage: StageArg,

        /// Keep only traces ending in a click, mouse-down or mouse-up
        #[arg(long)]
        click_bounded: bool,
    },

    /// Check schema and timestamp integrity of an event log
    Validate {
        #[command(flatten)]
        input: InputArgs,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,

        /// Fail unless keyboard columns are present
        #[arg(long)]
        keyboard: bool,
    },

    /// Print the default analysis configuration
    Config {
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum InputFormatArg {
    /// Comma-separated values with a header row
    Csv,
    /// Newline-delimited JSON (one event per line)
    Ndjson,
    /// JSON array of events
    Json,
}

impl From<InputFormatArg> for InputFormat {
    fn from(arg: InputFormatArg) -> Self {
        match arg {
            InputFormatArg::Csv => InputFormat::Csv,
            InputFormatArg::Ndjson => InputFormat::Ndjson,
            InputFormatArg::Json => InputFormat::Json,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one record per line)
    Ndjson,
    /// Compact JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

#[derive(Clone, Copy, ValueEnum)]
enum StageArg {
    Raw,
    Differenced,
    Distance,
    Velocity,
    Acceleration,
    Jerkiness,
}

impl From<StageArg> for TraceStage {
    fn from(arg: StageArg) -> Self {
        match arg {
            StageArg::Raw => TraceStage::Raw,
            StageArg::Differenced => TraceStage::Differenced,
            StageArg::Distance => TraceStage::Distance,
            StageArg::Velocity => TraceStage::Velocity,
            StageArg::Acceleration => TraceStage::Acceleration,
            StageArg::Jerkiness => TraceStage::Jerkiness,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), WibCliError> {
    match cli.command {
        Commands::Analyze {
            input,
            output,
            output_format,
        } => cmd_analyze(&input, &output, output_format),

        Commands::Traces {
            input,
            output,
            output_format,
            stage,
            click_bounded,
        } => cmd_traces(&input, &output, output_format, stage.into(), click_bounded),

        Commands::Validate {
            input,
            json,
            keyboard,
        } => cmd_validate(&input, json, keyboard),

        Commands::Config { output } => cmd_config(output.as_deref()),
    }
}

fn cmd_analyze(
    args: &InputArgs,
    output: &Path,
    output_format: OutputFormat,
) -> Result<(), WibCliError> {
    let analyzer = load_analyzer(args)?;
    let sessions = analyzer.analyze()?;
    let report = ReportEncoder::new().encode(sessions, analyzer.config());

    let output_data = match output_format {
        OutputFormat::Ndjson => {
            let mut lines: Vec<String> = Vec::new();
            for session in &report.sessions {
                lines.push(serde_json::to_string(session)?);
            }
            lines.join("\n") + "\n"
        }
        OutputFormat::Json => serde_json::to_string(&report)?,
        OutputFormat::JsonPretty => serde_json::to_string_pretty(&report)?,
    };
    write_output(output, &output_data)
}

fn cmd_traces(
    args: &InputArgs,
    output: &Path,
    output_format: OutputFormat,
    stage: TraceStage,
    click_bounded: bool,
) -> Result<(), WibCliError> {
    let analyzer = load_analyzer(args)?;
    let traces = if click_bounded {
        analyzer.click_bounded_traces()?
    } else {
        analyzer.traces()?
    };
    let traces: TraceMap = advance_all(&traces, stage);
    debug!(sessions = traces.len(), "traces segmented");

    let output_data = match output_format {
        OutputFormat::Ndjson => {
            let mut lines: Vec<String> = Vec::new();
            for trace in traces.values().flatten() {
                lines.push(serde_json::to_string(trace)?);
            }
            lines.join("\n") + "\n"
        }
        OutputFormat::Json => serde_json::to_string(&traces)?,
        OutputFormat::JsonPretty => serde_json::to_string_pretty(&traces)?,
    };
    write_output(output, &output_data)
}

fn cmd_validate(args: &InputArgs, json: bool, keyboard: bool) -> Result<(), WibCliError> {
    let log = read_log(args)?;
    let report = EventLogAdapter::validate(&log, args.strict);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Events:                 {}", report.events);
        println!("Sessions:               {}", report.sessions);
        println!("Keyboard columns:       {}", report.keyboard_columns);
        println!("Non-numeric timestamps: {}", report.non_numeric_timestamps);

        if !report.duplicate_timestamp_sessions.is_empty() {
            println!("\nSessions with duplicate timestamps:");
            for session_id in &report.duplicate_timestamp_sessions {
                println!("  - {}", session_id);
            }
        }
        if let Some(error) = &report.error {
            println!("\nError: {}", error);
        }
    }

    if keyboard {
        log.require_keyboard_columns()?;
    }
    match report.error {
        Some(error) => Err(WibCliError::ValidationFailed(error)),
        None => Ok(()),
    }
}

fn cmd_config(output: Option<&Path>) -> Result<(), WibCliError> {
    let config = AnalysisConfig::default();
    match output {
        Some(path) => config.save(path)?,
        None => print!("{}", config.to_toml()?),
    }
    Ok(())
}

fn load_analyzer(args: &InputArgs) -> Result<Analyzer, WibCliError> {
    let mut config = match &args.config {
        Some(path) => AnalysisConfig::load(path)?,
        None => AnalysisConfig::default(),
    };
    if args.strict {
        config.strict_timestamps = true;
    }

    let log = read_log(args)?;
    if log.is_empty() {
        return Err(WibCliError::NoEvents);
    }
    Ok(Analyzer::new(config)?.with_log(log)?)
}

fn read_log(args: &InputArgs) -> Result<EventLog, WibCliError> {
    let input_data = if args.input.to_string_lossy() == "-" {
        if atty::is(atty::Stream::Stdin) {
            warn!("reading events from an interactive terminal; end input with Ctrl-D");
        }
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        fs::read_to_string(&args.input)?
    };

    Ok(EventLogAdapter::parse(&input_data, args.input_format.into())?)
}

fn write_output(output: &Path, data: &str) -> Result<(), WibCliError> {
    if output.to_string_lossy() == "-" {
        print!("{}", data);
    } else {
        fs::write(output, data)?;
    }
    Ok(())
}

// Error handling

#[derive(Debug)]
enum WibCliError {
    Io(io::Error),
    Compute(ComputeError),
    Json(serde_json::Error),
    NoEvents,
    ValidationFailed(String),
}

impl From<io::Error> for WibCliError {
    fn from(e: io::Error) -> Self {
        WibCliError::Io(e)
    }
}

impl From<ComputeError> for WibCliError {
    fn from(e: ComputeError) -> Self {
        WibCliError::Compute(e)
    }
}

impl From<serde_json::Error> for WibCliError {
    fn from(e: serde_json::Error) -> Self {
        WibCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<WibCliError> for CliError {
    fn from(e: WibCliError) -> Self {
        match e {
            WibCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            WibCliError::Compute(e) => compute_error(e),
            WibCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            WibCliError::NoEvents => CliError {
                code: "NO_EVENTS".to_string(),
                message: "No events found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            WibCliError::ValidationFailed(msg) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: msg,
                hint: Some("Run 'wib validate' for details".to_string()),
            },
        }
    }
}

fn compute_error(e: ComputeError) -> CliError {
    let (code, hint) = match &e {
        ComputeError::MissingColumn(_) => (
            "MISSING_COLUMN",
            "Input needs sessionId, eventType, timeStamp, x and y columns",
        ),
        ComputeError::DuplicateTimestamps { .. } => (
            "DUPLICATE_TIMESTAMPS",
            "Drop --strict to analyze anyway with a warning",
        ),
        ComputeError::InvalidConfig(_) => ("INVALID_CONFIG", "Run 'wib config' for valid defaults"),
        ComputeError::ParseError(_) | ComputeError::CsvError(_) => {
            ("PARSE_ERROR", "Check --input-format matches the file")
        }
        ComputeError::JsonError(_) => ("JSON_ERROR", "Check JSON syntax"),
        ComputeError::IoError(_) => ("IO_ERROR", "Check file paths and permissions"),
        _ => ("COMPUTE_ERROR", "Run with --verbose for details"),
    };
    CliError {
        code: code.to_string(),
        message: e.to_string(),
        hint: Some(hint.to_string()),
    }
}
