// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use clap::{ArgAction, Args, Parser, Subcommand};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use tracing::info;
use tracing_subscriber::EnvFilter;
use wev_core::{format_timestamp, Diagnostics, Frequency, WevError};
use wev_eval::{ContingencyTable, SkillScores};
use wev_pipeline::{read_csv_series, run_and_export, EvaluationConfig, RunReport};
use wev_qc::{verify, VerifyConfig, DEFAULT_MAX_ITERATIONS};

#[derive(Debug, Parser)]
#[command(name = "wev", version, about = "Evaluate comparison time series against a baseline")]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug, -vvv trace); overrides RUST_LOG.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a full evaluation described by a JSON configuration.
    Run(RunArgs),
    /// Repair one series and print the repair diagnostics.
    Verify(VerifyArgs),
    /// Score paired 0/1 ramp flags from a delimited file.
    Score(ScoreArgs),
}

#[derive(Debug, Args)]
struct RunArgs {
    #[arg(long)]
    config: PathBuf,
    /// Directory for the CSV tables; overrides `output.path`.
    #[arg(long)]
    output: Option<PathBuf>,
    /// Write the JSON run report here instead of stdout.
    #[arg(long)]
    report: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct VerifyArgs {
    #[arg(long)]
    input: PathBuf,
    #[arg(long)]
    column: String,
    #[arg(long)]
    freq_minutes: u32,
    #[arg(long)]
    time_column: Option<String>,
    #[arg(long, default_value_t = DEFAULT_MAX_ITERATIONS)]
    max_iterations: usize,
    /// Sentinel value to treat as missing, e.g. -999.
    #[arg(long, allow_hyphen_values = true)]
    flag: Option<f64>,
}

#[derive(Debug, Args)]
struct ScoreArgs {
    #[arg(long)]
    input: PathBuf,
}

#[derive(Debug)]
enum CliError {
    Wev(WevError),
    Io {
        context: String,
        source: std::io::Error,
    },
    Json {
        context: String,
        source: serde_json::Error,
    },
    InvalidInput(String),
}

impl CliError {
    fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    fn json(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Json {
            context: context.into(),
            source,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::Wev(err) => err.code(),
            Self::InvalidInput(_) => "invalid_input",
            Self::Io { .. } => "io_error",
            Self::Json { .. } => "json_error",
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wev(err) => write!(f, "{err}"),
            Self::Io { context, source } => write!(f, "{context}: {source}"),
            Self::Json { context, source } => write!(f, "{context}: {source}"),
            Self::InvalidInput(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Wev(err) => Some(err),
            Self::Io { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
            Self::InvalidInput(_) => None,
        }
    }
}

impl From<WevError> for CliError {
    fn from(value: WevError) -> Self {
        Self::Wev(value)
    }
}

#[derive(Serialize)]
struct ErrorEnvelope {
    error: ErrorPayload,
}

#[derive(Serialize)]
struct ErrorPayload {
    code: String,
    message: String,
}

#[derive(Serialize)]
struct VerifyOutput {
    label: String,
    len: usize,
    first: Option<String>,
    last: Option<String>,
    nan_count: usize,
    diagnostics: Diagnostics,
}

#[derive(Serialize)]
struct ScoreOutput {
    time_sample: usize,
    true_positive: usize,
    false_positive: usize,
    false_negative: usize,
    true_negative: usize,
    scores: SkillScores,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(err) = dispatch(cli.command) {
        emit_structured_error(&err);
        process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn dispatch(command: Command) -> Result<(), CliError> {
    match command {
        Command::Run(args) => run(args),
        Command::Verify(args) => verify_series(args),
        Command::Score(args) => score(args),
    }
}

fn run(args: RunArgs) -> Result<(), CliError> {
    let config = EvaluationConfig::from_path(&args.config)?;
    let base_dir = args
        .config
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();

    let (report, written) = run_and_export(&config, &base_dir, args.output.as_deref())?;
    for path in &written {
        info!(path = %path.display(), "wrote table");
    }
    summarize_failures(&report);
    write_json_output(&report, args.report.as_deref())
}

fn summarize_failures(report: &RunReport) {
    for failure in &report.failures {
        tracing::warn!(
            level = failure.key.level,
            dataset = %failure.key.dataset,
            code = failure.code,
            "{}",
            failure.message
        );
    }
}

fn verify_series(args: VerifyArgs) -> Result<(), CliError> {
    let frequency = Frequency::from_minutes(args.freq_minutes)?;
    let series = read_csv_series(
        &args.input,
        args.time_column.as_deref(),
        &args.column,
        &args.column,
        frequency,
    )?;
    let mut config = VerifyConfig::new(frequency).with_max_iterations(args.max_iterations);
    if let Some(flag) = args.flag {
        config = config.with_flag(flag);
    }
    let verified = verify(series, &config)?;

    let output = VerifyOutput {
        label: verified.series.label().to_string(),
        len: verified.series.len(),
        first: verified.series.first_timestamp().map(format_timestamp),
        last: verified.series.last_timestamp().map(format_timestamp),
        nan_count: verified.series.nan_count(),
        diagnostics: verified.diagnostics,
    };
    write_json_output(&output, None)
}

fn parse_flag(raw: &str, row: usize, column: &str) -> Result<bool, CliError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "1.0" | "true" => Ok(true),
        "0" | "0.0" | "false" => Ok(false),
        other => Err(CliError::invalid_input(format!(
            "row {row}: '{column}' must be 0 or 1; got '{other}'"
        ))),
    }
}

fn read_flags(path: &Path) -> Result<(Vec<bool>, Vec<bool>), CliError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| CliError::io(format!("failed to read '{}'", path.display()), source))?;
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(raw.as_bytes());
    let headers = reader
        .headers()
        .map_err(|err| CliError::invalid_input(format!("failed to read header: {err}")))?
        .clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| CliError::invalid_input(format!("missing column '{name}'")))
    };
    let base_idx = column("base_ramp")?;
    let comp_idx = column("comp_ramp")?;

    let mut baseline = Vec::new();
    let mut comparison = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let row = i + 1;
        let record =
            record.map_err(|err| CliError::invalid_input(format!("row {row}: {err}")))?;
        baseline.push(parse_flag(record.get(base_idx).unwrap_or_default(), row, "base_ramp")?);
        comparison.push(parse_flag(record.get(comp_idx).unwrap_or_default(), row, "comp_ramp")?);
    }
    Ok((baseline, comparison))
}

fn score_flags(baseline: &[bool], comparison: &[bool]) -> Result<ScoreOutput, CliError> {
    let table = ContingencyTable::from_flags(baseline, comparison)?;
    info!("2x2 contingency table:\n{table}");
    Ok(ScoreOutput {
        time_sample: table.total(),
        true_positive: table.true_positive,
        false_positive: table.false_positive,
        false_negative: table.false_negative,
        true_negative: table.true_negative,
        scores: table.scores(),
    })
}

fn score(args: ScoreArgs) -> Result<(), CliError> {
    let (baseline, comparison) = read_flags(&args.input)?;
    write_json_output(&score_flags(&baseline, &comparison)?, None)
}

fn write_json_output<T: Serialize>(payload: &T, output_path: Option<&Path>) -> Result<(), CliError> {
    let encoded = serde_json::to_string_pretty(payload)
        .map_err(|source| CliError::json("failed to serialize JSON output", source))?;

    if let Some(path) = output_path {
        fs::write(path, format!("{encoded}\n"))
            .map_err(|source| CliError::io(format!("failed to write '{}'", path.display()), source))
    } else {
        println!("{encoded}");
        Ok(())
    }
}

fn emit_structured_error(err: &CliError) {
    let envelope = ErrorEnvelope {
        error: ErrorPayload {
            code: err.code().to_string(),
            message: err.to_string(),
        },
    };

    match serde_json::to_string_pretty(&envelope) {
        Ok(json) => eprintln!("{json}"),
        Err(_) => eprintln!(
            "{{\"error\":{{\"code\":\"{}\",\"message\":\"{}\"}}}}",
            err.code(),
            err
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_flag, read_flags, score_flags, Cli, CliError, Command};
    use clap::{CommandFactory, Parser};
    use std::fs;
    use wev_core::WevError;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_verify_arguments() {
        let cli = Cli::try_parse_from([
            "wev",
            "-vv",
            "verify",
            "--input",
            "obs.csv",
            "--column",
            "ws_100m",
            "--freq-minutes",
            "10",
        ])
        .expect("arguments should parse");
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Verify(args) => {
                assert_eq!(args.column, "ws_100m");
                assert_eq!(args.freq_minutes, 10);
                assert!(args.time_column.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn flag_values_accept_numeric_and_boolean_forms() {
        assert!(parse_flag("1.0", 1, "base_ramp").expect("valid"));
        assert!(!parse_flag(" false ", 1, "base_ramp").expect("valid"));
        let err = parse_flag("2", 3, "comp_ramp").expect_err("invalid flag");
        assert_eq!(err.code(), "invalid_input");
        assert!(err.to_string().contains("row 3"));
    }

    #[test]
    fn scores_flags_from_csv() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("flags.csv");
        fs::write(
            &path,
            "time,base_ramp,comp_ramp\n\
             2020-10-31 00:00,0,0\n\
             2020-10-31 01:00,1,1\n\
             2020-10-31 02:00,0,1\n\
             2020-10-31 03:00,1,0\n",
        )
        .expect("write flags");

        let (base, comp) = read_flags(&path).expect("flags should load");
        let out = score_flags(&base, &comp).expect("scores compute");
        assert_eq!(out.time_sample, 4);
        assert_eq!(
            (out.true_positive, out.false_positive, out.false_negative, out.true_negative),
            (1, 1, 1, 1)
        );
        assert_eq!(out.scores.probability_of_detection, 0.5);
    }

    #[test]
    fn missing_flag_column_is_invalid_input() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("flags.csv");
        fs::write(&path, "time,base_ramp\n2020-10-31 00:00,0\n").expect("write flags");
        assert_eq!(read_flags(&path).expect_err("missing column").code(), "invalid_input");
    }

    #[test]
    fn library_errors_keep_their_code() {
        let err = CliError::from(WevError::non_convergent("cap reached"));
        assert_eq!(err.code(), "non_convergent");
    }
}
