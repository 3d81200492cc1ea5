// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use flexi_logger::{Logger, LoggerHandle};
use log::{debug, info};
use offpeak_cli::run_estimate;
use offpeak_core::{BlockDecomposition, OffPeakConfig, OffPeakError, PhaseRange};
use offpeak_estimator::EstimateDiagnostics;
use serde::Serialize;
use serde_json::Value;
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

const DEFAULT_LOG_SPEC: &str = "warn";

struct Cli {
    command: Command,
}

enum Command {
    Estimate(EstimateArgs),
}

#[derive(Debug, Default)]
struct EstimateArgs {
    ncp_prior: Option<f64>,
    nbins: Option<usize>,
    margin: Option<f64>,
    config: Option<PathBuf>,
    blocks: bool,
    log_level: Option<String>,
    input: PathBuf,
    output: Option<PathBuf>,
}

#[derive(Debug)]
enum CliError {
    Core(OffPeakError),
    Io {
        context: String,
        source: std::io::Error,
    },
    Json {
        context: String,
        source: serde_json::Error,
    },
    Logging(String),
    InvalidInput(String),
    NotSupported(String),
}

impl CliError {
    fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    fn not_supported(msg: impl Into<String>) -> Self {
        Self::NotSupported(msg.into())
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
            Self::Core(err) => err.code(),
            Self::InvalidInput(_) => "invalid_input",
            Self::NotSupported(_) => "not_supported",
            Self::Logging(_) => "logging_error",
            Self::Io { .. } => "io_error",
            Self::Json { .. } => "json_error",
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Core(err) => write!(f, "{err}"),
            Self::Io { context, source } => write!(f, "{context}: {source}"),
            Self::Json { context, source } => write!(f, "{context}: {source}"),
            Self::Logging(msg) => write!(f, "failed to start logger: {msg}"),
            Self::InvalidInput(msg) => write!(f, "{msg}"),
            Self::NotSupported(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Core(err) => Some(err),
            Self::Io { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
            Self::Logging(_) | Self::InvalidInput(_) | Self::NotSupported(_) => None,
        }
    }
}

impl From<OffPeakError> for CliError {
    fn from(value: OffPeakError) -> Self {
        Self::Core(value)
    }
}

#[derive(Clone, Debug)]
struct LoadedPhases {
    path: PathBuf,
    format: &'static str,
    phases: Vec<f64>,
}

impl LoadedPhases {
    fn summary(&self) -> InputSummary {
        InputSummary {
            path: self.path.display().to_string(),
            format: self.format.to_string(),
            n: self.phases.len(),
        }
    }
}

#[derive(Serialize)]
struct InputSummary {
    path: String,
    format: String,
    n: usize,
}

#[derive(Serialize)]
struct EstimateOutput {
    command: &'static str,
    input: InputSummary,
    config: OffPeakConfig,
    window: PhaseRange,
    raw_block: PhaseRange,
    #[serde(skip_serializing_if = "Option::is_none")]
    blocks: Option<BlockDecomposition>,
    diagnostics: EstimateDiagnostics,
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

fn main() {
    if let Err(err) = run() {
        emit_structured_error(&err);
        process::exit(1);
    }
}

fn run() -> Result<(), CliError> {
    let Some(cli) = parse_cli_from_env()? else {
        return Ok(());
    };

    match cli.command {
        Command::Estimate(args) => handle_estimate(args),
    }
}

fn parse_cli_from_env() -> Result<Option<Cli>, CliError> {
    let args = env::args().skip(1).collect::<Vec<_>>();
    if args.is_empty() {
        print_root_help();
        return Ok(None);
    }

    if matches!(args[0].as_str(), "-h" | "--help") {
        print_root_help();
        return Ok(None);
    }
    if matches!(args[0].as_str(), "-V" | "--version") {
        print_version();
        return Ok(None);
    }

    let command_name = args[0].clone();
    let rest = &args[1..];

    if rest
        .iter()
        .any(|arg| matches!(arg.as_str(), "-h" | "--help"))
    {
        print_command_help(command_name.as_str())?;
        return Ok(None);
    }

    let command = match command_name.as_str() {
        "estimate" => Command::Estimate(parse_estimate_args(rest)?),
        _ => {
            return Err(CliError::invalid_input(format!(
                "unknown command '{command_name}'; expected: estimate"
            )));
        }
    };

    Ok(Some(Cli { command }))
}

fn parse_estimate_args(tokens: &[String]) -> Result<EstimateArgs, CliError> {
    let mut args = EstimateArgs::default();
    let mut idx = 0usize;
    while idx < tokens.len() {
        let (flag, inline_value) = split_flag(tokens[idx].as_str())?;
        match flag {
            "--ncp-prior" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.ncp_prior = Some(parse_f64_arg(raw.as_str(), flag)?);
            }
            "--nbins" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.nbins = Some(parse_usize_arg(raw.as_str(), flag)?);
            }
            "--margin" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.margin = Some(parse_f64_arg(raw.as_str(), flag)?);
            }
            "--config" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.config = Some(PathBuf::from(raw));
            }
            "--blocks" => {
                ensure_no_inline_value(flag, inline_value)?;
                args.blocks = true;
            }
            "--log-level" => {
                args.log_level = Some(take_flag_value(flag, inline_value, tokens, &mut idx)?);
            }
            "--input" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.input = PathBuf::from(raw);
            }
            "--output" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.output = Some(PathBuf::from(raw));
            }
            other => {
                return Err(CliError::invalid_input(format!(
                    "unknown estimate option '{other}'"
                )));
            }
        }
        idx += 1;
    }

    if args.input.as_os_str().is_empty() {
        return Err(CliError::invalid_input("estimate requires --input <path>"));
    }

    Ok(args)
}

fn split_flag(token: &str) -> Result<(&str, Option<String>), CliError> {
    if !token.starts_with("--") {
        return Err(CliError::invalid_input(format!(
            "unexpected positional argument '{token}'; expected --flag value"
        )));
    }
    if let Some((flag, value)) = token.split_once('=') {
        return Ok((flag, Some(value.to_string())));
    }
    Ok((token, None))
}

fn take_flag_value(
    flag: &str,
    inline_value: Option<String>,
    tokens: &[String],
    idx: &mut usize,
) -> Result<String, CliError> {
    if let Some(value) = inline_value {
        return Ok(value);
    }

    *idx += 1;
    let value = tokens
        .get(*idx)
        .ok_or_else(|| CliError::invalid_input(format!("{flag} requires a value")))?;
    if value.starts_with("--") {
        return Err(CliError::invalid_input(format!(
            "{flag} requires a value, but got option '{value}'"
        )));
    }
    Ok(value.clone())
}

fn ensure_no_inline_value(flag: &str, inline_value: Option<String>) -> Result<(), CliError> {
    if inline_value.is_some() {
        return Err(CliError::invalid_input(format!(
            "{flag} does not accept a value"
        )));
    }
    Ok(())
}

fn parse_usize_arg(raw: &str, flag: &str) -> Result<usize, CliError> {
    raw.parse::<usize>().map_err(|_| {
        CliError::invalid_input(format!(
            "{flag} expects a non-negative integer, got '{raw}'"
        ))
    })
}

fn parse_f64_arg(raw: &str, flag: &str) -> Result<f64, CliError> {
    raw.parse::<f64>()
        .map_err(|_| CliError::invalid_input(format!("{flag} expects a number, got '{raw}'")))
}

fn print_version() {
    println!("offpeak {}", env!("CARGO_PKG_VERSION"));
}

fn print_root_help() {
    println!(
        "offpeak {}\n\nUSAGE:\n  offpeak <COMMAND> [OPTIONS]\n\nCOMMANDS:\n  estimate   Estimate the off-peak window of a pulsar phase list\n\nGLOBAL OPTIONS:\n  -h, --help      Show help\n  -V, --version   Show version\n\nRun 'offpeak <COMMAND> --help' for subcommand options.",
        env!("CARGO_PKG_VERSION")
    );
}

fn print_command_help(command: &str) -> Result<(), CliError> {
    match command {
        "estimate" => {
            println!(
                "USAGE:\n  offpeak estimate --input <path> [OPTIONS]\n\nOPTIONS:\n  --input <path>          Required (.csv, .txt or .json phase list)\n  --ncp-prior <float>     Default: 5.0\n  --nbins <usize>         Default: 50, max: 4096\n  --margin <float>        Fraction trimmed from each side; default: 0.1\n  --config <path>         JSON config; flags override its fields\n  --blocks                Include the retained block decomposition\n  --log-level <spec>      Logger spec, e.g. debug; default: RUST_LOG or warn\n  --output <path>         Write JSON output to file"
            );
            Ok(())
        }
        other => Err(CliError::invalid_input(format!(
            "unknown command '{other}'; expected: estimate"
        ))),
    }
}

fn setup_logging(level: Option<&str>) -> Result<LoggerHandle, CliError> {
    let logger = match level {
        Some(spec) => Logger::try_with_str(spec),
        None => Logger::try_with_env_or_str(DEFAULT_LOG_SPEC),
    }
    .map_err(|err| CliError::Logging(err.to_string()))?;

    logger
        .log_to_stderr()
        .start()
        .map_err(|err| CliError::Logging(err.to_string()))
}

fn handle_estimate(args: EstimateArgs) -> Result<(), CliError> {
    let _logger = setup_logging(args.log_level.as_deref())?;

    let config = resolve_config(&args)?;
    let input = load_phases(args.input.as_path())?;
    info!(
        "estimating off-peak window for {} phases from '{}'",
        input.phases.len(),
        input.path.display()
    );

    let result = run_estimate(&input.phases, &config)?;

    write_json_output(
        &EstimateOutput {
            command: "estimate",
            input: input.summary(),
            config,
            window: result.window,
            raw_block: result.raw_block,
            blocks: args.blocks.then_some(result.blocks),
            diagnostics: result.diagnostics,
        },
        args.output.as_deref(),
    )
}

fn resolve_config(args: &EstimateArgs) -> Result<OffPeakConfig, CliError> {
    let mut config = match args.config.as_deref() {
        Some(path) => load_config(path)?,
        None => OffPeakConfig::default(),
    };

    if let Some(ncp_prior) = args.ncp_prior {
        config.ncp_prior = ncp_prior;
    }
    if let Some(nbins) = args.nbins {
        config.nbins = nbins;
    }
    if let Some(margin) = args.margin {
        config.margin_fraction = margin;
    }

    config.validate()?;
    debug!("resolved config: {config:?}");
    Ok(config)
}

fn load_config(path: &Path) -> Result<OffPeakConfig, CliError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| CliError::io(format!("failed to read '{}'", path.display()), source))?;
    serde_json::from_str(raw.as_str()).map_err(|source| {
        CliError::json(
            format!("failed to parse config JSON '{}'", path.display()),
            source,
        )
    })
}

fn load_phases(path: &Path) -> Result<LoadedPhases, CliError> {
    let extension = path
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.to_ascii_lowercase())
        .ok_or_else(|| {
            CliError::not_supported(format!(
                "unable to infer input format for '{}'; expected .csv, .txt or .json",
                path.display()
            ))
        })?;

    let format = match extension.as_str() {
        "csv" => "csv",
        "txt" => "txt",
        "json" => "json",
        _ => {
            return Err(CliError::not_supported(format!(
                "unsupported input format '{extension}'; expected .csv, .txt or .json"
            )));
        }
    };

    let raw = fs::read_to_string(path)
        .map_err(|source| CliError::io(format!("failed to read '{}'", path.display()), source))?;
    let phases = if format == "json" {
        parse_json_phases(raw.as_str())?
    } else {
        parse_text_phases(raw.as_str())?
    };

    Ok(LoadedPhases {
        path: path.to_path_buf(),
        format,
        phases,
    })
}

/// Reads one or more phases per line, separated by commas or whitespace.
/// Lines starting with `#` are comments; a single non-numeric header line is
/// skipped.
fn parse_text_phases(raw: &str) -> Result<Vec<f64>, CliError> {
    let rows = raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .collect::<Vec<_>>();

    if rows.is_empty() {
        return Err(CliError::invalid_input("phase list is empty"));
    }

    match parse_text_rows(rows.as_slice(), 0) {
        Ok(parsed) => Ok(parsed),
        Err(err) => {
            if rows.len() > 1 && row_looks_like_header(rows[0]) {
                if let Ok(without_header) = parse_text_rows(&rows[1..], 1) {
                    return Ok(without_header);
                }
            }
            Err(err)
        }
    }
}

fn parse_text_rows(rows: &[&str], row_offset: usize) -> Result<Vec<f64>, CliError> {
    let mut phases = Vec::<f64>::new();
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, cell) in split_cells(row).enumerate() {
            let value = cell.parse::<f64>().map_err(|_| {
                CliError::invalid_input(format!(
                    "row {} column {} is not a valid float: '{}'",
                    row_idx + row_offset + 1,
                    col_idx + 1,
                    cell
                ))
            })?;
            phases.push(value);
        }
    }
    Ok(phases)
}

fn split_cells(row: &str) -> impl Iterator<Item = &str> {
    row.split(|ch: char| ch == ',' || ch.is_whitespace())
        .map(str::trim)
        .filter(|cell| !cell.is_empty())
}

fn row_looks_like_header(row: &str) -> bool {
    let mut cells = split_cells(row).peekable();
    cells.peek().is_some() && cells.all(|cell| cell.parse::<f64>().is_err())
}

/// Accepts a bare array of numbers or an object with a `phases` array.
fn parse_json_phases(raw: &str) -> Result<Vec<f64>, CliError> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|source| CliError::json("failed to parse phase JSON", source))?;

    let items = match &value {
        Value::Array(items) => items,
        Value::Object(map) => match map.get("phases") {
            Some(Value::Array(items)) => items,
            Some(_) => {
                return Err(CliError::invalid_input(
                    "phase JSON field 'phases' must be an array of numbers",
                ));
            }
            None => {
                return Err(CliError::invalid_input(
                    "phase JSON object is missing the 'phases' field",
                ));
            }
        },
        _ => {
            return Err(CliError::invalid_input(
                "phase JSON must be an array of numbers or an object with 'phases'",
            ));
        }
    };

    items
        .iter()
        .enumerate()
        .map(|(idx, item)| {
            item.as_f64().ok_or_else(|| {
                CliError::invalid_input(format!("phase JSON entry {idx} is not a number: {item}"))
            })
        })
        .collect()
}

fn write_json_output<T: Serialize>(
    payload: &T,
    output_path: Option<&Path>,
) -> Result<(), CliError> {
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
