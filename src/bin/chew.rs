//! chew CLI - Command-line interface for chewsense
//!
//! Commands:
//! - run: Replay recorded landmark detections through a full session
//! - analyze: Feed a distance series straight into the decision engine
//! - config: Print a configuration

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use chewsense::action::ConfiguredSink;
use chewsense::config::{ActionKind, ChewConfig};
use chewsense::controller::SessionController;
use chewsense::engine::ChewingDetector;
use chewsense::logging::init_logging;
use chewsense::replay::{parse_ndjson, ReplayBackend};
use chewsense::scheduler::Pacing;
use chewsense::types::ScrollRequest;
use chewsense::{ChewError, CHEW_VERSION};

/// chew - Heuristic chewing detection from facial-landmark distances
#[derive(Parser)]
#[command(name = "chew")]
#[command(author = "Synheart AI Inc")]
#[command(version = CHEW_VERSION)]
#[command(about = "Detect chewing from nose-to-mouth landmark distances", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct ConfigArgs {
    /// Named preset to start from
    #[arg(long, value_enum, default_value = "standalone")]
    preset: Preset,

    /// Load configuration from a JSON file (overrides --preset)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the change-rate threshold
    #[arg(long)]
    threshold: Option<f64>,

    /// Override the moving-average window size
    #[arg(long)]
    window: Option<usize>,

    /// Override the action taken on chewing
    #[arg(long, value_enum)]
    action: Option<ActionArg>,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay recorded detections (NDJSON, one frame per line)
    Run {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        #[command(flatten)]
        config: ConfigArgs,

        /// Pace cycles at the configured interval instead of running back to back
        #[arg(long)]
        realtime: bool,
    },

    /// Run a distance series through the decision engine
    Analyze {
        /// Input file path (use - for stdin); one number per line or a JSON array
        #[arg(short, long)]
        input: PathBuf,

        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Print the effective configuration as JSON
    Config {
        #[command(flatten)]
        config: ConfigArgs,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Preset {
    /// Standalone page with an on-screen counter
    Standalone,
    /// Browser extension that scrolls the host page
    Extension,
}

#[derive(Clone, Copy, ValueEnum)]
enum ActionArg {
    Scroll,
    Counter,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

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

fn run(cli: Cli) -> Result<(), ChewCliError> {
    match cli.command {
        Commands::Run {
            input,
            config,
            realtime,
        } => {
            let config = resolve_config(&config, cli.verbose)?;
            init_logging(&config.logging);
            cmd_run(&input, config, realtime)
        }
        Commands::Analyze { input, config } => {
            let config = resolve_config(&config, cli.verbose)?;
            init_logging(&config.logging);
            cmd_analyze(&input, &config)
        }
        Commands::Config { config } => {
            let config = resolve_config(&config, cli.verbose)?;
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

fn resolve_config(args: &ConfigArgs, verbose: bool) -> Result<ChewConfig, ChewCliError> {
    let mut config = match &args.config {
        Some(path) => ChewConfig::from_file(path)?,
        None => match args.preset {
            Preset::Standalone => ChewConfig::standalone(),
            Preset::Extension => ChewConfig::extension(),
        },
    };

    if let Some(threshold) = args.threshold {
        config.engine.threshold = threshold;
    }
    if let Some(window) = args.window {
        config.engine.window_size = window;
    }
    if let Some(action) = args.action {
        config.action.kind = match action {
            ActionArg::Scroll => ActionKind::Scroll,
            ActionArg::Counter => ActionKind::Counter,
        };
    }
    if verbose {
        config.logging.level = "debug".to_string();
    }

    config.validate()?;
    Ok(config)
}

fn read_input(input: &Path) -> Result<String, ChewCliError> {
    if input.to_string_lossy() == "-" {
        if atty::is(atty::Stream::Stdin) {
            tracing::warn!("Reading from an interactive terminal; end input with Ctrl-D");
        }
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn cmd_run(input: &Path, config: ChewConfig, realtime: bool) -> Result<(), ChewCliError> {
    let frames = parse_ndjson(&read_input(input)?)?;
    if frames.is_empty() {
        return Err(ChewCliError::NoInput);
    }

    let action = config.action.clone();
    let backend = ReplayBackend::new(frames, move || {
        ConfiguredSink::from_config(
            &action,
            Box::new(|request: ScrollRequest| tracing::debug!(top = request.top, "Scroll requested")),
        )
    });

    let pacing = if realtime {
        Pacing::Every(Duration::from_millis(config.capture.interval_ms))
    } else {
        Pacing::Unpaced
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async move {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let mut controller = SessionController::new(backend, config)
            .with_pacing(pacing)
            .with_observer(tx);

        controller.start(None).await?;

        let stdout = io::stdout();
        let mut out = stdout.lock();
        loop {
            tokio::select! {
                Some(report) = rx.recv() => {
                    writeln!(out, "{}", serde_json::to_string(&report)?)?;
                }
                _ = tokio::time::sleep(Duration::from_millis(20)) => {
                    if !controller.is_running() {
                        break;
                    }
                }
            }
        }

        let summary = controller.stop().await?;
        while let Ok(report) = rx.try_recv() {
            writeln!(out, "{}", serde_json::to_string(&report)?)?;
        }
        out.flush()?;

        if let Some(summary) = summary {
            eprintln!("{}", serde_json::to_string(&summary)?);
            if let Some(error) = summary.error {
                return Err(ChewCliError::SessionFailed(error));
            }
        }
        Ok::<(), ChewCliError>(())
    })
}

fn cmd_analyze(input: &Path, config: &ChewConfig) -> Result<(), ChewCliError> {
    let distances = parse_distances(&read_input(input)?)?;
    if distances.is_empty() {
        return Err(ChewCliError::NoInput);
    }

    let mut detector = ChewingDetector::new(config.engine.window_size, config.engine.threshold)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut chewing = 0usize;

    for (index, distance) in distances.iter().enumerate() {
        let decision = detector.ingest(*distance);
        if decision.is_chewing {
            chewing += 1;
        }
        let line = serde_json::json!({
            "index": index,
            "distance": distance,
            "average": decision.average,
            "change_rate": decision.change_rate,
            "is_chewing": decision.is_chewing,
        });
        writeln!(out, "{}", line)?;
    }
    out.flush()?;

    tracing::info!(samples = distances.len(), chewing, "Analysis complete");
    Ok(())
}

/// One number per line (blank lines and `#` comments ignored), or a JSON array
fn parse_distances(input: &str) -> Result<Vec<f64>, ChewCliError> {
    if input.trim_start().starts_with('[') {
        return Ok(serde_json::from_str(input)?);
    }

    let mut distances = Vec::new();
    for (i, line) in input.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let value: f64 = line.parse().map_err(|_| {
            ChewCliError::ParseError(format!("line {}: not a number: {}", i + 1, line))
        })?;
        if !value.is_finite() {
            return Err(ChewCliError::ParseError(format!(
                "line {}: distance must be finite",
                i + 1
            )));
        }
        distances.push(value);
    }
    Ok(distances)
}

// Error types

#[derive(Debug)]
enum ChewCliError {
    Io(io::Error),
    Chew(ChewError),
    Json(serde_json::Error),
    NoInput,
    SessionFailed(String),
    ParseError(String),
}

impl From<io::Error> for ChewCliError {
    fn from(e: io::Error) -> Self {
        ChewCliError::Io(e)
    }
}

impl From<ChewError> for ChewCliError {
    fn from(e: ChewError) -> Self {
        ChewCliError::Chew(e)
    }
}

impl From<serde_json::Error> for ChewCliError {
    fn from(e: serde_json::Error) -> Self {
        ChewCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<ChewCliError> for CliError {
    fn from(e: ChewCliError) -> Self {
        match e {
            ChewCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            ChewCliError::Chew(e @ ChewError::InvalidConfig(_)) => CliError {
                code: "CONFIG_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Run 'chew config' to see the effective configuration".to_string()),
            },
            ChewCliError::Chew(e @ ChewError::ParseError(_)) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Each line must be a JSON object with a faces array".to_string()),
            },
            ChewCliError::Chew(e) => CliError {
                code: "SESSION_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            ChewCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            ChewCliError::NoInput => CliError {
                code: "NO_INPUT".to_string(),
                message: "No samples found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            ChewCliError::SessionFailed(msg) => CliError {
                code: "SESSION_FAILED".to_string(),
                message: msg,
                hint: Some("Rerun with --verbose for details".to_string()),
            },
            ChewCliError::ParseError(msg) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: msg,
                hint: Some("Use one number per line or a JSON array".to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_distances_lines() {
        let distances = parse_distances("# nose-mouth px\n40.5\n\n41\n").unwrap();
        assert_eq!(distances, vec![40.5, 41.0]);
    }

    #[test]
    fn test_parse_distances_array() {
        let distances = parse_distances(" [1, 2.5, 3]").unwrap();
        assert_eq!(distances, vec![1.0, 2.5, 3.0]);
    }

    #[test]
    fn test_parse_distances_rejects_garbage() {
        match parse_distances("1\nabc\n") {
            Err(ChewCliError::ParseError(msg)) => assert!(msg.starts_with("line 2")),
            other => panic!("unexpected result {other:?}"),
        }
        assert!(parse_distances("NaN\n").is_err());
    }
}
