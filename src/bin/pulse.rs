//! Pulse CLI - Command-line interface for Study Pulse
//!
//! Commands:
//! - schedule: Synthesize a day schedule from a routine
//! - aggregate: Aggregate topic/test telemetry
//! - classify: Classify a wellness sample
//! - report: Build a combined study report from a student snapshot
//! - doctor: Diagnose configuration and environment

use clap::{Parser, Subcommand};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use serde::Serialize;
use tracing::{debug, info};

use study_pulse::pipeline::{StudentSnapshot, TelemetrySnapshot};
use study_pulse::telemetry::{LedgerQuery, TelemetryAggregator};
use study_pulse::types::{RoutineConfig, Subject, WellnessSample};
use study_pulse::validation::validate_telemetry;
use study_pulse::{
    classify_wellness, synthesize_schedule, ComputeError, EngineConfig, IntelligenceEngine,
    LedgerSort, PRODUCER_NAME, PULSE_VERSION,
};

/// Pulse - Offline heuristic engine for study schedules, analytics and wellness
#[derive(Parser)]
#[command(name = "pulse")]
#[command(version = PULSE_VERSION)]
#[command(about = "Turn study telemetry into schedules, metrics and wellness signals", long_about = None)]
struct Cli {
    /// Engine configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level (overridden by RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Synthesize a day schedule from a routine JSON
    Schedule {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Subject the morning deep-work block should target
        #[arg(long)]
        weak_subject: Option<Subject>,
    },

    /// Aggregate a {topics, tests} snapshot
    Aggregate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Restrict all metrics to one subject
        #[arg(long)]
        subject: Option<Subject>,

        /// Case-insensitive topic name filter for the ledger
        #[arg(long)]
        search: Option<String>,

        /// Ledger sort key (accuracy, time_spent, return_on_time)
        #[arg(long)]
        sort: Option<LedgerSort>,
    },

    /// Classify a wellness sample JSON
    Classify {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Build a combined report from a student snapshot JSON
    Report {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Restrict telemetry to one subject
        #[arg(long)]
        subject: Option<Subject>,
    },

    /// Diagnose configuration and environment
    Doctor {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
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

fn init_tracing(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), PulseCliError> {
    // Doctor reports config problems instead of failing on them
    let config_result = match &cli.config {
        Some(path) => EngineConfig::load(path),
        None => Ok(EngineConfig::default()),
    };

    let log_level = cli
        .log_level
        .clone()
        .or_else(|| config_result.as_ref().ok().map(|c| c.log_level.clone()))
        .unwrap_or_else(|| "info".to_string());
    init_tracing(&log_level);

    if let Commands::Doctor { json } = cli.command {
        return cmd_doctor(cli.config.as_deref(), config_result, json);
    }

    let config = config_result?;
    debug!(?config, "loaded engine configuration");

    match cli.command {
        Commands::Schedule {
            input,
            weak_subject,
        } => cmd_schedule(&input, weak_subject, cli.pretty),

        Commands::Aggregate {
            input,
            subject,
            search,
            sort,
        } => cmd_aggregate(&input, &config, subject, search, sort, cli.pretty),

        Commands::Classify { input } => cmd_classify(&input, cli.pretty),

        Commands::Report { input, subject } => cmd_report(&input, config, subject, cli.pretty),

        Commands::Doctor { .. } => Ok(()),
    }
}

fn cmd_schedule(
    input: &Path,
    weak_subject: Option<Subject>,
    pretty: bool,
) -> Result<(), PulseCliError> {
    let routine: RoutineConfig = serde_json::from_str(&read_input(input)?)?;
    let slots = synthesize_schedule(&routine, weak_subject);
    info!(blocks = slots.len(), "schedule synthesized");
    print_json(&slots, pretty)
}

fn cmd_aggregate(
    input: &Path,
    config: &EngineConfig,
    subject: Option<Subject>,
    search: Option<String>,
    sort: Option<LedgerSort>,
    pretty: bool,
) -> Result<(), PulseCliError> {
    let snapshot: TelemetrySnapshot = serde_json::from_str(&read_input(input)?)?;
    validate_telemetry(&snapshot.topics, &snapshot.tests).map_err(ComputeError::from)?;

    let aggregator = TelemetryAggregator::new(config);
    let mut report = aggregator.aggregate(&snapshot.topics, &snapshot.tests, subject);

    if search.is_some() || sort.is_some() {
        let query = LedgerQuery {
            search,
            sort: sort.unwrap_or(config.default_ledger_sort),
        };
        report.ranked_ledger = study_pulse::telemetry::query_ledger(&report.ranked_ledger, &query);
    }

    info!(
        topics = report.topic_count,
        percentile = report.percentile,
        "telemetry aggregated"
    );
    print_json(&report, pretty)
}

fn cmd_classify(input: &Path, pretty: bool) -> Result<(), PulseCliError> {
    let sample: WellnessSample = serde_json::from_str(&read_input(input)?)?;
    let assessment = classify_wellness(&sample)?;
    info!(profile = ?assessment.profile, "wellness classified");
    print_json(&assessment, pretty)
}

fn cmd_report(
    input: &Path,
    config: EngineConfig,
    subject: Option<Subject>,
    pretty: bool,
) -> Result<(), PulseCliError> {
    let snapshot: StudentSnapshot = serde_json::from_str(&read_input(input)?)?;
    let engine = IntelligenceEngine::with_config(config);
    let report = engine.report(&snapshot, subject)?;
    print_json(&report, pretty)
}

fn cmd_doctor(
    config_path: Option<&Path>,
    config_result: Result<EngineConfig, ComputeError>,
    json: bool,
) -> Result<(), PulseCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "pulse_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Pulse version {}", PULSE_VERSION),
    });

    let config_check = match (config_path, &config_result) {
        (None, _) => DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Ok,
            message: "No config file given, using defaults".to_string(),
        },
        (Some(path), Ok(config)) => DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Ok,
            message: format!(
                "{} valid (mock gap policy {:?}, baseline window {})",
                path.display(),
                config.mock_gap_policy,
                config.wellness_baseline_window
            ),
        },
        (Some(_), Err(e)) => DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Error,
            message: e.to_string(),
        },
    };
    checks.push(config_check);

    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (pass --input <file>)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (--input - ready)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: PULSE_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Pulse Doctor Report");
        println!("===================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(PulseCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

// Helper functions

fn read_input(input: &Path) -> Result<String, PulseCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<(), PulseCliError> {
    let text = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", text);
    Ok(())
}

// Error types

#[derive(Debug)]
enum PulseCliError {
    Io(io::Error),
    Compute(ComputeError),
    Json(serde_json::Error),
    DoctorFailed,
}

impl From<io::Error> for PulseCliError {
    fn from(e: io::Error) -> Self {
        PulseCliError::Io(e)
    }
}

impl From<ComputeError> for PulseCliError {
    fn from(e: ComputeError) -> Self {
        PulseCliError::Compute(e)
    }
}

impl From<serde_json::Error> for PulseCliError {
    fn from(e: serde_json::Error) -> Self {
        PulseCliError::Json(e)
    }
}

#[derive(Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<PulseCliError> for CliError {
    fn from(e: PulseCliError) -> Self {
        match e {
            PulseCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            PulseCliError::Compute(ComputeError::Validation(e)) => CliError {
                code: "VALIDATION_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Times must be HH:MM, wellness dimensions 0-10".to_string()),
            },
            PulseCliError::Compute(ComputeError::ConfigError(msg)) => CliError {
                code: "CONFIG_ERROR".to_string(),
                message: msg,
                hint: Some("Run 'pulse doctor --config <file>' for details".to_string()),
            },
            PulseCliError::Compute(e) => CliError {
                code: "COMPUTE_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            PulseCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax and field names".to_string()),
            },
            PulseCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(Serialize)]
enum CheckStatus {
    Ok,
    Error,
}
