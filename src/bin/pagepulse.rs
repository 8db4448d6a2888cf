//! Pagepulse CLI - Command-line interface for Pagepulse
//!
//! Commands:
//! - replay: Drive recorded reading sessions through the live trackers and
//!   print the telemetry they emit
//! - validate: Validate recorded session schema

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use pagepulse::replay::{replay_session, ReplayReport};
use pagepulse::session::{
    parse_session, parse_sessions_array, parse_sessions_ndjson, ReadingSession,
};
use pagepulse::{EngagementError, EventEnvelope, PAGEPULSE_VERSION, PRODUCER_NAME};

/// Pagepulse - In-page reading-engagement instrumentation
#[derive(Parser)]
#[command(name = "pagepulse")]
#[command(version = PAGEPULSE_VERSION)]
#[command(about = "Replay recorded reading sessions into telemetry", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay recorded sessions and print the emitted telemetry
    Replay {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "json")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,
    },

    /// Validate recorded session schema
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "json")]
        input_format: InputFormat,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// A single session document, or a JSON array of sessions
    Json,
    /// Newline-delimited JSON (one session per line)
    Ndjson,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one telemetry envelope per line)
    Ndjson,
    /// JSON array of telemetry envelopes
    Json,
    /// Pretty-printed JSON
    JsonPretty,
    /// Human-readable per-session summary
    Summary,
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

fn run(cli: Cli) -> Result<(), PulseCliError> {
    match cli.command {
        Commands::Replay {
            input,
            output,
            input_format,
            output_format,
        } => cmd_replay(&input, &output, input_format, output_format),

        Commands::Validate {
            input,
            input_format,
            json,
        } => cmd_validate(&input, input_format, json),
    }
}

fn cmd_replay(
    input: &PathBuf,
    output: &PathBuf,
    input_format: InputFormat,
    output_format: OutputFormat,
) -> Result<(), PulseCliError> {
    let sessions = read_sessions(input, &input_format)?;
    if sessions.is_empty() {
        return Err(PulseCliError::NoSessions);
    }

    let mut reports: Vec<ReplayReport> = Vec::with_capacity(sessions.len());
    for session in &sessions {
        reports.push(replay_session(session)?);
    }

    let output_data = format_output(&sessions, &reports, &output_format)?;

    if output.to_string_lossy() == "-" {
        print!("{}", output_data);
    } else {
        fs::write(output, output_data)?;
    }

    Ok(())
}

fn cmd_validate(
    input: &PathBuf,
    input_format: InputFormat,
    json: bool,
) -> Result<(), PulseCliError> {
    let sessions = read_sessions(input, &input_format)?;

    let errors: Vec<ValidationErrorDetail> = sessions
        .iter()
        .enumerate()
        .filter_map(|(index, session)| {
            session.validate().err().map(|e| ValidationErrorDetail {
                index,
                slug: session.article.slug.clone(),
                error: e.to_string(),
            })
        })
        .collect();

    let report = ValidationReport {
        total_sessions: sessions.len(),
        valid_sessions: sessions.len() - errors.len(),
        invalid_sessions: errors.len(),
        errors,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Producer:         {} {}", PRODUCER_NAME, PAGEPULSE_VERSION);
        println!("Total sessions:   {}", report.total_sessions);
        println!("Valid sessions:   {}", report.valid_sessions);
        println!("Invalid sessions: {}", report.invalid_sessions);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!(
                    "  - Session {} (index {}): {}",
                    err.slug.as_deref().unwrap_or("unknown"),
                    err.index,
                    err.error
                );
            }
        }
    }

    if report.invalid_sessions > 0 {
        Err(PulseCliError::ValidationFailed(report.invalid_sessions))
    } else {
        Ok(())
    }
}

fn read_sessions(
    input: &PathBuf,
    input_format: &InputFormat,
) -> Result<Vec<ReadingSession>, PulseCliError> {
    let input_data = if input.to_string_lossy() == "-" {
        if atty::is(atty::Stream::Stdin) {
            eprintln!("Reading session JSON from interactive stdin; pipe a file or press Ctrl-D");
        }
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        fs::read_to_string(input)?
    };

    let sessions = match input_format {
        InputFormat::Ndjson => parse_sessions_ndjson(&input_data)?,
        InputFormat::Json => match parse_sessions_array(&input_data) {
            Ok(sessions) => sessions,
            Err(_) => vec![parse_session(&input_data)?],
        },
    };

    Ok(sessions)
}

fn format_output(
    sessions: &[ReadingSession],
    reports: &[ReplayReport],
    format: &OutputFormat,
) -> Result<String, PulseCliError> {
    let envelopes: Vec<&EventEnvelope> = reports.iter().flat_map(|r| &r.telemetry).collect();

    match format {
        OutputFormat::Ndjson => {
            let mut out = String::new();
            for envelope in envelopes {
                out.push_str(&serde_json::to_string(envelope)?);
                out.push('\n');
            }
            Ok(out)
        }
        OutputFormat::Json => Ok(format!("{}\n", serde_json::to_string(&envelopes)?)),
        OutputFormat::JsonPretty => {
            Ok(format!("{}\n", serde_json::to_string_pretty(&envelopes)?))
        }
        OutputFormat::Summary => {
            let mut out = String::new();
            for (session, report) in sessions.iter().zip(reports) {
                out.push_str(&format!(
                    "{slug}: depth {depth}% {milestones:?}, read {duration}, completed: {completed}, events: {events}\n",
                    slug = session.article.slug.as_deref().unwrap_or("(no slug)"),
                    depth = report.final_depth,
                    milestones = report.reached_milestones,
                    duration = report.formatted_duration,
                    completed = report.completed,
                    events = report.telemetry.len(),
                ));
            }
            Ok(out)
        }
    }
}

// Error types

#[derive(Debug)]
enum PulseCliError {
    Io(io::Error),
    Engagement(EngagementError),
    Json(serde_json::Error),
    NoSessions,
    ValidationFailed(usize),
}

impl From<io::Error> for PulseCliError {
    fn from(e: io::Error) -> Self {
        PulseCliError::Io(e)
    }
}

impl From<EngagementError> for PulseCliError {
    fn from(e: EngagementError) -> Self {
        PulseCliError::Engagement(e)
    }
}

impl From<serde_json::Error> for PulseCliError {
    fn from(e: serde_json::Error) -> Self {
        PulseCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
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
            PulseCliError::Engagement(e) => CliError {
                code: "SESSION_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Ensure input matches the reading.session.v1 schema".to_string()),
            },
            PulseCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            PulseCliError::NoSessions => CliError {
                code: "NO_SESSIONS".to_string(),
                message: "No sessions found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            PulseCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} sessions failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    total_sessions: usize,
    valid_sessions: usize,
    invalid_sessions: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    index: usize,
    slug: Option<String>,
    error: String,
}
