//! Telemetry CLI - Command-line interface for GenUI Telemetry
//!
//! Commands:
//! - replay: Drive a tracker from a recorded NDJSON event log
//! - merge: Apply a profile update instruction to a SQLite profile database
//! - profile: Show or clear a stored profile
//! - insight: Heuristic read of a compact summary

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use genui_telemetry::exchange::{apply_instruction, ProfileUpdateInstruction};
use genui_telemetry::profile::{to_api_format, ProfileMerger, ProfileStore};
use genui_telemetry::tracker::types::{InteractionKind, PageLocation, Signal};
use genui_telemetry::tracker::{BehaviorAggregator, CompactSummary, QuickInsight};
use genui_telemetry::{
    ManualClock, SqliteStorage, TelemetryError, TrackerConfig, PRODUCER_NAME, TELEMETRY_VERSION,
};

/// Telemetry - behavior telemetry and confidence-gated user profiles
#[derive(Parser)]
#[command(name = "telemetry")]
#[command(author = "GenUI Contributors")]
#[command(version = TELEMETRY_VERSION)]
#[command(about = "Replay behavior sessions and manage user profiles", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a recorded event log through a tracker
    Replay {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Tracker configuration (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// User ID for the session
        #[arg(long, default_value = "anonymous")]
        user_id: String,

        /// Fixed session ID (generated when omitted)
        #[arg(long)]
        session_id: Option<String>,

        /// What to print at the end of the log
        #[arg(long, default_value = "summary")]
        output: ReplayOutput,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Apply a profile update instruction
    Merge {
        /// SQLite profile database
        #[arg(long)]
        db: PathBuf,

        /// User whose profile is updated
        #[arg(long)]
        user_id: String,

        /// Instruction file (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Inspect or reset a stored profile
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },

    /// Heuristic insight over a compact summary
    Insight {
        /// Summary file (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Also emit the behavior updates at this confidence
        #[arg(long)]
        updates_confidence: Option<f64>,
    },
}

#[derive(Subcommand)]
enum ProfileAction {
    /// Print a stored profile
    Show {
        #[arg(long)]
        db: PathBuf,

        #[arg(long)]
        user_id: String,

        /// Print the flattened inference-facing format
        #[arg(long)]
        api: bool,
    },

    /// Reset a profile to empty
    Clear {
        #[arg(long)]
        db: PathBuf,

        #[arg(long)]
        user_id: String,
    },
}

#[derive(Clone, ValueEnum)]
enum ReplayOutput {
    /// Compact summary
    Summary,
    /// Full session record
    Record,
}

/// One line of a replay log
#[derive(Debug, Deserialize)]
struct ReplayLine {
    at: DateTime<Utc>,
    #[serde(flatten)]
    op: ReplayOp,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum ReplayOp {
    Start {
        path: String,
        #[serde(default)]
        title: String,
    },
    Signal {
        signal: Signal,
    },
    Navigate {
        path: String,
        #[serde(default)]
        title: String,
    },
    Interaction {
        element_id: String,
        element_type: String,
        kind: InteractionKind,
        #[serde(default)]
        metadata: Option<serde_json::Value>,
    },
    Tick,
    Stop,
    Reset,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

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

fn run(cli: Cli) -> Result<(), TelemetryCliError> {
    match cli.command {
        Commands::Replay {
            input,
            config,
            user_id,
            session_id,
            output,
            pretty,
        } => cmd_replay(
            &input,
            config.as_deref(),
            &user_id,
            session_id,
            output,
            pretty,
        ),

        Commands::Merge { db, user_id, input } => cmd_merge(&db, &user_id, &input),

        Commands::Profile { action } => match action {
            ProfileAction::Show { db, user_id, api } => cmd_profile_show(&db, &user_id, api),
            ProfileAction::Clear { db, user_id } => cmd_profile_clear(&db, &user_id),
        },

        Commands::Insight {
            input,
            updates_confidence,
        } => cmd_insight(&input, updates_confidence),
    }
}

fn cmd_replay(
    input: &Path,
    config: Option<&Path>,
    user_id: &str,
    session_id: Option<String>,
    output: ReplayOutput,
    pretty: bool,
) -> Result<(), TelemetryCliError> {
    let config = match config {
        Some(path) => TrackerConfig::from_json(&fs::read_to_string(path)?)?,
        None => TrackerConfig::default(),
    };

    let lines = parse_replay_log(&read_input(input)?)?;
    let Some(first) = lines.first() else {
        return Err(TelemetryCliError::NoEvents);
    };

    let clock = ManualClock::new(first.at);
    let mut tracker = BehaviorAggregator::with_clock(user_id, config, clock.clone())?;
    if let Some(session_id) = session_id {
        tracker = tracker.with_session_id(session_id);
    }
    info!(session_id = tracker.session_id(), events = lines.len(), "replaying event log");

    for line in lines {
        clock.set(line.at);
        match line.op {
            ReplayOp::Start { path, title } => tracker.start(PageLocation::new(path, title)),
            ReplayOp::Signal { signal } => tracker.record(signal),
            ReplayOp::Navigate { path, title } => tracker.navigate(PageLocation::new(path, title)),
            ReplayOp::Interaction {
                element_id,
                element_type,
                kind,
                metadata,
            } => tracker.track_interaction(element_id, element_type, kind, metadata),
            ReplayOp::Tick => {
                if let Some(sample) = tracker.tick() {
                    debug!(depth = sample.depth, "scroll sample emitted");
                }
            }
            ReplayOp::Stop => tracker.stop(),
            ReplayOp::Reset => tracker.reset(),
        }
    }

    let out = match output {
        ReplayOutput::Summary => to_json(&tracker.compact_summary(), pretty)?,
        ReplayOutput::Record => to_json(&tracker.full_record(), pretty)?,
    };
    println!("{}", out);
    Ok(())
}

fn parse_replay_log(data: &str) -> Result<Vec<ReplayLine>, TelemetryCliError> {
    data.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str(line.trim()).map_err(|e| {
                TelemetryCliError::ParseError(format!("line {}: {}", index + 1, e))
            })
        })
        .collect()
}

fn cmd_merge(db: &Path, user_id: &str, input: &Path) -> Result<(), TelemetryCliError> {
    let instruction: ProfileUpdateInstruction = serde_json::from_str(&read_input(input)?)?;
    let merger = ProfileMerger::new(SqliteStorage::open(db)?);

    match apply_instruction(&merger, user_id, &instruction) {
        Some(report) => println!("{}", serde_json::to_string_pretty(&report)?),
        None => println!(
            "{}",
            serde_json::json!({ "skipped": true, "reason": "should_update is false" })
        ),
    }
    Ok(())
}

fn cmd_profile_show(db: &Path, user_id: &str, api: bool) -> Result<(), TelemetryCliError> {
    let store = ProfileStore::new(SqliteStorage::open(db)?);
    let profile = store.get(user_id);

    if api {
        println!("{}", serde_json::to_string_pretty(&to_api_format(&profile))?);
    } else {
        println!("{}", serde_json::to_string_pretty(&profile)?);
    }
    Ok(())
}

fn cmd_profile_clear(db: &Path, user_id: &str) -> Result<(), TelemetryCliError> {
    let store = ProfileStore::new(SqliteStorage::open(db)?);
    let profile = store.clear(user_id)?;
    println!("{}", serde_json::to_string_pretty(&profile)?);
    Ok(())
}

fn cmd_insight(input: &Path, updates_confidence: Option<f64>) -> Result<(), TelemetryCliError> {
    let summary: CompactSummary = serde_json::from_str(&read_input(input)?)?;
    let insight = QuickInsight::analyze(&summary);

    let report = InsightReport {
        producer: PRODUCER_NAME.to_string(),
        version: TELEMETRY_VERSION.to_string(),
        updates: updates_confidence.map(|confidence| insight.to_updates(confidence, Utc::now())),
        insight,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

// Helper functions

fn read_input(input: &Path) -> Result<String, TelemetryCliError> {
    if input.to_string_lossy() == "-" {
        if atty::is(atty::Stream::Stdin) {
            return Err(TelemetryCliError::InteractiveStdin);
        }
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn to_json<T: Serialize>(value: &T, pretty: bool) -> Result<String, TelemetryCliError> {
    if pretty {
        Ok(serde_json::to_string_pretty(value)?)
    } else {
        Ok(serde_json::to_string(value)?)
    }
}

// Error types

#[derive(Debug)]
enum TelemetryCliError {
    Io(io::Error),
    Telemetry(TelemetryError),
    Json(serde_json::Error),
    NoEvents,
    InteractiveStdin,
    ParseError(String),
}

impl From<io::Error> for TelemetryCliError {
    fn from(e: io::Error) -> Self {
        TelemetryCliError::Io(e)
    }
}

impl From<TelemetryError> for TelemetryCliError {
    fn from(e: TelemetryError) -> Self {
        TelemetryCliError::Telemetry(e)
    }
}

impl From<serde_json::Error> for TelemetryCliError {
    fn from(e: serde_json::Error) -> Self {
        TelemetryCliError::Json(e)
    }
}

#[derive(Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<TelemetryCliError> for CliError {
    fn from(e: TelemetryCliError) -> Self {
        match e {
            TelemetryCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            TelemetryCliError::Telemetry(TelemetryError::InvalidConfig(msg)) => CliError {
                code: "INVALID_CONFIG".to_string(),
                message: msg,
                hint: Some("Capacities, limits and the debounce window must be positive".to_string()),
            },
            TelemetryCliError::Telemetry(TelemetryError::Storage(e)) => CliError {
                code: "STORAGE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check that the database path is writable".to_string()),
            },
            TelemetryCliError::Telemetry(e) => CliError {
                code: "TELEMETRY_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            TelemetryCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            TelemetryCliError::NoEvents => CliError {
                code: "NO_EVENTS".to_string(),
                message: "No events found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            TelemetryCliError::InteractiveStdin => CliError {
                code: "NO_INPUT".to_string(),
                message: "stdin is a terminal".to_string(),
                hint: Some("Pipe input in or pass a file path".to_string()),
            },
            TelemetryCliError::ParseError(msg) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: msg,
                hint: Some("Each line needs \"at\" (RFC 3339) and \"op\"".to_string()),
            },
        }
    }
}

// Report types

#[derive(Serialize)]
struct InsightReport {
    producer: String,
    version: String,
    insight: QuickInsight,
    #[serde(skip_serializing_if = "Option::is_none")]
    updates: Option<Vec<genui_telemetry::ProposedUpdate>>,
}
