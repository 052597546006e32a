use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

mod error;
mod manager;
mod mux;
mod procs;
mod record;

use manager::{JobRequest, JobSessionManager, Outcome, StartMode};
use mux::TmuxClient;
use procs::ProcTable;
use record::{compose_job_command, FileRecordStore, RecordStore};

/// Ensure a long-running job is active inside a named tmux session.
///
/// Exit codes: 0 when the job was started or is already running, 2 on a
/// configuration or external-tool error, 3 when the session is attached to
/// a terminal (detach and rerun).
#[derive(Parser, Debug)]
#[command(name = "jobmux", version, about)]
struct Cli {
    /// Name of the persistent tmux session
    #[arg(short, long)]
    session: String,

    /// Project root: working directory for the job and filter for the
    /// fallback process scan
    #[arg(short, long)]
    root: PathBuf,

    /// Substring matched against process command lines when the PID record
    /// is missing or stale [default: first word of COMMAND]
    #[arg(long)]
    signature: Option<String>,

    /// Print the outcome as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Job command and its arguments
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
    command: Vec<String>,
}

const EXIT_CONFIG_ERROR: u8 = 2;
const EXIT_ATTACHED: u8 = 3;

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("jobmux: {:#}", e);
            ExitCode::from(EXIT_CONFIG_ERROR)
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let root = cli
        .root
        .canonicalize()
        .with_context(|| format!("project root {} is not accessible", cli.root.display()))?;

    let records = FileRecordStore::new(&root);
    records.ensure_dir().await?;

    let signature = cli
        .signature
        .clone()
        .unwrap_or_else(|| cli.command[0].clone());
    let command = compose_job_command(&records.path(&cli.session), &cli.command);

    let tmux = TmuxClient::new();
    let attach_hint = tmux.attach_command(&cli.session).join(" ");

    let manager = JobSessionManager::new(tmux, ProcTable, records);
    let request = JobRequest {
        session: cli.session.clone(),
        project_root: root,
        command,
        signature,
    };

    let outcome = manager.ensure_job_running(&request).await?;

    if cli.json {
        println!("{}", serde_json::to_string(&outcome)?);
    } else {
        match outcome {
            Outcome::Started {
                mode: StartMode::NewSession,
            } => println!(
                "started job in new session '{}' (watch it with: {})",
                cli.session, attach_hint
            ),
            Outcome::Started {
                mode: StartMode::ReusedWindow,
            } => println!(
                "started job in existing session '{}', window 0 (watch it with: {})",
                cli.session, attach_hint
            ),
            Outcome::AlreadyRunning => println!(
                "a job is already running in session '{}' (watch it with: {})",
                cli.session, attach_hint
            ),
            Outcome::RejectedAttached => println!(
                "session '{}' is attached to a terminal; detach it first (prefix key, then d) and rerun",
                cli.session
            ),
        }
    }

    let code = match outcome {
        Outcome::Started { .. } | Outcome::AlreadyRunning => 0,
        Outcome::RejectedAttached => EXIT_ATTACHED,
    };
    Ok(ExitCode::from(code))
}
