use std::path::{Path, PathBuf};

use anyhow::Context;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::ManagerError;
use crate::mux::Multiplexer;
use crate::procs::ProcessTable;
use crate::record::RecordStore;

/// How a job launch happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StartMode {
    /// No session existed; one was created and the job launched in window 0
    NewSession,
    /// A detached session existed; the job was injected into its window 0
    ReusedWindow,
}

/// Terminal outcome of one `ensure_job_running` invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// The job was launched
    Started { mode: StartMode },
    /// A job is already active for this session; nothing was done
    AlreadyRunning,
    /// The session is attached to a human terminal; injecting into it would
    /// interleave with live interaction. The caller must detach first.
    RejectedAttached,
}

/// One job launch request
#[derive(Debug, Clone)]
pub struct JobRequest {
    /// Name of the persistent session
    pub session: String,
    /// Working directory for the job and filter for the fallback scan
    pub project_root: PathBuf,
    /// Fully-formed command line to inject, including its own PID-record
    /// registration and cleanup (see [`crate::record::compose_job_command`])
    pub command: String,
    /// Substring matched against process command lines when the PID record
    /// is missing or stale
    pub signature: String,
}

/// The single window every session exposes; a second one is never created,
/// so a reattaching human always lands on the job.
const WINDOW: usize = 0;

static RE_SESSION_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9._-]+$").unwrap());

/// Decides whether to create a session, reuse one, or leave a running job
/// alone, and executes the decision through its collaborators.
pub struct JobSessionManager<M, P, R> {
    mux: M,
    procs: P,
    records: R,
}

impl<M, P, R> JobSessionManager<M, P, R>
where
    M: Multiplexer,
    P: ProcessTable,
    R: RecordStore,
{
    pub fn new(mux: M, procs: P, records: R) -> Self {
        Self { mux, procs, records }
    }

    /// Ensure the requested job is running in the named session.
    ///
    /// First match wins: no session → create and launch; job active →
    /// no-op; session attached → refuse; otherwise inject into window 0.
    ///
    /// Two racing invocations are excluded only by this detection order
    /// (the second observes the first's record or live process); there is
    /// no lock, so it is best-effort.
    pub async fn ensure_job_running(&self, req: &JobRequest) -> Result<Outcome, ManagerError> {
        if req.session.is_empty() {
            return Err(ManagerError::EmptySessionName);
        }
        if !RE_SESSION_NAME.is_match(&req.session) {
            return Err(ManagerError::InvalidSessionName(req.session.clone()));
        }
        if !req.project_root.exists() {
            return Err(ManagerError::ProjectRootNotFound(req.project_root.clone()));
        }
        if !req.project_root.is_dir() {
            return Err(ManagerError::ProjectRootNotADirectory(req.project_root.clone()));
        }
        let root = req
            .project_root
            .canonicalize()
            .context("Failed to canonicalize project root")?;

        let sessions = self.mux.list_sessions().await?;
        let existing = sessions.iter().find(|s| s.name == req.session);

        let Some(session) = existing else {
            info!(session = %req.session, "no session found; creating one and launching job");
            self.mux.create_session(&req.session, &root).await?;
            self.mux.send_line(&req.session, WINDOW, &req.command).await?;
            return Ok(Outcome::Started {
                mode: StartMode::NewSession,
            });
        };

        if self.job_active(req, &root).await? {
            info!(session = %req.session, "job already active; nothing to do");
            return Ok(Outcome::AlreadyRunning);
        }

        if session.is_attached() {
            info!(
                session = %req.session,
                clients = session.attached_clients,
                "session is attached; refusing to inject"
            );
            return Ok(Outcome::RejectedAttached);
        }

        info!(session = %req.session, "reusing detached session; injecting job");
        self.mux.send_line(&req.session, WINDOW, &req.command).await?;
        Ok(Outcome::Started {
            mode: StartMode::ReusedWindow,
        })
    }

    /// Record first, process table second.
    ///
    /// A record pointing at a live PID is conclusive on its own. A missing,
    /// unreadable, or stale record is dropped silently (expected after a
    /// crash) and the process table gets the final word.
    async fn job_active(&self, req: &JobRequest, root: &Path) -> Result<bool, ManagerError> {
        if let Some(pid) = self.records.read(&req.session).await? {
            if self.procs.pid_exists(pid) {
                debug!(pid, "record points at a live process");
                return Ok(true);
            }
            debug!(pid, "record is stale");
        }

        self.records.delete(&req.session).await?;

        let matches = self.procs.find_matching(&req.signature, root)?;
        if !matches.is_empty() {
            debug!(pids = ?matches, "fallback scan found live job processes");
        }
        Ok(!matches.is_empty())
    }
}
