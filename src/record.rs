use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

/// Store of "a job is believed active" facts, one PID record per session.
///
/// The record is written by the job itself right after it spawns and removed
/// by the job's own cleanup trap on exit. It is a cache in front of the
/// process table, never the source of truth.
pub trait RecordStore {
    /// Read the recorded PID for a session. A missing or unparsable record
    /// reads as `None`.
    async fn read(&self, session: &str) -> Result<Option<u32>>;

    /// Remove the record for a session. Removing a record that does not
    /// exist is not an error.
    async fn delete(&self, session: &str) -> Result<()>;

    /// Path where the job for this session must register its PID.
    fn path(&self, session: &str) -> PathBuf;
}

/// File-backed record store under `~/.jobmux/records/`.
///
/// File names embed both the session name and the project root, so the same
/// session name used against two different roots cannot share a record.
pub struct FileRecordStore {
    dir: PathBuf,
    root_tag: String,
}

impl FileRecordStore {
    pub fn new(project_root: &Path) -> Self {
        let dir = dirs::home_dir()
            .unwrap_or_default()
            .join(".jobmux")
            .join("records");
        Self::with_dir(dir, project_root)
    }

    pub fn with_dir(dir: PathBuf, project_root: &Path) -> Self {
        Self {
            dir,
            root_tag: munge_path(project_root),
        }
    }

    /// Ensure the record directory exists before a job is asked to write
    /// its PID into it.
    pub async fn ensure_dir(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create record directory {}", self.dir.display()))
    }
}

impl RecordStore for FileRecordStore {
    async fn read(&self, session: &str) -> Result<Option<u32>> {
        let path = self.path(session);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read record {}", path.display()))
            }
        };

        match content.trim().parse::<u32>() {
            Ok(pid) => Ok(Some(pid)),
            Err(_) => {
                debug!(path = %path.display(), "record content is not a PID");
                Ok(None)
            }
        }
    }

    async fn delete(&self, session: &str) -> Result<()> {
        let path = self.path(session);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(path = %path.display(), "removed record");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                Err(e).with_context(|| format!("Failed to remove record {}", path.display()))
            }
        }
    }

    fn path(&self, session: &str) -> PathBuf {
        self.dir.join(format!("{}@{}.pid", session, self.root_tag))
    }
}

fn munge_path(path: &Path) -> String {
    path.to_string_lossy().replace('/', "%")
}

/// Wrap a job argv so the job registers its own PID record and removes it
/// on exit, whatever the exit reason.
pub fn compose_job_command(record_path: &Path, argv: &[String]) -> String {
    let record = shell_words::quote(&record_path.to_string_lossy()).into_owned();
    let job = shell_words::join(argv);
    let script = format!(
        "echo $$ > {record}; trap \"rm -f {record}\" EXIT HUP INT TERM; {job}"
    );
    format!("sh -c {}", shell_words::quote(&script))
}
