mod tmux;

pub use tmux::TmuxClient;

use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// A session as reported by the multiplexer listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    /// Session name
    pub name: String,
    /// Unix timestamp when session was created
    pub created_at: u64,
    /// Number of attached clients
    pub attached_clients: usize,
}

impl SessionInfo {
    pub fn new(name: String) -> Self {
        Self {
            name,
            created_at: 0,
            attached_clients: 0,
        }
    }

    /// Whether a human terminal is currently connected
    pub fn is_attached(&self) -> bool {
        self.attached_clients > 0
    }
}

/// Session multiplexer collaborator.
///
/// The manager only ever targets window 0 of a session; a second window is
/// never created, so one job per session is a structural guarantee.
pub trait Multiplexer {
    /// List all sessions. A multiplexer server that is not running counts
    /// as "no sessions", not as an error.
    async fn list_sessions(&self) -> Result<Vec<SessionInfo>>;

    /// Create a detached session whose window 0 runs an interactive shell
    /// started in `cwd`. The shell outlives any command injected into it,
    /// so a human can reattach after the job exits.
    async fn create_session(&self, name: &str, cwd: &Path) -> Result<()>;

    /// Inject `text` plus a line terminator into window `window` of an
    /// existing session, as if typed.
    async fn send_line(&self, name: &str, window: usize, text: &str) -> Result<()>;
}
