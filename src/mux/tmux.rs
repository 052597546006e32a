use anyhow::{Context, Result};
use std::path::Path;
use tokio::process::Command;
use tracing::debug;

use super::{Multiplexer, SessionInfo};

/// Client for interacting with tmux via CLI
pub struct TmuxClient {
    /// Path to tmux binary
    tmux_path: String,
}

impl TmuxClient {
    pub fn new() -> Self {
        Self {
            tmux_path: "tmux".to_string(),
        }
    }

    fn parse_session_line(line: &str) -> Option<SessionInfo> {
        let parts: Vec<&str> = line.split('|').collect();
        if parts.len() < 3 {
            return None;
        }

        Some(SessionInfo {
            name: parts[0].to_string(),
            created_at: parts[1].parse().unwrap_or(0),
            attached_clients: parts[2].parse().unwrap_or(0),
        })
    }

    /// Get the command to attach to a session (for external execution)
    pub fn attach_command(&self, name: &str) -> Vec<String> {
        vec![
            self.tmux_path.clone(),
            "attach-session".to_string(),
            "-t".to_string(),
            name.to_string(),
        ]
    }
}

impl Multiplexer for TmuxClient {
    async fn list_sessions(&self) -> Result<Vec<SessionInfo>> {
        // Format: session_name|session_created|session_attached
        let output = Command::new(&self.tmux_path)
            .args([
                "list-sessions",
                "-F",
                "#{session_name}|#{session_created}|#{session_attached}",
            ])
            .output()
            .await
            .context("Failed to execute tmux list-sessions")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("no server running") || stderr.contains("no sessions") {
                return Ok(Vec::new());
            }
            anyhow::bail!("tmux list-sessions failed: {}", stderr);
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.lines().filter_map(Self::parse_session_line).collect())
    }

    async fn create_session(&self, name: &str, cwd: &Path) -> Result<()> {
        let output = Command::new(&self.tmux_path)
            .args(["new-session", "-d", "-s", name, "-c"])
            .arg(cwd)
            .output()
            .await
            .context("Failed to create tmux session")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("Failed to create session: {}", stderr);
        }

        debug!(session = name, "created detached session");
        Ok(())
    }

    async fn send_line(&self, name: &str, window: usize, text: &str) -> Result<()> {
        let target = format!("{}:{}", name, window);

        // -l injects the text literally; Enter is sent as a separate key
        // so tmux never interprets the command text itself.
        let output = Command::new(&self.tmux_path)
            .args(["send-keys", "-t", &target, "-l", text])
            .output()
            .await
            .context("Failed to execute tmux send-keys")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("tmux send-keys failed: {}", stderr);
        }

        let output = Command::new(&self.tmux_path)
            .args(["send-keys", "-t", &target, "Enter"])
            .output()
            .await
            .context("Failed to execute tmux send-keys")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("tmux send-keys failed: {}", stderr);
        }

        debug!(session = name, window, "injected command line");
        Ok(())
    }
}

impl Default for TmuxClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_session_line() {
        let info = TmuxClient::parse_session_line("whisper|1714000000|0").unwrap();
        assert_eq!(info.name, "whisper");
        assert_eq!(info.created_at, 1714000000);
        assert!(!info.is_attached());

        let info = TmuxClient::parse_session_line("work|1714000001|2").unwrap();
        assert!(info.is_attached());
    }

    #[test]
    fn test_parse_session_line_rejects_short_lines() {
        assert!(TmuxClient::parse_session_line("only|two").is_none());
        assert!(TmuxClient::parse_session_line("").is_none());
    }

    #[test]
    fn test_attach_command() {
        let client = TmuxClient::new();
        assert_eq!(
            client.attach_command("whisper"),
            vec!["tmux", "attach-session", "-t", "whisper"]
        );
    }
}
