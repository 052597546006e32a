use std::path::Path;

use anyhow::{Context, Result};
use tracing::trace;

/// Process table collaborator.
///
/// The process table is the source of truth for job liveness; the on-disk
/// PID record is only a cache in front of it.
pub trait ProcessTable {
    /// Whether a process with this PID currently exists.
    fn pid_exists(&self, pid: u32) -> bool;

    /// PIDs whose command line contains `signature` and whose current
    /// working directory equals `cwd`.
    fn find_matching(&self, signature: &str, cwd: &Path) -> Result<Vec<u32>>;
}

/// Real process table backed by /proc.
pub struct ProcTable;

impl ProcessTable for ProcTable {
    fn pid_exists(&self, pid: u32) -> bool {
        procfs::process::Process::new(pid as i32).is_ok()
    }

    fn find_matching(&self, signature: &str, cwd: &Path) -> Result<Vec<u32>> {
        let own_pid = std::process::id();
        let mut matches = Vec::new();

        let processes =
            procfs::process::all_processes().context("Failed to enumerate /proc")?;

        for process in processes {
            // Processes can exit mid-scan; skip anything that stops answering.
            let Ok(process) = process else { continue };
            let pid = process.pid as u32;

            // Our own argv carries the job command; never match ourselves.
            if pid == own_pid {
                continue;
            }

            let Ok(cmdline) = process.cmdline() else { continue };
            if !cmdline.join(" ").contains(signature) {
                continue;
            }

            let Ok(process_cwd) = process.cwd() else { continue };
            if process_cwd == cwd {
                trace!(pid, "process matches signature and working directory");
                matches.push(pid);
            }
        }

        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_own_pid_exists() {
        assert!(ProcTable.pid_exists(std::process::id()));
    }

    #[test]
    fn test_absurd_pid_does_not_exist() {
        assert!(!ProcTable.pid_exists(999_999_999));
    }

    #[test]
    fn test_find_matching_unknown_signature_is_empty() {
        let matches = ProcTable
            .find_matching("jobmux-no-such-command-signature", Path::new("/"))
            .unwrap();
        assert!(matches.is_empty());
    }

    #[test]
    fn test_find_matching_excludes_self() {
        // The test binary's own argv trivially contains its program name,
        // but the scan must never report the calling process.
        let exe = std::env::current_exe().unwrap();
        let cwd = std::env::current_dir().unwrap();
        let matches = ProcTable
            .find_matching(&exe.to_string_lossy(), &cwd)
            .unwrap();
        assert!(!matches.contains(&std::process::id()));
    }
}
