use std::path::PathBuf;

use thiserror::Error;

/// Failures that stop the manager before or during an action.
///
/// An attached session and an already-running job are not errors; they are
/// normal terminal outcomes (see [`crate::manager::Outcome`]).
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("session name is empty")]
    EmptySessionName,

    #[error("session name '{0}' contains characters that break exact-match lookup")]
    InvalidSessionName(String),

    #[error("project root {0} does not exist")]
    ProjectRootNotFound(PathBuf),

    #[error("project root {0} is not a directory")]
    ProjectRootNotADirectory(PathBuf),

    /// A collaborator call failed (multiplexer, process table, or record
    /// store). Never retried: retrying a failed injection could duplicate
    /// side effects.
    #[error(transparent)]
    External(#[from] anyhow::Error),
}
