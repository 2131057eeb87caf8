//! Error types for busy-threads
//!
//! Setup and sampling errors abort the run; dump and extraction errors are
//! scoped to one process or one thread and are reported inline.

use super::types::{Pid, Tid};
use std::path::PathBuf;
use thiserror::Error;

/// Unrecoverable problems found before the first round.
#[derive(Error, Debug)]
pub enum SetupError {
    #[error("Unsupported OS: {0}. busy-threads only supports Linux")]
    UnsupportedOs(String),

    #[error(
        "jstack not found on PATH or in $JAVA_HOME/bin.\n\n\
         Install a JDK, set JAVA_HOME, or pass --jstack-path <path>"
    )]
    DumpToolNotFound,

    #[error("jstack path {} is not an executable file", .0.display())]
    DumpToolNotExecutable(PathBuf),

    #[error("Invalid value for {name}: {reason}")]
    InvalidArgument { name: &'static str, reason: String },

    #[error("Cannot write to {}: {source}", .path.display())]
    UnwritablePath {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot determine current user: {0}")]
    UnknownIdentity(String),
}

/// Nothing to sample. The message depends on how targets were selected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NoTargetProcess {
    #[error("process(es) {0} not running, or not a java process")]
    Pids(String),

    #[error("no matching process found: no java process is running")]
    Pattern,
}

/// Failures of the sampling phase. All of them abort the run.
#[derive(Error, Debug)]
pub enum SamplingError {
    #[error(transparent)]
    NoTargetProcess(#[from] NoTargetProcess),

    #[error("Failed to run `{command}`: {detail}")]
    CommandFailed { command: String, detail: String },

    #[error("Malformed {tool} output: {detail}")]
    MalformedCapture { tool: &'static str, detail: String },
}

/// Failure to obtain a dump for one process in one round.
///
/// `Clone` so the round cache can hand the same failure to every sample of
/// the process.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DumpError {
    #[error("User of java process({owner}) is not current user({current}), need sudo to rerun")]
    Permission { pid: Pid, owner: String, current: String },

    #[error("jstack of java process({pid}) under user({user}) failed: {detail}")]
    Failed { pid: Pid, user: String, detail: String },
}

/// The thread was not present in its process dump.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractError {
    #[error("thread {0} not found in dump, it may have exited after sampling")]
    NotFound(Tid),
}
