//! Command-line surface: arguments, exit codes, command-line echo.

pub mod args;

pub use args::Args;

use std::ffi::OsStr;

use crate::domain::SetupError;

// Exit codes
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_ERROR: i32 = 1;
pub const EXIT_USAGE: i32 = 2;
pub const EXIT_INTERRUPTED: i32 = 130;

/// Raised when the operator interrupts the run.
#[derive(Debug, thiserror::Error)]
#[error("interrupted")]
pub struct Interrupted;

/// Map a run failure to the process exit code.
#[must_use]
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    if err.downcast_ref::<Interrupted>().is_some() {
        EXIT_INTERRUPTED
    } else if let Some(SetupError::InvalidArgument { .. }) = err.downcast_ref::<SetupError>() {
        EXIT_USAGE
    } else {
        EXIT_ERROR
    }
}

/// Render argv so it can be pasted back into a shell, e.g. after `sudo`.
///
/// Bytes that are not UTF-8 are shown as U+FFFD.
#[must_use]
pub fn shell_join<I, S>(argv: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    argv.into_iter()
        .map(|arg| shell_quote(&arg.as_ref().to_string_lossy()))
        .collect::<Vec<_>>()
        .join(" ")
}

fn shell_quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg.chars().all(|c| c.is_ascii_alphanumeric() || "-_./=:,@%+".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}
