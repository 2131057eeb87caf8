//! External command execution
//!
//! Every inspection tool (`ps`, `top`) and the dump tool (`jstack`) runs
//! through [`CommandRunner`]. Parsers only ever see the captured text, so the
//! whole pipeline can be driven by scripted output in tests.

use log::debug;
use std::process::{Command, Stdio};

/// A fully specified command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into(), args: Vec::new(), env: Vec::new() }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Shell-like rendering for logs and stored captures.
    #[must_use]
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Captured result of a finished command.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub success: bool,
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Short human-readable failure description: exit status plus stderr,
    /// or stdout when stderr is empty (`jstack` reports attach errors there).
    #[must_use]
    pub fn failure_detail(&self) -> String {
        let status = self
            .status
            .map_or_else(|| "killed by signal".to_string(), |code| format!("exit status {code}"));
        let message = match self.stderr.trim() {
            "" => self.stdout.trim(),
            stderr => stderr,
        };
        if message.is_empty() {
            status
        } else {
            format!("{status}: {message}")
        }
    }
}

/// Runs commands to completion and captures their output.
pub trait CommandRunner {
    /// # Errors
    /// Returns an error if the program cannot be spawned.
    fn run(&self, invocation: &Invocation) -> std::io::Result<CommandOutput>;
}

/// Runs commands on the host.
///
/// `LC_ALL=C` keeps numeric columns in `1.5` form regardless of the
/// operator's locale. stdin is closed so no tool can wait on the terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> std::io::Result<CommandOutput> {
        debug!("run: {}", invocation.command_line());

        let output = Command::new(&invocation.program)
            .args(&invocation.args)
            .env("LC_ALL", "C")
            .envs(invocation.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .output()?;

        Ok(CommandOutput {
            success: output.status.success(),
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line() {
        let inv = Invocation::new("top").args(["-H", "-b"]).arg("-n").arg("2").env("HOME", "/tmp");
        assert_eq!(inv.command_line(), "top -H -b -n 2");
        assert_eq!(inv.env, vec![("HOME".to_string(), "/tmp".to_string())]);
    }

    #[test]
    fn test_failure_detail() {
        let out = CommandOutput {
            success: false,
            status: Some(1),
            stdout: String::new(),
            stderr: "12345: Unable to open socket file\n".to_string(),
        };
        assert_eq!(out.failure_detail(), "exit status 1: 12345: Unable to open socket file");
        assert_eq!(CommandOutput::default().failure_detail(), "killed by signal");

        let out = CommandOutput {
            status: Some(1),
            stdout: "1234: Unable to open socket file\n".to_string(),
            ..CommandOutput::default()
        };
        assert_eq!(out.failure_detail(), "exit status 1: 1234: Unable to open socket file");
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_system_runner_captures_stdout() {
        let out = SystemRunner.run(&Invocation::new("echo").arg("hello")).unwrap();
        assert!(out.success);
        assert_eq!(out.stdout.trim(), "hello");
    }

    #[test]
    fn test_system_runner_missing_program() {
        let result = SystemRunner.run(&Invocation::new("/nonexistent/busy-threads-tool"));
        assert!(result.is_err());
    }
}
