//! Shared helpers for integration tests: a scripted `CommandRunner` and
//! fixture loading.

#![allow(dead_code)]

use std::cell::RefCell;
use std::path::PathBuf;

use busy_threads::cli::Args;
use busy_threads::config::Config;
use busy_threads::domain::Identity;
use busy_threads::exec::{CommandOutput, CommandRunner, Invocation};
use clap::Parser;

pub const JSTACK: &str = "/opt/jdk/bin/jstack";

pub fn fixture(name: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name);
    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read fixture {}: {e}", path.display()))
}

/// Answers commands by command-line prefix and records every call.
///
/// Rules are tried in insertion order. An unmatched command fails to spawn.
#[derive(Default)]
pub struct ScriptedRunner {
    rules: Vec<(String, CommandOutput)>,
    calls: RefCell<Vec<String>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ok(mut self, prefix: &str, stdout: &str) -> Self {
        let output = CommandOutput {
            success: true,
            status: Some(0),
            stdout: stdout.to_string(),
            stderr: String::new(),
        };
        self.rules.push((prefix.to_string(), output));
        self
    }

    pub fn fail(mut self, prefix: &str, status: i32, stdout: &str, stderr: &str) -> Self {
        let output = CommandOutput {
            success: false,
            status: Some(status),
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
        };
        self.rules.push((prefix.to_string(), output));
        self
    }

    /// Every command line run so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn calls_starting_with(&self, prefix: &str) -> usize {
        self.calls.borrow().iter().filter(|c| c.starts_with(prefix)).count()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, invocation: &Invocation) -> std::io::Result<CommandOutput> {
        let line = invocation.command_line();
        self.calls.borrow_mut().push(line.clone());
        self.rules
            .iter()
            .find(|(prefix, _)| line.starts_with(prefix.as_str()))
            .map(|(_, output)| output.clone())
            .ok_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::NotFound, format!("unscripted: {line}"))
            })
    }
}

/// Config as the binary would build it from `argv` (without the program name).
pub fn config(argv: &[&str]) -> Config {
    let argv: Vec<&str> = std::iter::once("busy-threads").chain(argv.iter().copied()).collect();
    let args = Args::try_parse_from(argv.iter().copied()).expect("arguments parse");
    let command_line = busy_threads::cli::shell_join(argv.iter().copied());
    Config::from_args(args, PathBuf::from(JSTACK), command_line).expect("valid config")
}

pub fn identity(user: &str, elevated: bool) -> Identity {
    Identity { user: user.to_string(), elevated }
}
