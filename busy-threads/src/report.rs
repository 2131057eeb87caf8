//! Round headers and report entries
//!
//! Rendering is pure (`render_*` return plain text). [`Reporter`] writes each
//! piece to stdout, colored on a terminal, and the same plain text to the
//! append-log and the store directory.

use std::fs::{File, OpenOptions};
use std::io::{self, IsTerminal, Write};

use chrono::{DateTime, Local};
use crossterm::style::Stylize;
use log::warn;

use crate::artifacts::ArtifactStore;
use crate::config::{Config, RoundLimit};
use crate::domain::{DumpError, ExtractError, SetupError, StackBlock, ThreadSample};

/// Store-directory kind of the per-round report copy.
pub const REPORT_KIND: &str = "busy_threads";

const RULE: &str =
    "================================================================================";

/// What became of one ranked sample.
#[derive(Debug)]
pub enum EntryOutcome<'a> {
    Stack(StackBlock<'a>),
    DumpFailed(DumpError),
    Missing(ExtractError),
}

/// Context for remediation hints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hints {
    /// The invoking command line, re-run under `sudo` on permission failures
    pub command_line: String,
    /// Whether `--force` is worth suggesting (not already in use)
    pub suggest_force: bool,
}

impl Hints {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            command_line: config.command_line.clone(),
            suggest_force: !config.dump.options.force,
        }
    }
}

/// The three header lines opening a round.
#[must_use]
pub fn render_header(
    now: &DateTime<Local>,
    round: u64,
    rounds: RoundLimit,
    command_line: &str,
) -> String {
    let total = match rounds {
        RoundLimit::Bounded(n) => n.to_string(),
        RoundLimit::Unbounded => "?".to_string(),
    };
    let stamp = now.format("%Y-%m-%d %H:%M:%S%.3f");
    format!("{RULE}\n{stamp} [{}/{total}]: {command_line}\n{RULE}\n", round + 1)
}

/// `[rank] Busy(cpu%) thread(tid/0xhex) stack of java process(pid) under user(user):`
#[must_use]
pub fn render_title(rank: usize, sample: &ThreadSample) -> String {
    format!(
        "[{rank}] Busy({:.1}%) thread({}/{}) stack of java process({}) under user({}):",
        sample.cpu_percent,
        sample.tid,
        sample.tid.hex(),
        sample.pid,
        sample.user
    )
}

/// Body lines under the title: the stack block, or the failure and a hint.
#[must_use]
pub fn render_body(outcome: &EntryOutcome<'_>, hints: &Hints) -> String {
    match outcome {
        EntryOutcome::Stack(block) => format!("{block}\n"),
        EntryOutcome::DumpFailed(err @ DumpError::Permission { .. }) => {
            format!("    {err}:\n    sudo {}\n", hints.command_line)
        }
        EntryOutcome::DumpFailed(err @ DumpError::Failed { .. }) => {
            if hints.suggest_force {
                format!("    {err}\n    a hung process may still dump with -F/--force\n")
            } else {
                format!("    {err}\n")
            }
        }
        EntryOutcome::Missing(err) => format!("    {err}\n"),
    }
}

/// Writes rounds to stdout, the append-log and the store directory.
pub struct Reporter<W: Write> {
    out: W,
    color: bool,
    append_log: Option<File>,
    hints: Hints,
}

impl Reporter<io::Stdout> {
    /// Reporter on stdout, colored when stdout is a terminal.
    ///
    /// # Errors
    /// Returns `UnwritablePath` if the append-log cannot be opened.
    pub fn stdout(config: &Config) -> Result<Self, SetupError> {
        let out = io::stdout();
        let color = out.is_terminal();
        Self::new(out, color, config)
    }
}

impl<W: Write> Reporter<W> {
    /// # Errors
    /// Returns `UnwritablePath` if the append-log cannot be opened.
    pub fn new(out: W, color: bool, config: &Config) -> Result<Self, SetupError> {
        let append_log = config
            .append_file
            .as_ref()
            .map(|path| {
                OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .map_err(|source| SetupError::UnwritablePath { path: path.clone(), source })
            })
            .transpose()?;
        Ok(Self { out, color, append_log, hints: Hints::from_config(config) })
    }

    /// Emit the round header.
    ///
    /// # Errors
    /// Returns an error if stdout or the append-log cannot be written.
    pub fn header(
        &mut self,
        artifacts: &ArtifactStore,
        round: u64,
        rounds: RoundLimit,
    ) -> io::Result<()> {
        let text = render_header(&Local::now(), round, rounds, &self.hints.command_line);
        let shown = if self.color { text.as_str().dark_grey().to_string() } else { text.clone() };
        self.emit(artifacts, round, &text, &shown)
    }

    /// Emit one entry. Entries after the first are separated by a blank line.
    ///
    /// # Errors
    /// Returns an error if stdout or the append-log cannot be written.
    pub fn entry(
        &mut self,
        artifacts: &ArtifactStore,
        round: u64,
        rank: usize,
        sample: &ThreadSample,
        outcome: &EntryOutcome<'_>,
    ) -> io::Result<()> {
        let separator = if rank > 1 { "\n" } else { "" };
        let title = render_title(rank, sample);
        let body = render_body(outcome, &self.hints);

        let text = format!("{separator}{title}\n{body}");
        let shown = if self.color {
            let body = match outcome {
                EntryOutcome::Stack(_) => body,
                _ => body.as_str().red().to_string(),
            };
            format!("{separator}{}\n{body}", title.as_str().yellow().bold())
        } else {
            text.clone()
        };
        self.emit(artifacts, round, &text, &shown)
    }

    fn emit(
        &mut self,
        artifacts: &ArtifactStore,
        round: u64,
        text: &str,
        shown: &str,
    ) -> io::Result<()> {
        self.out.write_all(shown.as_bytes())?;
        self.out.flush()?;
        if let Some(log) = self.append_log.as_mut() {
            log.write_all(text.as_bytes())?;
        }
        if let Err(e) = artifacts.append(round, REPORT_KIND, text) {
            warn!("Failed to keep round report: {e}");
        }
        Ok(())
    }

    /// The underlying writer.
    #[must_use]
    pub fn get_ref(&self) -> &W {
        &self.out
    }
}
