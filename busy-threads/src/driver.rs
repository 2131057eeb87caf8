//! Round loop
//!
//! ```text
//! Idle -> Sampling -> Reporting -> Sleeping -> Sampling -> ... -> Terminal
//! ```
//!
//! Each round samples once, then fetches (at most one dump per process),
//! extracts and reports every ranked sample in rank order. A sampling error
//! ends the run; dump and extraction failures are reported inline.

use std::io::Write;

use anyhow::{Context, Result};
use log::{debug, info};

use crate::artifacts::ArtifactStore;
use crate::config::Config;
use crate::domain::Identity;
use crate::dump::{extract, DumpFetcher, RoundDumpCache};
use crate::exec::CommandRunner;
use crate::report::{EntryOutcome, Reporter};
use crate::sampling::SamplingContext;

/// Where the driver is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Idle,
    Sampling { round: u64 },
    Reporting { round: u64 },
    Sleeping { round: u64 },
    Terminal,
}

/// Counts for one finished round.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RoundSummary {
    /// Entries reported, stacks and failures alike
    pub entries: usize,
    /// Entries that printed a stack
    pub stacks: usize,
    /// Distinct processes a dump was attempted for
    pub dumps: usize,
}

/// Totals for a finished run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Rounds completed
    pub rounds: u64,
    /// Counts of the last completed round
    pub last: Option<RoundSummary>,
}

pub struct PollingDriver<'a, W: Write> {
    config: &'a Config,
    identity: &'a Identity,
    runner: &'a dyn CommandRunner,
    artifacts: &'a ArtifactStore,
    reporter: &'a mut Reporter<W>,
    state: DriverState,
}

impl<'a, W: Write> PollingDriver<'a, W> {
    pub fn new(
        config: &'a Config,
        identity: &'a Identity,
        runner: &'a dyn CommandRunner,
        artifacts: &'a ArtifactStore,
        reporter: &'a mut Reporter<W>,
    ) -> Self {
        Self { config, identity, runner, artifacts, reporter, state: DriverState::Idle }
    }

    #[must_use]
    pub fn state(&self) -> DriverState {
        self.state
    }

    /// Run every configured round, sleeping between rounds only.
    ///
    /// # Errors
    /// Returns the first sampling error, or a report write failure.
    pub fn run(&mut self) -> Result<RunSummary> {
        let mut run = RunSummary::default();
        let mut round = 0;

        while self.config.rounds.allows(round) {
            if round > 0 {
                self.transition(DriverState::Sleeping { round });
                std::thread::sleep(self.config.round_delay);
            }
            match self.run_round(round) {
                Ok(summary) => {
                    run.rounds += 1;
                    run.last = Some(summary);
                }
                Err(e) => {
                    self.transition(DriverState::Terminal);
                    return Err(e);
                }
            }
            round += 1;
        }

        self.transition(DriverState::Terminal);
        Ok(run)
    }

    /// Sample and report one round.
    ///
    /// # Errors
    /// Returns the sampling error, or a report write failure.
    pub fn run_round(&mut self, round: u64) -> Result<RoundSummary> {
        if self.config.needs_header() {
            self.reporter
                .header(self.artifacts, round, self.config.rounds)
                .context("Failed to write round header")?;
        }

        self.transition(DriverState::Sampling { round });
        debug!("round {}: sampling {}", round + 1, self.config.selector.describe());
        let ctx = SamplingContext {
            runner: self.runner,
            selector: &self.config.selector,
            limit: self.config.limit,
            artifacts: self.artifacts,
            round,
        };
        let batch = self.config.strategy.sample(&ctx)?;
        info!("round {}: {} busy thread(s) selected", round + 1, batch.len());

        self.transition(DriverState::Reporting { round });
        let fetcher = DumpFetcher {
            runner: self.runner,
            tool: &self.config.dump,
            identity: self.identity,
            artifacts: self.artifacts,
            round,
        };
        let mut dumps = RoundDumpCache::new();
        let mut summary = RoundSummary::default();

        for (index, sample) in batch.into_iter().enumerate() {
            let outcome = match dumps.get_or_fetch(&fetcher, sample.pid, &sample.user) {
                Ok(dump) => match extract(dump, sample.tid) {
                    Ok(block) => EntryOutcome::Stack(block),
                    Err(e) => EntryOutcome::Missing(e),
                },
                Err(e) => EntryOutcome::DumpFailed(e),
            };
            if matches!(outcome, EntryOutcome::Stack(_)) {
                summary.stacks += 1;
            }
            self.reporter
                .entry(self.artifacts, round, index + 1, &sample, &outcome)
                .context("Failed to write report entry")?;
            summary.entries += 1;
        }

        summary.dumps = dumps.len();
        Ok(summary)
    }

    fn transition(&mut self, next: DriverState) {
        debug!("driver: {:?} -> {next:?}", self.state);
        self.state = next;
    }
}
