//! Run configuration
//!
//! Built once from validated CLI arguments and passed by reference to every
//! component. Nothing downstream reads arguments or the environment.

use std::path::PathBuf;
use std::time::Duration;

use crate::cli::Args;
use crate::domain::{Pid, SetupError, ThreadLimit};
use crate::dump::{DumpOptions, DumpTool};
use crate::process_lookup::ProcessSelector;
use crate::sampling::SamplingStrategy;

/// How many rounds the polling driver runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundLimit {
    Bounded(u64),
    Unbounded,
}

impl RoundLimit {
    /// `count <= 0` means run until interrupted.
    #[must_use]
    pub fn from_count(count: i64) -> Self {
        u64::try_from(count)
            .ok()
            .filter(|&n| n > 0)
            .map_or(RoundLimit::Unbounded, RoundLimit::Bounded)
    }

    /// Whether 0-based `round` should run.
    #[must_use]
    pub fn allows(self, round: u64) -> bool {
        match self {
            RoundLimit::Bounded(n) => round < n,
            RoundLimit::Unbounded => true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub selector: ProcessSelector,
    pub limit: ThreadLimit,
    pub strategy: SamplingStrategy,
    pub dump: DumpTool,
    pub round_delay: Duration,
    pub rounds: RoundLimit,
    pub append_file: Option<PathBuf>,
    pub store_dir: Option<PathBuf>,
    /// The invoking command line, echoed in headers and re-run hints
    pub command_line: String,
}

impl Config {
    /// Validate arguments. `jstack` is the already resolved dump tool.
    ///
    /// # Errors
    /// Returns `InvalidArgument` for non-positive or non-finite delays.
    pub fn from_args(
        args: Args,
        jstack: PathBuf,
        command_line: String,
    ) -> Result<Self, SetupError> {
        let strategy = if args.use_ps {
            SamplingStrategy::Lifetime
        } else {
            SamplingStrategy::Interval { delay: positive_secs("--top-delay", args.top_delay)? }
        };

        // vmstat style: no DELAY runs once, DELAY alone runs forever
        let (round_delay, rounds) = match (args.delay, args.rounds) {
            (None, _) => (Duration::ZERO, RoundLimit::Bounded(1)),
            (Some(delay), count) => (
                positive_secs("DELAY", delay)?,
                count.map_or(RoundLimit::Unbounded, RoundLimit::from_count),
            ),
        };

        Ok(Self {
            selector: ProcessSelector::from_pids(args.pids.into_iter().map(Pid)),
            limit: ThreadLimit::from_count(args.count),
            strategy,
            dump: DumpTool {
                path: jstack,
                options: DumpOptions {
                    force: args.force,
                    mixed: args.mix_native_frames,
                    lock_info: args.lock_info,
                },
            },
            round_delay,
            rounds,
            append_file: args.append_file,
            store_dir: args.store_dir,
            command_line,
        })
    }

    /// Round headers are printed when output spans rounds or is persisted.
    #[must_use]
    pub fn needs_header(&self) -> bool {
        self.rounds != RoundLimit::Bounded(1)
            || self.append_file.is_some()
            || self.store_dir.is_some()
    }
}

fn positive_secs(name: &'static str, secs: f64) -> Result<Duration, SetupError> {
    if secs.is_nan() || secs <= 0.0 {
        let reason = format!("{secs} is not a positive number of seconds");
        return Err(SetupError::InvalidArgument { name, reason });
    }
    Duration::try_from_secs_f64(secs)
        .map_err(|e| SetupError::InvalidArgument { name, reason: e.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn config(argv: &[&str]) -> Result<Config, SetupError> {
        let argv = std::iter::once("busy-threads").chain(argv.iter().copied());
        let args = Args::try_parse_from(argv).expect("arguments parse");
        Config::from_args(args, PathBuf::from("jstack"), "busy-threads".to_string())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.limit, ThreadLimit::Top(5));
        let expected = SamplingStrategy::Interval { delay: Duration::from_millis(500) };
        assert_eq!(config.strategy, expected);
        assert_eq!(config.rounds, RoundLimit::Bounded(1));
        assert!(!config.needs_header());
        assert!(matches!(config.selector, ProcessSelector::CommandNames(_)));
    }

    #[test]
    fn test_delay_alone_is_unbounded() {
        let config = config(&["2"]).unwrap();
        assert_eq!(config.round_delay, Duration::from_secs(2));
        assert_eq!(config.rounds, RoundLimit::Unbounded);
        assert!(config.needs_header());
    }

    #[test]
    fn test_delay_and_count() {
        assert_eq!(config(&["1", "3"]).unwrap().rounds, RoundLimit::Bounded(3));
        assert_eq!(config(&["1", "0"]).unwrap().rounds, RoundLimit::Unbounded);
        assert_eq!(config(&["1", "-1"]).unwrap().rounds, RoundLimit::Unbounded);
    }

    #[test]
    fn test_rejects_bad_delays() {
        assert!(matches!(
            config(&["-d", "0"]),
            Err(SetupError::InvalidArgument { name: "--top-delay", .. })
        ));
        assert!(matches!(config(&["-d", "NaN"]), Err(SetupError::InvalidArgument { .. })));
        assert!(matches!(config(&["0"]), Err(SetupError::InvalidArgument { name: "DELAY", .. })));
    }

    #[test]
    fn test_use_ps_skips_top_delay_validation() {
        let config = config(&["-P", "-d", "0"]).unwrap();
        assert_eq!(config.strategy, SamplingStrategy::Lifetime);
    }

    #[test]
    fn test_persistence_needs_header() {
        let config = config(&["-a", "/tmp/busy.log"]).unwrap();
        assert!(config.needs_header());
    }

    #[test]
    fn test_round_limit_allows() {
        assert!(RoundLimit::Bounded(2).allows(1));
        assert!(!RoundLimit::Bounded(2).allows(2));
        assert!(RoundLimit::Unbounded.allows(u64::MAX));
    }
}
