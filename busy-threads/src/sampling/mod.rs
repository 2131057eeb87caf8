//! Busy-thread sampling
//!
//! Two interchangeable strategies rank the threads of the selected processes
//! by CPU usage:
//!
//! - [`SamplingStrategy::Lifetime`] (`--use-ps`): one `ps -L` call, ranked
//!   here since `ps --sort` collapses `-L` listings to one row per process.
//!   `pcpu` is CPU time divided by the thread's whole lifetime, so a thread
//!   that spun for one second in a ten-hour-old JVM shows almost nothing.
//! - [`SamplingStrategy::Interval`] (default): `top -H -n 2` refreshed after
//!   a short delay; the second refresh is the CPU used during the delay. `top`
//!   does not report owning pids, so a `ps -L` table is correlated in.
//!
//! Module layout:
//! - `ps`: `ps` row parsers
//! - `top`: second-refresh table parser
//! - `correlate`: pure thread-to-owner join

pub mod correlate;
pub mod ps;
pub mod top;

use std::time::Duration;

use log::{debug, warn};

use crate::artifacts::ArtifactStore;
use crate::domain::{Pid, RankedBatch, SamplingError, ThreadLimit};
use crate::exec::{CommandRunner, Invocation};
use crate::process_lookup::{join_pids, ProcessSelector};

pub use correlate::correlate;
pub use ps::OwnerRow;
pub use top::CpuRow;

/// Default delay between the two `top` refreshes.
pub const DEFAULT_TOP_DELAY: Duration = Duration::from_millis(500);

/// `top -p` accepts at most this many pids.
pub const TOP_MAX_PIDS: usize = 20;

/// How per-thread CPU usage is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplingStrategy {
    /// `ps` lifetime average
    Lifetime,
    /// `top` usage over `delay`
    Interval { delay: Duration },
}

impl Default for SamplingStrategy {
    fn default() -> Self {
        SamplingStrategy::Interval { delay: DEFAULT_TOP_DELAY }
    }
}

/// Everything a strategy needs for one round.
pub struct SamplingContext<'a> {
    pub runner: &'a dyn CommandRunner,
    pub selector: &'a ProcessSelector,
    pub limit: ThreadLimit,
    pub artifacts: &'a ArtifactStore,
    /// 0-based round index, used to name stored captures
    pub round: u64,
}

impl SamplingStrategy {
    /// Produce this round's ranked batch.
    ///
    /// # Errors
    /// - `NoTargetProcess` when the selection matches nothing
    /// - `CommandFailed` / `MalformedCapture` when an inspection tool misbehaves
    pub fn sample(&self, ctx: &SamplingContext<'_>) -> Result<RankedBatch, SamplingError> {
        match *self {
            SamplingStrategy::Lifetime => sample_lifetime(ctx),
            SamplingStrategy::Interval { delay } => sample_interval(ctx, delay),
        }
    }
}

fn sample_lifetime(ctx: &SamplingContext<'_>) -> Result<RankedBatch, SamplingError> {
    let selection = ctx.selector.resolve();
    let invocation = Invocation::new("ps")
        .args(selection.ps_args().iter().cloned())
        .args(["-wwLo", "pid,lwp,pcpu,user", "--no-headers"]);

    let out = capture(ctx, &invocation, "ps")?;
    let rows = ps::parse_thread_rows(&out);
    if rows.is_empty() {
        return Err(ctx.selector.no_target().into());
    }

    Ok(RankedBatch::rank(rows, ctx.limit))
}

fn sample_interval(
    ctx: &SamplingContext<'_>,
    delay: Duration,
) -> Result<RankedBatch, SamplingError> {
    let selection = ctx.selector.resolve();

    // Phase 1: which processes exist right now
    let list = Invocation::new("ps")
        .args(selection.ps_args().iter().cloned())
        .args(["-o", "pid", "--no-headers"]);
    let mut pids: Vec<Pid> = ps::parse_pids(&capture(ctx, &list, "pids")?);
    if pids.is_empty() {
        return Err(ctx.selector.no_target().into());
    }
    if pids.len() > TOP_MAX_PIDS {
        warn!(
            "{} processes selected but top watches at most {}; sampling the first {}",
            pids.len(),
            TOP_MAX_PIDS,
            TOP_MAX_PIDS
        );
        pids.truncate(TOP_MAX_PIDS);
    }

    // Phase 2: two refreshes, keep the second
    let top = Invocation::new("top")
        .args(["-H", "-b", "-d"])
        .arg(delay.as_secs_f64().to_string())
        .args(["-n", "2", "-p"])
        .arg(join_pids(pids.iter().copied()))
        .env("HOME", ctx.artifacts.scratch_dir().to_string_lossy());
    let ranked = top::parse_second_snapshot(&capture(ctx, &top, "top")?)?;
    if ranked.is_empty() {
        return Err(ctx.selector.no_target().into());
    }

    // Phase 3: attach owners
    let owners = Invocation::new("ps")
        .args(selection.ps_args().iter().cloned())
        .args(["-wwLo", "pid,lwp,user", "--no-headers"]);
    let owners = ps::parse_owner_rows(&capture(ctx, &owners, "ps")?);

    let samples = correlate(&ranked, &owners, ctx.limit);
    debug!("{} of {} sampled threads correlated", samples.len(), ranked.len());
    Ok(RankedBatch::rank(samples, ctx.limit))
}

/// Run an inspection tool and return its stdout.
///
/// `ps` exits 1 with no output when nothing matches; that is an empty result,
/// not a failure. A non-zero exit that explains itself on stderr is a failure.
fn capture(
    ctx: &SamplingContext<'_>,
    invocation: &Invocation,
    kind: &str,
) -> Result<String, SamplingError> {
    let command = invocation.command_line();
    let out = ctx.runner.run(invocation).map_err(|e| SamplingError::CommandFailed {
        command: command.clone(),
        detail: e.to_string(),
    })?;

    if !out.success && !out.stderr.trim().is_empty() {
        return Err(SamplingError::CommandFailed { command, detail: out.failure_detail() });
    }

    if let Err(e) = ctx.artifacts.save(ctx.round, kind, &command, &out.stdout) {
        warn!("Failed to keep {kind} output: {e}");
    }
    Ok(out.stdout)
}
