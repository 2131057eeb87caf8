//! Core types of a sampling round
//!
//! `Pid` and `Tid` are distinct newtypes: the tools involved print both as
//! bare numbers, often on the same line.

use std::fmt;

/// Process ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pid(pub u32);

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Thread ID
///
/// The kernel-assigned id of a lightweight process (`lwp` in `ps`, `PID` in
/// `top -H`). The JVM prints the same value in hexadecimal as `nid=0x...`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tid(pub u32);

impl Tid {
    /// Lowercase hexadecimal with a leading `0x`, as `jstack` prints `nid`.
    #[must_use]
    pub fn hex(self) -> String {
        format!("{:#x}", self.0)
    }
}

impl fmt::Display for Tid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One busy thread observed by a sampler.
///
/// `cpu_percent` is a lifetime average for the `ps` strategy and a rate over
/// the sampling interval for the `top` strategy. Values from different
/// strategies are not comparable.
#[derive(Debug, Clone, PartialEq)]
pub struct ThreadSample {
    pub pid: Pid,
    pub tid: Tid,
    pub cpu_percent: f64,
    pub user: String,
}

/// How many threads a round reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadLimit {
    All,
    Top(usize),
}

impl ThreadLimit {
    /// `0` means every thread, like `--count 0`.
    #[must_use]
    pub fn from_count(count: usize) -> Self {
        if count == 0 {
            ThreadLimit::All
        } else {
            ThreadLimit::Top(count)
        }
    }

    /// Returns true once `len` samples satisfy the limit.
    #[must_use]
    pub fn is_filled(self, len: usize) -> bool {
        match self {
            ThreadLimit::All => false,
            ThreadLimit::Top(n) => len >= n,
        }
    }
}

/// The busiest threads of one round, in report order.
#[derive(Debug, Clone, Default)]
pub struct RankedBatch {
    samples: Vec<ThreadSample>,
}

impl RankedBatch {
    /// Stable sort descending by CPU and truncate to `limit`.
    ///
    /// Ties keep discovery order.
    #[must_use]
    pub fn rank(mut samples: Vec<ThreadSample>, limit: ThreadLimit) -> Self {
        samples.sort_by(|a, b| b.cpu_percent.total_cmp(&a.cpu_percent));
        if let ThreadLimit::Top(n) = limit {
            samples.truncate(n);
        }
        Self { samples }
    }

    #[must_use]
    pub fn samples(&self) -> &[ThreadSample] {
        &self.samples
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl IntoIterator for RankedBatch {
    type Item = ThreadSample;
    type IntoIter = std::vec::IntoIter<ThreadSample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.into_iter()
    }
}

/// Textual layout of a `jstack` dump, decided by the flags it ran with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatVariant {
    /// Default output, threads tagged with `nid=0x...`
    Plain,
    /// `jstack -F`, threads introduced by `Thread <tid>:`
    Forced,
    /// `jstack -m`, threads fenced by `----------------- <tid> -----------------`
    MixedNative,
}

impl FormatVariant {
    /// Mixed mode wins over forced mode; lock info never changes the layout.
    #[must_use]
    pub fn from_flags(force: bool, mixed: bool) -> Self {
        if mixed {
            FormatVariant::MixedNative
        } else if force {
            FormatVariant::Forced
        } else {
            FormatVariant::Plain
        }
    }
}

/// A full stack dump of one process.
#[derive(Debug, Clone)]
pub struct DumpRecord {
    pub pid: Pid,
    pub raw_text: String,
    pub variant: FormatVariant,
}

/// One thread's stack, borrowed from a [`DumpRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackBlock<'a> {
    pub tid: Tid,
    text: &'a str,
}

impl<'a> StackBlock<'a> {
    #[must_use]
    pub fn new(tid: Tid, text: &'a str) -> Self {
        Self { tid, text }
    }

    #[must_use]
    pub fn as_str(&self) -> &'a str {
        self.text
    }
}

impl fmt::Display for StackBlock<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text)
    }
}

/// The user running this tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user: String,
    /// Effective uid 0, allowed to `sudo -u` into other users
    pub elevated: bool,
}
