//! Target process selection.
//!
//! Turns `--pid` (or its absence) into the process-selection arguments
//! understood by `ps`. Liveness is not checked here: the sampler's first
//! `ps` call is the liveness check.

use std::collections::BTreeSet;

use crate::domain::{NoTargetProcess, Pid};

/// Launcher command names of JVM processes, matched exactly by `ps -C`.
pub const JAVA_LAUNCHERS: &[&str] = &["java", "jsvc"];

/// Which processes a run samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessSelector {
    /// Explicit pids, deduplicated and ordered
    Pids(BTreeSet<Pid>),
    /// Every process whose command name is one of the launchers
    CommandNames(&'static [&'static str]),
}

impl ProcessSelector {
    /// Build a selector from the `--pid` list. An empty list selects every
    /// java process.
    pub fn from_pids(pids: impl IntoIterator<Item = Pid>) -> Self {
        let pids: BTreeSet<Pid> = pids.into_iter().collect();
        if pids.is_empty() {
            ProcessSelector::CommandNames(JAVA_LAUNCHERS)
        } else {
            ProcessSelector::Pids(pids)
        }
    }

    /// Selection arguments for `ps`.
    #[must_use]
    pub fn resolve(&self) -> SelectorExpression {
        let args = match self {
            ProcessSelector::Pids(pids) => vec!["-p".to_string(), join_pids(pids.iter().copied())],
            ProcessSelector::CommandNames(names) => vec!["-C".to_string(), names.join(",")],
        };
        SelectorExpression { args }
    }

    /// Human-readable target, for log messages.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            ProcessSelector::Pids(pids) => {
                format!("java process(es) {}", join_pids(pids.iter().copied()))
            }
            ProcessSelector::CommandNames(names) => {
                format!("all processes named {}", names.join(" or "))
            }
        }
    }

    /// The error to raise when the selection matched nothing.
    #[must_use]
    pub fn no_target(&self) -> NoTargetProcess {
        match self {
            ProcessSelector::Pids(pids) => NoTargetProcess::Pids(join_pids(pids.iter().copied())),
            ProcessSelector::CommandNames(_) => NoTargetProcess::Pattern,
        }
    }
}

/// Process-selection arguments, ready to splice into a `ps` command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorExpression {
    args: Vec<String>,
}

impl SelectorExpression {
    #[must_use]
    pub fn ps_args(&self) -> &[String] {
        &self.args
    }
}

/// Comma-separated pid list, the form both `ps -p` and `top -p` accept.
#[must_use]
pub fn join_pids(pids: impl IntoIterator<Item = Pid>) -> String {
    pids.into_iter().map(|p| p.to_string()).collect::<Vec<_>>().join(",")
}
