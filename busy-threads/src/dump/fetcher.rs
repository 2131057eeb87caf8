//! Privilege-aware `jstack` execution with a per-round cache
//!
//! `jstack` must run as the user that owns the JVM (the attach socket is
//! only accepted from the same uid), so the owner decides how it runs:
//!
//! | owner            | invoker      | execution                   |
//! |------------------|--------------|-----------------------------|
//! | same as invoker  | any          | `jstack <pid>`              |
//! | other user       | root         | `sudo -u <owner> jstack ..` |
//! | other user       | not root     | not run, permission failure |

use std::collections::HashMap;
use std::path::PathBuf;

use log::{debug, info, warn};

use crate::artifacts::ArtifactStore;
use crate::domain::{DumpError, DumpRecord, FormatVariant, Identity, Pid};
use crate::exec::{CommandRunner, Invocation};

/// The three `jstack` behavior flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DumpOptions {
    /// `-F`: force a dump when the JVM does not respond
    pub force: bool,
    /// `-m`: mixed java and native frames
    pub mixed: bool,
    /// `-l`: extra lock information
    pub lock_info: bool,
}

impl DumpOptions {
    #[must_use]
    pub fn variant(&self) -> FormatVariant {
        FormatVariant::from_flags(self.force, self.mixed)
    }

    fn flags(&self) -> impl Iterator<Item = &'static str> {
        [(self.force, "-F"), (self.mixed, "-m"), (self.lock_info, "-l")]
            .into_iter()
            .filter_map(|(on, flag)| on.then_some(flag))
    }
}

/// The resolved dump tool and its flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpTool {
    pub path: PathBuf,
    pub options: DumpOptions,
}

/// How a dump for a given owner will be taken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionMode {
    Direct,
    AsUser(String),
    Denied,
}

impl ExecutionMode {
    #[must_use]
    pub fn decide(identity: &Identity, owner: &str) -> Self {
        if owner == identity.user {
            ExecutionMode::Direct
        } else if identity.elevated {
            ExecutionMode::AsUser(owner.to_string())
        } else {
            ExecutionMode::Denied
        }
    }
}

/// Takes dumps for one round.
pub struct DumpFetcher<'a> {
    pub runner: &'a dyn CommandRunner,
    pub tool: &'a DumpTool,
    pub identity: &'a Identity,
    pub artifacts: &'a ArtifactStore,
    pub round: u64,
}

impl DumpFetcher<'_> {
    /// Take a dump of `pid`, owned by `owner`. Not cached; see [`RoundDumpCache`].
    ///
    /// # Errors
    /// - `Permission` when the owner differs and the invoker is not root
    /// - `Failed` on spawn failure, non-zero exit or empty output
    pub fn fetch(&self, pid: Pid, owner: &str) -> Result<DumpRecord, DumpError> {
        let jstack = Invocation::new(self.tool.path.to_string_lossy())
            .args(self.tool.options.flags())
            .arg(pid.to_string());

        let invocation = match ExecutionMode::decide(self.identity, owner) {
            ExecutionMode::Direct => jstack,
            ExecutionMode::AsUser(user) => Invocation::new("sudo")
                .args(["-u".to_string(), user, jstack.program])
                .args(jstack.args),
            ExecutionMode::Denied => {
                return Err(DumpError::Permission {
                    pid,
                    owner: owner.to_string(),
                    current: self.identity.user.clone(),
                });
            }
        };

        let command = invocation.command_line();
        info!("dumping java process {pid}: {command}");
        let failed = |detail: String| DumpError::Failed { pid, user: owner.to_string(), detail };

        let out = self.runner.run(&invocation).map_err(|e| failed(e.to_string()))?;
        if !out.success {
            return Err(failed(out.failure_detail()));
        }
        if out.stdout.trim().is_empty() {
            return Err(failed("empty output".to_string()));
        }

        let kind = format!("jstack_{pid}");
        if let Err(e) = self.artifacts.save(self.round, &kind, &command, &out.stdout) {
            warn!("Failed to keep jstack output of {pid}: {e}");
        }

        Ok(DumpRecord { pid, raw_text: out.stdout, variant: self.tool.options.variant() })
    }
}

/// Dumps taken in the current round, keyed by pid.
///
/// Failures are cached too: a process that failed once is not retried in the
/// same round, and every busy thread of it reports the same failure.
#[derive(Debug, Default)]
pub struct RoundDumpCache {
    entries: HashMap<Pid, Result<DumpRecord, DumpError>>,
}

impl RoundDumpCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached dump of `pid`, fetching it on first use.
    ///
    /// # Errors
    /// Returns the (possibly cached) fetch failure.
    pub fn get_or_fetch(
        &mut self,
        fetcher: &DumpFetcher<'_>,
        pid: Pid,
        owner: &str,
    ) -> Result<&DumpRecord, DumpError> {
        let entry = self.entries.entry(pid).or_insert_with(|| fetcher.fetch(pid, owner));
        if entry.is_ok() {
            debug!("dump of {pid} available");
        }
        entry.as_ref().map_err(Clone::clone)
    }

    /// Number of distinct processes fetched (or attempted) this round.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::CommandOutput;
    use std::cell::RefCell;

    /// Answers every command with the same output and records the calls.
    struct FixedRunner {
        output: CommandOutput,
        calls: RefCell<Vec<Invocation>>,
    }

    impl FixedRunner {
        fn new(success: bool, stdout: &str) -> Self {
            Self {
                output: CommandOutput {
                    success,
                    status: Some(i32::from(!success)),
                    stdout: stdout.to_string(),
                    stderr: String::new(),
                },
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl CommandRunner for FixedRunner {
        fn run(&self, invocation: &Invocation) -> std::io::Result<CommandOutput> {
            self.calls.borrow_mut().push(invocation.clone());
            Ok(self.output.clone())
        }
    }

    fn identity(user: &str, elevated: bool) -> Identity {
        Identity { user: user.to_string(), elevated }
    }

    fn tool(options: DumpOptions) -> DumpTool {
        DumpTool { path: PathBuf::from("/opt/jdk/bin/jstack"), options }
    }

    #[test]
    fn test_execution_mode() {
        assert_eq!(ExecutionMode::decide(&identity("svc", false), "svc"), ExecutionMode::Direct);
        assert_eq!(
            ExecutionMode::decide(&identity("root", true), "svc"),
            ExecutionMode::AsUser("svc".to_string())
        );
        assert_eq!(
            ExecutionMode::decide(&identity("alice", false), "svc"),
            ExecutionMode::Denied
        );
    }

    #[test]
    fn test_flags_and_variant() {
        let options = DumpOptions { force: true, mixed: false, lock_info: true };
        assert_eq!(options.flags().collect::<Vec<_>>(), vec!["-F", "-l"]);
        assert_eq!(options.variant(), FormatVariant::Forced);
    }

    #[test]
    fn test_sudo_invocation_for_other_user() {
        let runner = FixedRunner::new(true, "dump");
        let artifacts = ArtifactStore::new(None).unwrap();
        let tool = tool(DumpOptions { mixed: true, ..DumpOptions::default() });
        let root = identity("root", true);
        let fetcher = DumpFetcher {
            runner: &runner,
            tool: &tool,
            identity: &root,
            artifacts: &artifacts,
            round: 0,
        };

        let record = fetcher.fetch(Pid(1234), "svc").unwrap();
        assert_eq!(record.variant, FormatVariant::MixedNative);
        assert_eq!(
            runner.calls.borrow()[0].command_line(),
            "sudo -u svc /opt/jdk/bin/jstack -m 1234"
        );
    }

    #[test]
    fn test_denied_runs_nothing() {
        let runner = FixedRunner::new(true, "dump");
        let artifacts = ArtifactStore::new(None).unwrap();
        let tool = tool(DumpOptions::default());
        let alice = identity("alice", false);
        let fetcher = DumpFetcher {
            runner: &runner,
            tool: &tool,
            identity: &alice,
            artifacts: &artifacts,
            round: 0,
        };

        let err = fetcher.fetch(Pid(1234), "svc").unwrap_err();
        assert!(matches!(err, DumpError::Permission { .. }));
        assert!(runner.calls.borrow().is_empty());
    }

    #[test]
    fn test_failure_is_cached_for_the_round() {
        let runner = FixedRunner::new(false, "");
        let artifacts = ArtifactStore::new(None).unwrap();
        let tool = tool(DumpOptions::default());
        let svc = identity("svc", false);
        let fetcher = DumpFetcher {
            runner: &runner,
            tool: &tool,
            identity: &svc,
            artifacts: &artifacts,
            round: 0,
        };

        let mut cache = RoundDumpCache::new();
        let first = cache.get_or_fetch(&fetcher, Pid(7), "svc").unwrap_err();
        let second = cache.get_or_fetch(&fetcher, Pid(7), "svc").unwrap_err();
        assert_eq!(first, second);
        assert_eq!(runner.calls.borrow().len(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_empty_output_is_a_failure() {
        let runner = FixedRunner::new(true, "  \n");
        let artifacts = ArtifactStore::new(None).unwrap();
        let tool = tool(DumpOptions::default());
        let svc = identity("svc", false);
        let fetcher = DumpFetcher {
            runner: &runner,
            tool: &tool,
            identity: &svc,
            artifacts: &artifacts,
            round: 0,
        };

        let err = fetcher.fetch(Pid(7), "svc").unwrap_err();
        assert!(err.to_string().contains("empty output"));
    }
}
