//! Parsers for `ps` output
//!
//! All `ps` calls use `--no-headers` and `-ww` (unlimited width, so long user
//! names are not truncated to `usernam+`). Rows that do not parse are skipped.

use log::debug;

use crate::domain::{Pid, ThreadSample, Tid};

/// A row of `ps -Lo pid,lwp,user`: which process and user own a thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerRow {
    pub pid: Pid,
    pub tid: Tid,
    pub user: String,
}

/// Parse `ps -o pid` output.
pub fn parse_pids(text: &str) -> Vec<Pid> {
    text.split_whitespace()
        .filter_map(|field| match field.parse::<u32>() {
            Ok(pid) => Some(Pid(pid)),
            Err(_) => {
                debug!("skipping ps pid field {field:?}");
                None
            }
        })
        .collect()
}

/// Parse `ps -Lo pid,lwp,pcpu,user` rows, preserving their order.
pub fn parse_thread_rows(text: &str) -> Vec<ThreadSample> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| {
            let row = parse_thread_row(line);
            if row.is_none() {
                debug!("skipping ps row {line:?}");
            }
            row
        })
        .collect()
}

fn parse_thread_row(line: &str) -> Option<ThreadSample> {
    let mut fields = line.split_whitespace();
    let pid = fields.next()?.parse::<u32>().ok()?;
    let tid = fields.next()?.parse::<u32>().ok()?;
    let cpu_percent = parse_percent(fields.next()?)?;
    let user = fields.next()?.to_string();
    Some(ThreadSample { pid: Pid(pid), tid: Tid(tid), cpu_percent, user })
}

/// Parse `ps -Lo pid,lwp,user` rows.
pub fn parse_owner_rows(text: &str) -> Vec<OwnerRow> {
    text.lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let pid = fields.next()?.parse::<u32>().ok()?;
            let tid = fields.next()?.parse::<u32>().ok()?;
            let user = fields.next()?.to_string();
            Some(OwnerRow { pid: Pid(pid), tid: Tid(tid), user })
        })
        .collect()
}

/// A CPU percentage: finite and non-negative.
pub(crate) fn parse_percent(field: &str) -> Option<f64> {
    field.parse::<f64>().ok().filter(|v| v.is_finite() && *v >= 0.0)
}
