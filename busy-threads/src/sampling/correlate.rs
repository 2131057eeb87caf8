//! Attach owning process and user to interval samples.
//!
//! `top -H` reports thread ids without their process; a separate `ps -L`
//! table maps every thread to its pid and user. This is a pure function over
//! the two typed tables.

use std::collections::HashMap;

use log::debug;

use crate::domain::{ThreadLimit, ThreadSample, Tid};

use super::ps::OwnerRow;
use super::top::CpuRow;

/// Walk `ranked` in order and keep the threads found in `owners`.
///
/// A thread missing from `owners` exited between the two captures; it is
/// skipped and does not use up the limit, so later rows backfill the batch.
#[must_use]
pub fn correlate(
    ranked: &[CpuRow],
    owners: &[OwnerRow],
    limit: ThreadLimit,
) -> Vec<ThreadSample> {
    let mut by_tid: HashMap<Tid, &OwnerRow> = HashMap::with_capacity(owners.len());
    for owner in owners {
        by_tid.entry(owner.tid).or_insert(owner);
    }

    let mut samples = Vec::new();
    for row in ranked {
        if limit.is_filled(samples.len()) {
            break;
        }
        match by_tid.get(&row.tid) {
            Some(owner) => samples.push(ThreadSample {
                pid: owner.pid,
                tid: row.tid,
                cpu_percent: row.cpu_percent,
                user: owner.user.clone(),
            }),
            None => debug!("thread {} exited before ownership lookup", row.tid),
        }
    }
    samples
}
