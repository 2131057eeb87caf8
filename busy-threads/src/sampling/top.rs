//! Parser for `top -H -b -n 2` output
//!
//! Batch mode prints one summary block and one thread table per refresh,
//! separated by blank lines:
//!
//! ```text
//! top - 10:11:12 up 3 days, ...          <- summary, refresh 1
//! Threads:  42 total, ...
//!
//!     PID USER  PR NI ... S  %CPU ...    <- table, refresh 1 (since thread start)
//!    1240 svc   20  0 ... S  99.9 ...
//!
//! top - 10:11:13 up 3 days, ...          <- summary, refresh 2
//!
//!     PID USER  PR NI ... S  %CPU ...    <- table, refresh 2 (during the delay)
//!    5678 svc   20  0 ... R  87.5 ...
//! ```
//!
//! Only the second table reflects CPU used during the delay interval, so it
//! is the only one read.

use crate::domain::{SamplingError, Tid};

use super::ps::parse_percent;

/// A thread and its CPU usage over the sampling interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CpuRow {
    pub tid: Tid,
    pub cpu_percent: f64,
}

/// Default column of `%CPU` when a header cannot be read.
const DEFAULT_CPU_COLUMN: usize = 8;

/// Rows of the second thread table, sorted descending by CPU (stable).
///
/// # Errors
/// Returns `MalformedCapture` if the output holds fewer than two tables.
pub fn parse_second_snapshot(text: &str) -> Result<Vec<CpuRow>, SamplingError> {
    let tables = thread_tables(text);
    let Some(second) = tables.into_iter().nth(1) else {
        return Err(SamplingError::MalformedCapture {
            tool: "top",
            detail: "expected two thread tables (top -n 2)".to_string(),
        });
    };

    let mut rows = second;
    rows.sort_by(|a, b| b.cpu_percent.total_cmp(&a.cpu_percent));
    Ok(rows)
}

/// Split output into thread tables, each introduced by a `PID ... %CPU`
/// header and ending at the next blank line.
fn thread_tables(text: &str) -> Vec<Vec<CpuRow>> {
    let mut tables = Vec::new();
    let mut current: Option<(usize, Vec<CpuRow>)> = None;

    for line in text.lines() {
        if line.trim().is_empty() {
            if let Some((_, rows)) = current.take() {
                tables.push(rows);
            }
            continue;
        }

        match current.as_mut() {
            Some((cpu_column, rows)) => {
                if let Some(row) = parse_row(line, *cpu_column) {
                    rows.push(row);
                }
            }
            None => {
                if let Some(cpu_column) = header_cpu_column(line) {
                    current = Some((cpu_column, Vec::new()));
                }
            }
        }
    }
    if let Some((_, rows)) = current {
        tables.push(rows);
    }

    tables
}

/// If `line` is a table header, the index of its `%CPU` column.
fn header_cpu_column(line: &str) -> Option<usize> {
    let mut fields = line.split_whitespace().peekable();
    if fields.peek() != Some(&"PID") {
        return None;
    }
    Some(fields.position(|f| f == "%CPU").unwrap_or(DEFAULT_CPU_COLUMN))
}

fn parse_row(line: &str, cpu_column: usize) -> Option<CpuRow> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let tid = fields.first()?.parse::<u32>().ok()?;
    let cpu_percent = parse_percent(fields.get(cpu_column)?)?;
    Some(CpuRow { tid: Tid(tid), cpu_percent })
}
