//! Locate one thread's stack block inside a `jstack` dump
//!
//! Each [`FormatVariant`] identifies threads differently, so there is one
//! pure scanner per variant:
//!
//! ```text
//! Plain        "worker-1" #12 prio=5 os_prio=0 tid=0x00007f... nid=0x162e runnable
//!                 at com.example.Spin.run(Spin.java:7)
//!              <blank line ends the block>
//!
//! Forced       Thread 5678: (state = IN_JAVA)
//!               - com.example.Spin.run() @bci=4, line=7 (Interpreted frame)
//!              <blank line ends the block>
//!
//! MixedNative  ----------------- 5678 -----------------      <- excluded
//!              0x00007f3a1c2b3d4e	????????
//!              ----------------- 5679 -----------------      <- excluded
//! ```
//!
//! The returned block borrows from the dump and never includes the line
//! that terminates it.

use crate::domain::{DumpRecord, ExtractError, FormatVariant, StackBlock, Tid};

/// Separator run that fences threads in mixed-mode dumps.
const MIXED_SEPARATOR: &str = "---------------";

/// Extract the block of `tid` from `dump`, using the dump's layout.
///
/// # Errors
/// Returns `NotFound` when the dump has no block for the thread.
pub fn extract(dump: &DumpRecord, tid: Tid) -> Result<StackBlock<'_>, ExtractError> {
    let text = dump.raw_text.as_str();
    let block = match dump.variant {
        FormatVariant::Plain => extract_plain(text, tid),
        FormatVariant::Forced => extract_forced(text, tid),
        FormatVariant::MixedNative => extract_mixed(text, tid),
    };
    block.map(|b| StackBlock::new(tid, b)).ok_or(ExtractError::NotFound(tid))
}

/// Block starting at the line holding the whitespace-delimited token
/// `nid=<hex tid>`, up to the next blank line.
#[must_use]
pub fn extract_plain(text: &str, tid: Tid) -> Option<&str> {
    let token = format!("nid={}", tid.hex());
    let mut lines = LineSpans::new(text);
    let start = lines.find(|l| l.text.split_whitespace().any(|t| t == token))?;
    Some(until_blank(text, start, lines))
}

/// Block starting at the line beginning with `Thread <tid>:`, up to the next
/// blank line.
#[must_use]
pub fn extract_forced(text: &str, tid: Tid) -> Option<&str> {
    let marker = format!("Thread {tid}:");
    let mut lines = LineSpans::new(text);
    let start = lines.find(|l| l.text.starts_with(&marker))?;
    Some(until_blank(text, start, lines))
}

/// Lines strictly between the `--- <tid> ---` fence and the next fence.
#[must_use]
pub fn extract_mixed(text: &str, tid: Tid) -> Option<&str> {
    let marker = format!("{MIXED_SEPARATOR} {tid} {MIXED_SEPARATOR}");
    let mut lines = LineSpans::new(text);
    let fence = lines.find(|l| l.text.contains(&marker))?;

    let start = fence.next;
    let mut end = start;
    for line in lines {
        if line.text.starts_with(MIXED_SEPARATOR) {
            break;
        }
        end = line.end;
    }
    Some(&text[start..end])
}

/// From `start` through the line before the first blank line; `rest` yields
/// the lines after `start`.
fn until_blank<'t>(text: &'t str, start: Line<'t>, rest: LineSpans<'t>) -> &'t str {
    let mut end = start.end;
    for line in rest {
        if line.text.trim().is_empty() {
            break;
        }
        end = line.end;
    }
    &text[start.start..end]
}

/// A line and its byte range in the dump, without the line terminator.
#[derive(Debug, Clone, Copy)]
struct Line<'t> {
    text: &'t str,
    start: usize,
    /// End of the line's content
    end: usize,
    /// Start of the following line
    next: usize,
}

#[derive(Debug, Clone)]
struct LineSpans<'t> {
    text: &'t str,
    pos: usize,
}

impl<'t> LineSpans<'t> {
    fn new(text: &'t str) -> Self {
        Self { text, pos: 0 }
    }
}

impl<'t> Iterator for LineSpans<'t> {
    type Item = Line<'t>;

    fn next(&mut self) -> Option<Line<'t>> {
        if self.pos >= self.text.len() {
            return None;
        }
        let start = self.pos;
        let rest = &self.text[start..];
        let (content_len, next) = match rest.find('\n') {
            Some(i) => (i, start + i + 1),
            None => (rest.len(), self.text.len()),
        };
        let content = rest[..content_len].strip_suffix('\r').unwrap_or(&rest[..content_len]);
        self.pos = next;
        Some(Line { text: content, start, end: start + content.len(), next })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_block_ends_before_blank_line() {
        let text = "\"a\" #1 nid=0x2a runnable\n\tat A.run(A.java:1)\n\n\"b\" #2 nid=0x2b wait\n";
        let block = extract_plain(text, Tid(42));
        assert_eq!(block, Some("\"a\" #1 nid=0x2a runnable\n\tat A.run(A.java:1)"));
    }

    #[test]
    fn test_plain_ignores_longer_hex_and_decimal() {
        let text = "\"a\" nid=0x2ab runnable\n\n\"b\" cpu=42ms nid=42 runnable\n\n";
        assert_eq!(extract_plain(text, Tid(42)), None);
    }

    #[test]
    fn test_plain_runs_to_end_of_text() {
        let text = "\"a\" nid=0x1 runnable\n\tat A.run(A.java:1)";
        assert_eq!(extract_plain(text, Tid(1)), Some(text));
    }

    #[test]
    fn test_forced_block() {
        let text = "Thread 12: (state = BLOCKED)\n - A.run()\n\n\
                    Thread 123: (state = IN_JAVA)\n - B.run()\n\n";
        let block = extract_forced(text, Tid(123));
        assert_eq!(block, Some("Thread 123: (state = IN_JAVA)\n - B.run()"));
        let block = extract_forced(text, Tid(12));
        assert_eq!(block, Some("Thread 12: (state = BLOCKED)\n - A.run()"));
        assert_eq!(extract_forced(text, Tid(1)), None);
    }

    #[test]
    fn test_mixed_excludes_both_fences() {
        let text = "----------------- 7 -----------------\n0x1\tfoo\n0x2\tbar\n\
                    ----------------- 8 -----------------\n0x3\tbaz\n";
        assert_eq!(extract_mixed(text, Tid(7)), Some("0x1\tfoo\n0x2\tbar"));
        assert_eq!(extract_mixed(text, Tid(8)), Some("0x3\tbaz"));
    }

    #[test]
    fn test_extract_dispatches_on_variant() {
        let dump = DumpRecord {
            pid: crate::domain::Pid(1),
            raw_text: "Thread 42: (state = IN_JAVA)\n\n\"x\" nid=0x2a runnable\n".to_string(),
            variant: FormatVariant::Plain,
        };
        assert_eq!(extract(&dump, Tid(42)).unwrap().as_str(), "\"x\" nid=0x2a runnable");
        assert_eq!(extract(&dump, Tid(43)), Err(ExtractError::NotFound(Tid(43))));
    }

    #[test]
    fn test_crlf_lines() {
        let text = "\"a\" nid=0x2a runnable\r\n\tat A.run(A.java:1)\r\n\r\n";
        let block = extract_plain(text, Tid(42));
        assert_eq!(block, Some("\"a\" nid=0x2a runnable\r\n\tat A.run(A.java:1)"));
    }
}
