//! Stack dumps: taking them and slicing one thread out of them
//!
//! - `fetcher`: runs `jstack` as the right user, caches one dump per process
//!   per round
//! - `extract`: finds a thread's block in a dump, per dump layout

pub mod extract;
pub mod fetcher;

pub use extract::extract;
pub use fetcher::{DumpFetcher, DumpOptions, DumpTool, ExecutionMode, RoundDumpCache};
