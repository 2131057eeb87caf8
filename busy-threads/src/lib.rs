//! # busy-threads - Busy Java Thread Finder
//!
//! Finds the threads consuming the most CPU in running JVM processes and
//! prints each one's stack, taken from a `jstack` thread dump. Useful when a
//! java service pins a core and you need to know which code is spinning.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                     Round (once or repeated)                  │
//! │                                                               │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐       │
//! │  │   Selector   │──▶│   Sampler    │──▶│ Ranked batch │       │
//! │  │ (-p / -C)    │   │ (ps or top)  │   │  (top N)     │       │
//! │  └──────────────┘   └──────────────┘   └──────┬───────┘       │
//! │                                               │ per sample    │
//! │                                               ▼               │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐       │
//! │  │   Reporter   │◀──│  Extractor   │◀──│ Dump fetcher │       │
//! │  │ (stdout/log) │   │ (tid block)  │   │ (jstack, 1x) │       │
//! │  └──────────────┘   └──────────────┘   └──────────────┘       │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! All external tools run through [`exec::CommandRunner`], so every stage can
//! be driven by scripted output in tests.
//!
//! ## Module Structure
//!
//! - [`process_lookup`]: explicit pids or every `java`/`jsvc` process
//! - [`sampling`]: lifetime (`ps`) and interval (`top`) CPU ranking
//! - [`dump`]: privilege-aware `jstack` runs and per-variant stack extraction
//! - [`driver`]: the round loop
//! - [`report`]: headers and entries to stdout, append-log, store directory
//! - [`artifacts`]: scratch and store directories for intermediate captures
//! - [`preflight`]: OS, dump tool, writable paths, invoking user
//! - [`config`], [`cli`]: arguments, validation, exit codes
//! - [`domain`]: core types and errors
//!
//! ## Typical Usage
//!
//! ```bash
//! # Busiest 5 threads of every java process
//! busy-threads
//!
//! # Busiest 10 threads of two processes, every 3 seconds, 10 times
//! busy-threads -p 42,47 -c 10 3 10
//!
//! # Processes owned by other users
//! sudo busy-threads
//! ```

pub mod artifacts;
pub mod cli;
pub mod config;
pub mod domain;
pub mod driver;
pub mod dump;
pub mod exec;
pub mod preflight;
pub mod process_lookup;
pub mod report;
pub mod sampling;
