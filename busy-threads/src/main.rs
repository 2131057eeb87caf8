//! # busy-threads - Main Entry Point
//!
//! Setup runs synchronously: OS check, dump tool lookup, argument
//! validation, preflight. The round loop then runs on a blocking task while
//! the main task waits for Ctrl+C.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use busy_threads::artifacts::ArtifactStore;
use busy_threads::cli::{exit_code_for, shell_join, Args, Interrupted, EXIT_SUCCESS};
use busy_threads::config::Config;
use busy_threads::driver::PollingDriver;
use busy_threads::exec::SystemRunner;
use busy_threads::preflight::{check_supported_os, resolve_dump_tool, run_preflight_checks};
use busy_threads::report::Reporter;

fn main() {
    env_logger::init();
    std::process::exit(match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            let code = exit_code_for(&e);
            eprintln!("error: {e:#}");
            code
        }
    });
}

fn run() -> Result<()> {
    let args = Args::parse();
    let command_line = shell_join(std::env::args_os());

    check_supported_os()?;
    let jstack = resolve_dump_tool(args.jstack_path.as_deref())?;
    let config = Config::from_args(args, jstack, command_line)?;
    let identity = run_preflight_checks(&config)?;
    info!("running as {} (elevated: {})", identity.user, identity.elevated);

    let artifacts = Arc::new(ArtifactStore::new(config.store_dir.as_deref())?);
    let mut reporter = Reporter::stdout(&config)?;

    // Dropping a runtime waits for its blocking tasks; see shutdown_background below.
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start tokio runtime")?;

    let rounds = {
        let artifacts = Arc::clone(&artifacts);
        runtime.spawn_blocking(move || {
            PollingDriver::new(&config, &identity, &SystemRunner, &artifacts, &mut reporter)
                .run()
                .map(|run| run.rounds)
        })
    };

    let outcome = runtime.block_on(async {
        tokio::select! {
            joined = rounds => joined.context("Round loop panicked").and_then(|r| r),
            _ = tokio::signal::ctrl_c() => {
                artifacts.discard();
                Err(Interrupted.into())
            }
        }
    });
    runtime.shutdown_background();

    let finished = outcome?;
    info!("{finished} round(s) finished");
    Ok(())
}
