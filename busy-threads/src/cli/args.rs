//! CLI argument definitions

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "busy-threads",
    version,
    about = "Find the threads burning CPU in running java processes and print their stacks",
    after_help = "\
EXAMPLES:
    busy-threads                    Busiest 5 threads of all java processes
    busy-threads -p 42,47 -c 10     Busiest 10 threads of processes 42 and 47
    busy-threads 1                  Repeat every second until Ctrl+C
    busy-threads 3 10               Repeat every 3 seconds, 10 times
    sudo busy-threads               Dump java processes owned by other users

The trailing [DELAY [COUNT]] arguments follow vmstat: DELAY alone repeats
until interrupted."
)]
pub struct Args {
    /// Java process id(s) to inspect, comma separated (default: all java processes)
    #[arg(
        short,
        long = "pid",
        value_name = "PID",
        value_delimiter = ',',
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub pids: Vec<u32>,

    /// Number of busiest threads to show per round (0 = all)
    #[arg(short, long, default_value_t = 5)]
    pub count: usize,

    /// Append all output to this file as a log
    #[arg(short, long, value_name = "FILE")]
    pub append_file: Option<PathBuf>,

    /// Keep intermediate ps/top/jstack captures in this directory
    #[arg(short = 'S', long, value_name = "DIR")]
    pub store_dir: Option<PathBuf>,

    /// Path of the jstack command (default: PATH, then $JAVA_HOME/bin)
    #[arg(short = 's', long, value_name = "PATH")]
    pub jstack_path: Option<PathBuf>,

    /// Force a thread dump (jstack -F), for hung processes
    #[arg(short = 'F', long)]
    pub force: bool,

    /// Print both java and native frames (jstack -m)
    #[arg(short, long)]
    pub mix_native_frames: bool,

    /// Print additional lock information (jstack -l)
    #[arg(short, long)]
    pub lock_info: bool,

    /// Seconds between the two top samples; CPU% is measured over this interval
    #[arg(short = 'd', long, value_name = "SECS", default_value_t = 0.5)]
    pub top_delay: f64,

    /// Use ps lifetime-average CPU% instead of top interval sampling
    #[arg(short = 'P', long)]
    pub use_ps: bool,

    /// Seconds between rounds
    #[arg(value_name = "DELAY")]
    pub delay: Option<f64>,

    /// Number of rounds (0 or negative = until interrupted)
    #[arg(value_name = "COUNT", allow_negative_numbers = true)]
    pub rounds: Option<i64>,
}
