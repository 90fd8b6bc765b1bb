//! Stand-in agent that replays a recorded script into the trajectory log.
//!
//! Invoked the way the harness invokes a real agent (goal, URL and timeout
//! appended to the command line), which it ignores.

use clap::Parser;
use std::error::Error;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use playground_eval::config;

#[derive(Parser, Debug)]
#[command(name = "replay-agent", about = "Append a scripted trajectory to the playground log")]
struct Args {
    /// File whose non-blank lines are appended to the log
    #[arg(long)]
    script: PathBuf,

    /// Log to append to (defaults to the configured log file)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Delay before each line, in milliseconds
    #[arg(long, default_value = "100")]
    delay_ms: u64,

    /// Goal, URL and timeout passed by the harness
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    ignored: Vec<String>,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let log_file = args.log_file.unwrap_or_else(config::log_file);
    let script = fs::read_to_string(&args.script)?;

    for line in script.lines().map(str::trim).filter(|l| !l.is_empty()) {
        thread::sleep(Duration::from_millis(args.delay_ms));
        let mut file = OpenOptions::new().create(true).append(true).open(&log_file)?;
        writeln!(file, "{}", line)?;
        println!("replayed: {}", line);
    }
    Ok(())
}
