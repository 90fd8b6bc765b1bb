use clap::{Args as ClapArgs, Parser, Subcommand};
use serde::Serialize;
use std::error::Error;
use std::path::PathBuf;

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use playground_eval::config::{self, split_command};
use playground_eval::golden::{ComponentLibrary, TrajectoryLibrary, component, library};
use playground_eval::harness::{HarnessConfig, run_component_harness, run_trajectory_harness};

/// Playground Eval - score browser-agent runs against golden trajectories
#[derive(Parser, Debug)]
#[command(
    name = "playground-eval",
    about = "Run a browser agent against the playground and score its logged trajectories",
    after_help = "ENVIRONMENT VARIABLES:\n\
        PLAYGROUND_EVAL_LOG_FILE             Shared trajectory log\n\
        PLAYGROUND_EVAL_OUTPUT_DIR           Report directory\n\
        PLAYGROUND_EVAL_AGENT_CMD            Agent command line\n\
        PLAYGROUND_EVAL_PORT                 Playground port\n\
        PLAYGROUND_EVAL_CHECKPOINT_TIMEOUT   Checkpoint-only time limit (s)\n\
        PLAYGROUND_EVAL_FULL_TIMEOUT         Full run time limit (s)\n\
        PLAYGROUND_EVAL_LINE_LIMIT           Log lines a run may append\n\
        PLAYGROUND_EVAL_POLL_INTERVAL_MS     Log polling interval (ms)\n\
        PLAYGROUND_EVAL_INCLUDE_MISSING      Count actions of missing checkpoints\n\
        RUST_LOG                             Log filter (default: info)"
)]
struct Args {
    /// Enable debug logging, including agent output
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Options shared by both evaluation modes
#[derive(ClapArgs, Debug)]
struct RunOptions {
    /// Skip running the agent and only score the existing log
    #[arg(long)]
    eval_only: bool,

    /// Repeat each selected test this many times
    #[arg(short = 'n', long = "times", default_value = "1")]
    times: usize,

    /// Trajectory log path
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Report directory
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Agent command line; goal, URL and timeout are appended
    #[arg(long)]
    agent: Option<String>,

    /// Playground port
    #[arg(long)]
    port: Option<u16>,

    /// Print evaluations and reports as JSON instead of the summary
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run and score multi-checkpoint playground trajectories
    E2e {
        /// `<test>` or `<test>/<checkpoint>`; all tests when omitted
        selectors: Vec<String>,

        /// Run and score only the selected checkpoint of each trajectory
        #[arg(long)]
        checkpoint_only: bool,

        /// Count golden actions of missing checkpoints as missing
        #[arg(long)]
        include_missing: bool,

        /// Load trajectory tests from a JSON file instead of the built-in set
        #[arg(long)]
        library: Option<PathBuf>,

        #[command(flatten)]
        run: RunOptions,
    },

    /// Run and score individual component tests
    Ind {
        /// `<task>` or `<task>/<test>`; all components when omitted
        selectors: Vec<String>,

        #[command(flatten)]
        run: RunOptions,
    },

    /// List available tests
    List {
        /// List trajectory tests from a JSON file instead of the built-in set
        #[arg(long)]
        library: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match args.command {
        Some(Commands::E2e {
            selectors,
            checkpoint_only,
            include_missing,
            library: library_path,
            run,
        }) => {
            let loaded;
            let library: &TrajectoryLibrary = match &library_path {
                Some(path) => {
                    loaded = TrajectoryLibrary::from_path(path)?;
                    &loaded
                }
                None => library::builtin(),
            };

            let mut harness = harness_config(&run);
            harness.checkpoint_only = checkpoint_only;
            harness.include_missing_checkpoints |= include_missing;

            let results = run_trajectory_harness(&harness, library, &selectors)?;
            print_results(&results, &results.report.summary_text(), &results.written, run.json)?;
        }

        Some(Commands::Ind { selectors, run }) => {
            let harness = harness_config(&run);
            let results = run_component_harness(&harness, component::builtin(), &selectors)?;
            print_results(&results, &results.report.summary_text(), &results.written, run.json)?;
        }

        Some(Commands::List { library: library_path }) => {
            let loaded;
            let library: &TrajectoryLibrary = match &library_path {
                Some(path) => {
                    loaded = TrajectoryLibrary::from_path(path)?;
                    &loaded
                }
                None => library::builtin(),
            };
            print_listing(library, component::builtin());
        }

        None => {
            println!("Playground Eval - score browser-agent runs against golden trajectories");
            println!();
            println!("Usage: playground-eval <COMMAND>");
            println!();
            println!("Commands:");
            println!("  e2e   Run and score multi-checkpoint playground trajectories");
            println!("  ind   Run and score individual component tests");
            println!("  list  List available tests");
            println!();
            println!("Run with --help for more information.");
        }
    }

    Ok(())
}

/// Environment config with this invocation's flags applied
fn harness_config(run: &RunOptions) -> HarnessConfig {
    let mut harness = HarnessConfig::from_config(config::get());
    if let Some(path) = &run.log_file {
        harness.log_file = path.clone();
    }
    if let Some(dir) = &run.output {
        harness.output_dir = dir.clone();
    }
    if let Some(command) = &run.agent {
        harness.agent_command = split_command(command);
    }
    if let Some(port) = run.port {
        harness.port = port;
    }
    harness.repetitions = run.times.max(1);
    harness.eval_only = run.eval_only;
    harness
}

/// Print a run's results as pretty JSON, or its summary and report paths
fn print_results<T: Serialize>(results: &T, summary: &str, written: &[PathBuf], json: bool) -> Result<(), Box<dyn Error>> {
    if json {
        println!("{}", serde_json::to_string_pretty(results)?);
        return Ok(());
    }
    print!("{}", summary);
    println!();
    for path in written {
        println!("Wrote {}", path.display());
    }
    Ok(())
}

fn print_listing(trajectories: &TrajectoryLibrary, components: &ComponentLibrary) {
    println!("Trajectory tests (e2e):");
    for test in trajectories.tests() {
        println!("  {}", test.name);
        for checkpoint in &test.checkpoints {
            println!("    {}/{}  {}", test.name, checkpoint.name, checkpoint.url);
        }
    }
    println!();
    println!("Component tests (ind):");
    for group in components.groups() {
        let variants: Vec<&str> = group.variants.iter().map(|v| v.name.as_str()).collect();
        println!("  {}/{}  [{}]", group.task, group.test, variants.join(", "));
    }
}
