//! meshsim - network algorithm simulator
//!
//! Runs the demo scenarios in batch mode or from an interactive prompt
//! where runs execute on a background thread and can be aborted.

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use meshsim::{
    Algorithm, BatchExit, ChannelHost, HostUpdate, InteractiveExit, LoggingHost, Mode,
    ModelRegistry, RunOutcome, Runtime, Scenario, SimConfig, SimRng, TopologyBuilder,
    TopologyKind, World,
};
use meshsim_logging::{LogConfig, SimSubscriberBuilder};
use rand::SeedableRng;
use tracing::{error, info};

#[derive(Parser)]
#[command(
    name = "meshsim",
    about = "Round-driven and event-driven network algorithm simulator",
    version
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario to completion and exit
    Run {
        #[command(flatten)]
        scenario: ScenarioArgs,

        /// Print the run report as JSON
        #[arg(long)]
        json: bool,

        /// Write JSONL logs to this directory
        #[arg(long)]
        log_dir: Option<PathBuf>,
    },

    /// Start runs from a prompt; runs execute in the background
    Interactive {
        #[command(flatten)]
        scenario: ScenarioArgs,
    },

    /// Build and print a hand-made topology
    Topology {
        #[arg(short, long, value_enum, default_value = "ring")]
        topology: TopologyArg,

        #[arg(short, long, default_value = "6")]
        nodes: u32,

        /// Connection probability for the random topology
        #[arg(short = 'p', long, default_value = "0.4")]
        connection_prob: f64,

        #[arg(short, long, default_value = "0")]
        seed: u64,
    },
}

#[derive(Args)]
struct ScenarioArgs {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Rounds (synchronous) or events (asynchronous) per run
    #[arg(short, long)]
    rounds: Option<u64>,

    #[arg(short, long)]
    seed: Option<u64>,

    /// Notify the host every N rounds or events
    #[arg(long)]
    refresh_rate: Option<u64>,

    #[arg(short, long, value_enum)]
    mode: Option<ModeArg>,

    #[arg(short, long, default_value = "16")]
    nodes: u32,

    #[arg(short, long, value_enum, default_value = "flooding")]
    algorithm: AlgorithmArg,

    #[arg(short, long, value_enum, default_value = "model")]
    topology: TopologyArg,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Sync,
    Async,
}

#[derive(Clone, Copy, ValueEnum)]
enum AlgorithmArg {
    Flooding,
    PingPong,
}

#[derive(Clone, Copy, ValueEnum)]
enum TopologyArg {
    Model,
    Ring,
    Line,
    Star,
    Full,
    Random,
}

impl From<ModeArg> for Mode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Sync => Mode::Synchronous,
            ModeArg::Async => Mode::Asynchronous,
        }
    }
}

impl From<AlgorithmArg> for Algorithm {
    fn from(arg: AlgorithmArg) -> Self {
        match arg {
            AlgorithmArg::Flooding => Algorithm::Flooding,
            AlgorithmArg::PingPong => Algorithm::PingPong,
        }
    }
}

impl From<TopologyArg> for TopologyKind {
    fn from(arg: TopologyArg) -> Self {
        match arg {
            TopologyArg::Model => TopologyKind::Model,
            TopologyArg::Ring => TopologyKind::Ring,
            TopologyArg::Line => TopologyKind::Line,
            TopologyArg::Star => TopologyKind::Star,
            TopologyArg::Full => TopologyKind::Full,
            TopologyArg::Random => TopologyKind::Random,
        }
    }
}

impl ScenarioArgs {
    /// Load the configuration file (if any) and apply the overrides
    fn load(&self) -> anyhow::Result<(SimConfig, Scenario)> {
        let mut config = match &self.config {
            Some(path) => SimConfig::from_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => SimConfig::default(),
        };
        if let Some(rounds) = self.rounds {
            config.rounds = rounds;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(rate) = self.refresh_rate {
            config.refresh_rate = rate;
        }
        if let Some(mode) = self.mode {
            config.mode = mode.into();
        }

        let scenario = Scenario::new(self.algorithm.into(), self.nodes, self.topology.into());
        scenario.prepare_config(&mut config);
        config.validate()?;
        Ok((config, scenario))
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let code = match cli.command {
        Commands::Run {
            scenario,
            json,
            log_dir,
        } => {
            let (config, scenario) = scenario.load()?;
            let mut logging = match log_dir {
                Some(dir) => LogConfig::batch(dir),
                None => config.logging.clone(),
            };
            if cli.verbose {
                logging.default_level = "debug".into();
            }
            let _guard = SimSubscriberBuilder::new().with_config(logging).init();
            run_batch(config, scenario, json)?
        }
        Commands::Interactive { scenario } => {
            let (config, scenario) = scenario.load()?;
            let level = if cli.verbose { "debug" } else { "warn" };
            let _guard = SimSubscriberBuilder::new()
                .with_config(config.logging.clone())
                .with_level(level)
                .init();
            run_interactive(config, scenario)?
        }
        Commands::Topology {
            topology,
            nodes,
            connection_prob,
            seed,
        } => {
            let builder = TopologyBuilder::new(nodes);
            let topology = match topology {
                TopologyArg::Model | TopologyArg::Ring => builder.ring(),
                TopologyArg::Line => builder.line(),
                TopologyArg::Star => builder.star(),
                TopologyArg::Full => builder.full_mesh(),
                TopologyArg::Random => builder.random(connection_prob, &mut seeded_rng(seed)),
            };
            println!("{}", topology.visualize());
            0
        }
    };

    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}

fn seeded_rng(seed: u64) -> SimRng {
    SimRng::seed_from_u64(seed)
}

/// Run once and return the process exit code
fn run_batch(config: SimConfig, scenario: Scenario, json: bool) -> anyhow::Result<i32> {
    let rounds = config.rounds;
    let world = scenario.build_world(config, ModelRegistry::with_builtins())?;
    let runtime = Runtime::new(world, Arc::new(LoggingHost), Arc::new(BatchExit))?;

    let report = runtime
        .run_blocking(rounds as i64, true)
        .context("run did not start")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "{} after {} {} (t = {:.2}): {} sent, {} delivered, {} dropped",
            report.outcome,
            report.units,
            if report.mode == Mode::Synchronous { "rounds" } else { "events" },
            report.end_time.as_f64(),
            report.stats.messages_sent,
            report.stats.messages_delivered,
            report.stats.messages_dropped,
        );
    }

    Ok(match (&report.outcome, report.exit_code()) {
        (_, Some(code)) => code,
        (RunOutcome::Failed { .. }, None) => 1,
        _ => 0,
    })
}

fn run_interactive(config: SimConfig, scenario: Scenario) -> anyhow::Result<i32> {
    let default_rounds = config.rounds;
    let exit = InteractiveExit {
        exit_on_termination: config.exit_on_termination,
    };
    let world = World::new(config, ModelRegistry::with_builtins())?;
    let (host, mut updates) = ChannelHost::new();
    let runtime = Runtime::new(world, Arc::new(host), Arc::new(exit))?;

    // Populate in the background; runs wait on the startup gate meanwhile
    let creation = runtime.begin_node_creation()?;
    thread::Builder::new()
        .name("meshsim-nodes".into())
        .spawn(move || match creation.with_world(|world| scenario.populate(world)) {
            Ok(()) => creation.complete(),
            Err(e) => error!(error = %e, "node creation failed"),
        })?;

    thread::Builder::new()
        .name("meshsim-host".into())
        .spawn(move || {
            while let Some(update) = updates.blocking_recv() {
                match update {
                    HostUpdate::Finished(report) => {
                        println!(
                            "\n  run {}: {} after {} units (t = {:.2})",
                            report.run_id,
                            report.outcome,
                            report.units,
                            report.end_time.as_f64()
                        );
                        if let Some(code) = report.exit_code() {
                            println!("  exiting with code {code}");
                            std::process::exit(code);
                        }
                    }
                    HostUpdate::Failed(reason) => println!("\n  run failed: {reason}"),
                    HostUpdate::Progress(_) | HostUpdate::Event(_) | HostUpdate::Redraw => {}
                }
            }
        })?;

    println!("\nInteractive mode. Commands:");
    println!("  run [n]   - Start a run of n rounds/events in the background");
    println!("  abort     - Stop the active run at the next boundary");
    println!("  status    - Show time, counters, and whether a run is active");
    println!("  nodes     - Describe every node");
    println!("  stats     - Show message statistics");
    println!("  reset     - Drop events, packets, and timers and rewind time");
    println!("  quit      - Exit");
    println!();

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let parts: Vec<&str> = input.split_whitespace().collect();
        if parts.is_empty() {
            continue;
        }

        match parts[0] {
            "run" | "r" => {
                let count: i64 = parts
                    .get(1)
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(default_rounds as i64);
                if runtime.run(count, false) {
                    println!("  started run of {count}");
                } else if runtime.is_running() {
                    println!("  a run is already active");
                } else {
                    println!("  nothing to run for {count}");
                }
            }
            "abort" | "a" => {
                runtime.abort();
                println!("  abort requested");
            }
            "status" | "s" => {
                let snapshot = runtime.snapshot();
                let pending = runtime.with_world(|w| w.queue().len());
                println!(
                    "  {} | rounds {} | events {} | pending {} | {}",
                    snapshot.time,
                    snapshot.rounds,
                    snapshot.events,
                    pending,
                    if snapshot.is_running { "running" } else { "idle" }
                );
            }
            "nodes" => {
                runtime.with_world(|world| {
                    for id in world.node_ids() {
                        let (Some(position), Some(edges)) = (world.position(id), world.edges(id))
                        else {
                            continue;
                        };
                        let describe = world.describe(id).unwrap_or_default();
                        println!("  {id} at {position} ({} edges) {describe}", edges.len());
                    }
                });
            }
            "stats" => {
                let stats = runtime.with_world(|w| w.stats().clone());
                println!("  Messages sent: {}", stats.messages_sent);
                println!("  Messages delivered: {}", stats.messages_delivered);
                println!("  Messages dropped: {}", stats.messages_dropped);
                println!("  Messages disturbed: {}", stats.messages_disturbed);
                println!("  Timers fired: {}", stats.timers_fired);
            }
            "reset" => match runtime.reset() {
                Ok(()) => println!("  reset to t=0"),
                Err(e) => println!("  {e}"),
            },
            "quit" | "exit" | "q" => {
                runtime.abort();
                runtime.join();
                let _ = runtime.with_world_mut(|world| world.on_exit());
                println!("Goodbye!");
                break;
            }
            other => println!("  Unknown command: {other}"),
        }
    }

    info!("interactive session ended");
    Ok(0)
}
