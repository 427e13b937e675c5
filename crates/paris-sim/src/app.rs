use anyhow::Context;
use clap::Parser;
use paris_core::PingFlags;
use paris_sim::{simulate, Simulation};
use tracing_subscriber::fmt::format::FmtSpan;

/// Ping a simulated host and report statistics
#[derive(Parser, Debug)]
#[command(name = "paris-sim", author, version, about, long_about = None, arg_required_else_help(true))]
pub struct Args {
    /// A simulation file to run.
    pub simulation: String,

    /// The number of probes to send [default: from the simulation]
    #[arg(short = 'c', long)]
    pub count: Option<usize>,

    /// The interval between probes in milliseconds [default: from the simulation]
    #[arg(short = 'i', long)]
    pub interval: Option<u64>,

    /// Do not resolve addresses to hostnames
    #[arg(short = 'n', long)]
    pub numeric: bool,

    /// Only print the summary
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Print a timestamp before each line
    #[arg(short = 'D', long)]
    pub timestamp: bool,

    /// The log filter
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

impl Args {
    fn flags(&self) -> PingFlags {
        let mut flags = PingFlags::empty();
        flags.set(PingFlags::RESOLVE, !self.numeric);
        flags.set(PingFlags::QUIET, self.quiet);
        flags.set(PingFlags::SHOW_TIMESTAMP, self.timestamp);
        flags
    }
}

pub fn run() -> anyhow::Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_span_events(FmtSpan::NONE)
        .with_env_filter(args.log_level.as_str())
        .with_writer(std::io::stderr)
        .init();
    let simulation_file =
        std::fs::read_to_string(&args.simulation).context(args.simulation.clone())?;
    let mut sim: Simulation = toml::from_str(&simulation_file)?;
    if let Some(count) = args.count {
        sim.count = Some(count);
    }
    if let Some(interval) = args.interval {
        sim.interval_ms = Some(interval);
    }
    let outcome = simulate(sim, args.flags())?;
    for line in &outcome.lines {
        println!("{line}");
    }
    match outcome.error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
