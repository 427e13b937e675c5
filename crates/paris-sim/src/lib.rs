//! A deterministic event loop and scripted network for driving paris
//! probing algorithms without raw sockets.

mod event_loop;
mod network;
mod report;
mod simulation;

use event_loop::SimLoop;
use network::ScriptedNetwork;
use paris_core::{defaults, Builder, Event, EventType, Ping, PingEvent, PingFlags, PingSummary};
pub use report::{HostsResolver, Report, Resolver};
pub use simulation::{Echo, Expected, Icmp, Response, Simulation};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// The result of running a simulation.
#[derive(Debug, Default)]
pub struct Outcome {
    /// The tags of every event raised for the user, in order.
    pub events: Vec<EventType>,
    /// The rendered report.
    pub lines: Vec<String>,
    /// The final tally, if the measurement completed.
    pub summary: Option<PingSummary>,
    /// The virtual time taken by the measurement.
    pub elapsed: Duration,
    /// The error which stopped the measurement, if any.
    pub error: Option<anyhow::Error>,
}

/// Run a simulation.
///
/// A measurement which fails once started still yields an `Outcome`, with
/// the failure recorded in `Outcome::error`.
pub fn simulate(sim: Simulation, flags: PingFlags) -> anyhow::Result<Outcome> {
    let sim = Arc::new(sim);
    let mut ping = build(&sim, flags)?;
    let mut outcome = Outcome::default();
    if let Err(err) = run(&sim, &mut ping, &mut outcome) {
        outcome.error = Some(err);
    }
    Ok(outcome)
}

fn build(sim: &Simulation, flags: PingFlags) -> anyhow::Result<Ping> {
    Ok(Builder::new(sim.target)
        .count(sim.count.unwrap_or(defaults::DEFAULT_PING_COUNT))
        .interval(
            sim.interval_ms
                .map_or(defaults::DEFAULT_PING_INTERVAL, Duration::from_millis),
        )
        .timeout(
            sim.timeout_ms
                .map_or(defaults::DEFAULT_PING_TIMEOUT, Duration::from_millis),
        )
        .max_ttl(sim.max_ttl.unwrap_or(defaults::DEFAULT_PING_MAX_TTL))
        .flags(flags)
        .build()?)
}

fn run(sim: &Arc<Simulation>, ping: &mut Ping, outcome: &mut Outcome) -> anyhow::Result<()> {
    info!(name = %sim.name, target = %sim.target, "start simulating");
    let mut report = Report::new(*ping.config(), HostsResolver::new(sim.hosts.clone()));
    outcome.lines.push(report.header());
    let timeout = ping.config().timeout;
    let mut lp = SimLoop::new(ScriptedNetwork::new(Arc::clone(sim)), timeout);
    let result = lp.run(ping, |elapsed, event| {
        outcome.events.push(event.event_type());
        outcome.lines.extend(report.render(elapsed, &event));
        if let Event::Ping(PingEvent::AllProbesSent(summary)) = event {
            outcome.summary = Some(summary);
        }
    });
    outcome.elapsed = lp.elapsed();
    info!(name = %sim.name, elapsed = ?outcome.elapsed, ok = result.is_ok(), "end simulating");
    result
}
